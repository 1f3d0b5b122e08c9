pub mod clock;
pub mod config;
pub mod domain;
pub mod drafts;
pub mod errors;
pub mod whiteboard;

pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::entry::{Entry, EntryError, EntryKind, EntryVariant, WhiteboardRequest};
pub use domain::standup::{Standup, StandupItem, StandupItems};
pub use drafts::{DraftGuard, DraftStore};
pub use errors::BackendError;
pub use whiteboard::WhiteboardApi;
