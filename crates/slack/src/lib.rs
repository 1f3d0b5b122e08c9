//! Slack side of the whiteboard bot.
//!
//! - **Client** (`client`) - the chat collaborator trait and its Web API implementation
//! - **Normalizer** (`normalize`) - turns `<@U..>` / `<#C..>` tokens into names
//! - **Commands** (`commands`) - `wb` invocation, tokenizer and abbreviation router
//! - **Handlers** (`handlers`) - per-command behaviour, drafts and backend sync
//! - **Events** (`events`) - Slack event model and dispatcher
//! - **Socket Mode** (`socket`) - transport loop with reconnection; one task per event
//! - **Websocket transport** (`socket_mode`) - `apps.connections.open` plus envelope acks
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → MessageHandler → WhiteboardService
//!                                                     ├─ TextNormalizer
//!                                                     └─ CommandRouter → WhiteboardHandlers
//!                                                           ├─ DraftStore (per-user lock)
//!                                                           ├─ WhiteboardApi (backend)
//!                                                           └─ StandupRegistry
//! ```

pub mod client;
pub mod commands;
pub mod events;
pub mod handlers;
pub mod normalize;
pub mod replies;
pub mod socket;
pub mod socket_mode;

#[cfg(test)]
mod testing;

pub use client::{ChatClient, ChatError, MessageStyle, SlackWebClient};
pub use events::{whiteboard_dispatcher, EventDispatcher, MessageEvent, SlackEnvelope, SlackEvent};
pub use handlers::{WhiteboardDeps, WhiteboardService};
pub use normalize::TextNormalizer;
pub use socket::{NoopSocketTransport, ReconnectPolicy, SocketModeRunner, SocketTransport};
pub use socket_mode::SlackSocketTransport;
