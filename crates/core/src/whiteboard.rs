use async_trait::async_trait;

use crate::domain::entry::WhiteboardRequest;
use crate::domain::standup::{Standup, StandupItems};
use crate::errors::BackendError;

/// The remote whiteboard service entries are submitted to.
#[async_trait]
pub trait WhiteboardApi: Send + Sync {
    async fn get_standup(&self, standup_id: &str) -> Result<Standup, BackendError>;

    async fn get_standup_items(&self, standup_id: i64) -> Result<StandupItems, BackendError>;

    /// Creates or updates an item and returns the id the backend assigned.
    async fn submit(
        &self,
        request: &WhiteboardRequest,
        standup_id: i64,
    ) -> Result<String, BackendError>;
}
