use async_trait::async_trait;
use thiserror::Error;

use wbbot_core::domain::standup::Standup;

pub mod memory;
pub mod registration;

pub use memory::InMemoryStandupRegistry;
pub use registration::SqlStandupRegistry;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable mapping from a chat channel to the standup it posts into.
#[async_trait]
pub trait StandupRegistry: Send + Sync {
    async fn set_standup(&self, channel_id: &str, standup: &Standup)
        -> Result<(), RepositoryError>;
    async fn get_standup(&self, channel_id: &str) -> Result<Option<Standup>, RepositoryError>;
}
