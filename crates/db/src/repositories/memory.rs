use std::collections::HashMap;

use tokio::sync::RwLock;

use wbbot_core::domain::standup::Standup;

use super::{RepositoryError, StandupRegistry};

#[derive(Default)]
pub struct InMemoryStandupRegistry {
    standups: RwLock<HashMap<String, Standup>>,
}

#[async_trait::async_trait]
impl StandupRegistry for InMemoryStandupRegistry {
    async fn set_standup(
        &self,
        channel_id: &str,
        standup: &Standup,
    ) -> Result<(), RepositoryError> {
        let mut standups = self.standups.write().await;
        standups.insert(channel_id.to_owned(), standup.clone());
        Ok(())
    }

    async fn get_standup(&self, channel_id: &str) -> Result<Option<Standup>, RepositoryError> {
        let standups = self.standups.read().await;
        Ok(standups.get(channel_id).cloned())
    }
}
