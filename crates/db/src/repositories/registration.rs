use chrono::Utc;
use sqlx::Row;

use wbbot_core::domain::standup::Standup;

use super::{RepositoryError, StandupRegistry};
use crate::DbPool;

pub struct SqlStandupRegistry {
    pool: DbPool,
}

impl SqlStandupRegistry {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl StandupRegistry for SqlStandupRegistry {
    async fn set_standup(
        &self,
        channel_id: &str,
        standup: &Standup,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO standup_registration (channel_id, standup_id, title, time_zone, registered_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(channel_id) DO UPDATE SET \
                standup_id = excluded.standup_id, \
                title = excluded.title, \
                time_zone = excluded.time_zone, \
                registered_at = excluded.registered_at",
        )
        .bind(channel_id)
        .bind(standup.id)
        .bind(&standup.title)
        .bind(standup.time_zone.as_deref())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_standup(&self, channel_id: &str) -> Result<Option<Standup>, RepositoryError> {
        let row = sqlx::query(
            "SELECT standup_id, title, time_zone FROM standup_registration WHERE channel_id = ?",
        )
        .bind(channel_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        Ok(Some(Standup {
            id: row.try_get("standup_id")?,
            title: row.try_get("title")?,
            time_zone: row.try_get("time_zone")?,
        }))
    }
}
