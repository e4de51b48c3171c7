use crate::{
    db::DbPool,
    entities::activity_log::{self, Entity as ActivityLog},
    errors::ServiceError,
    events::{Event, EventHandler},
};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, QuerySelect, Set};
use std::sync::Arc;
use uuid::Uuid;

/// Append-only record of who did what.
#[derive(Clone)]
pub struct ActivityLogService {
    db_pool: Arc<DbPool>,
}

impl ActivityLogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn record(
        &self,
        user_id: Uuid,
        action: &str,
        description: String,
    ) -> Result<activity_log::Model, ServiceError> {
        activity_log::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            description: Set(description),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Most recent entries first.
    pub async fn recent(&self, limit: u64) -> Result<Vec<activity_log::Model>, ServiceError> {
        ActivityLog::find()
            .order_by_desc(activity_log::Column::CreatedAt)
            .order_by_desc(activity_log::Column::Id)
            .limit(limit)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

#[async_trait]
impl EventHandler for ActivityLogService {
    async fn handle_event(&self, event: Event) -> Result<(), String> {
        self.record(event.actor(), event.action(), event.description())
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}
