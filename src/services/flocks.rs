use crate::{
    db::DbPool,
    entities::flock::{self, Entity as Flock, FlockStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::feed_ledger::validate_not_blank,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewFlock {
    #[validate(length(min = 1, max = 100), custom = "validate_not_blank")]
    pub name: String,
    #[validate(length(max = 100))]
    pub breed: Option<String>,
    #[validate(range(min = 0))]
    pub bird_count: i32,
}

/// Flock registry used to attribute consumption.
#[derive(Clone)]
pub struct FlockService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl FlockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, new_flock), fields(name = %new_flock.name))]
    pub async fn create_flock(
        &self,
        new_flock: NewFlock,
        created_by: Uuid,
    ) -> Result<flock::Model, ServiceError> {
        new_flock.validate()?;

        let now = Utc::now();
        let model = flock::ActiveModel {
            name: Set(new_flock.name.trim().to_string()),
            breed: Set(new_flock.breed.filter(|b| !b.trim().is_empty())),
            bird_count: Set(new_flock.bird_count),
            status: Set(FlockStatus::Active.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)?;

        info!(flock_id = model.id, "Flock created");

        self.event_sender
            .send_or_log(Event::FlockCreated {
                flock_id: model.id,
                name: model.name.clone(),
                bird_count: model.bird_count,
                created_by,
            });

        Ok(model)
    }

    pub async fn get_flock(&self, id: i32) -> Result<flock::Model, ServiceError> {
        Flock::find_by_id(id)
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Flock {} not found", id)))
    }

    /// Flocks ordered by name. Pages are 1-based.
    pub async fn list_flocks(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<flock::Model>, u64), ServiceError> {
        let paginator = Flock::find()
            .order_by_asc(flock::Column::Name)
            .order_by_asc(flock::Column::Id)
            .paginate(self.db_pool.as_ref(), per_page.max(1));

        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let flocks = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((flocks, total))
    }
}
