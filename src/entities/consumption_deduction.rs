use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Links a consumption record to each batch it drew from.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "consumption_deductions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub consumption_id: i32,
    pub batch_id: i32,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub quantity: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::feed_consumption::Entity",
        from = "Column::ConsumptionId",
        to = "super::feed_consumption::Column::Id"
    )]
    FeedConsumption,
    #[sea_orm(
        belongs_to = "super::feed_batch::Entity",
        from = "Column::BatchId",
        to = "super::feed_batch::Column::Id"
    )]
    FeedBatch,
}

impl Related<super::feed_consumption::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeedConsumption.def()
    }
}

impl Related<super::feed_batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FeedBatch.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
