use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One recorded feeding. Immutable once committed.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_consumption")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub flock_id: i32,
    pub feed_type: String,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub quantity: Decimal,
    pub feeding_date: NaiveDate,
    #[sea_orm(column_type = "Text", nullable)]
    pub notes: Option<String>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::flock::Entity",
        from = "Column::FlockId",
        to = "super::flock::Column::Id"
    )]
    Flock,
    #[sea_orm(has_many = "super::consumption_deduction::Entity")]
    ConsumptionDeductions,
}

impl Related<super::flock::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flock.def()
    }
}

impl Related<super::consumption_deduction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionDeductions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
