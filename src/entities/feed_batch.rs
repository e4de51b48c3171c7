use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A purchased lot of feed. Rows are never deleted; a used-up batch stays
/// behind as a zero-quantity `depleted` row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feed_inventory")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub feed_type: String,
    #[sea_orm(column_type = "Decimal(Some((14, 3)))")]
    pub quantity: Decimal,
    pub purchase_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub status: String,
    pub supplier: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((14, 4)))", nullable)]
    pub unit_cost: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::consumption_deduction::Entity")]
    ConsumptionDeductions,
}

impl Related<super::consumption_deduction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConsumptionDeductions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_in_stock(&self) -> bool {
        self.status == FeedBatchStatus::InStock.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FeedBatchStatus {
    InStock,
    Depleted,
}

impl FeedBatchStatus {
    /// A batch is depleted exactly when nothing remains in it.
    pub fn for_quantity(quantity: Decimal) -> Self {
        if quantity <= Decimal::ZERO {
            FeedBatchStatus::Depleted
        } else {
            FeedBatchStatus::InStock
        }
    }
}
