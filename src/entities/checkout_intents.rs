use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(
    rs_type = "String",
    db_type = "Enum",
    enum_name = "checkout_intent_status"
)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutIntentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "expired")]
    Expired,
}

/// Immutable pricing snapshot; re-pricing always creates a new intent.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "checkout_intents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Public handle returned to clients; internal ids stay internal.
    pub reference: Uuid,
    pub user_id: i64,
    pub plan_id: i64,
    pub promotion_id: Option<i64>,
    pub coupon_code: Option<String>,
    pub base_price_minor: i64,
    pub discount_percent_applied: i32,
    pub discount_minor: i64,
    pub final_price_minor: i64,
    pub status: CheckoutIntentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
