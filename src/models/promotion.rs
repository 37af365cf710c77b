use crate::entities::promotion_entity as promotions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePromotionRequest {
    pub name: String,
    pub description: Option<String>,
    /// Coupon code; omit for auto-applied promotions. Normalized to uppercase.
    pub code: Option<String>,
    pub discount_percent: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub new_customer_only: bool,
    pub max_redemptions: Option<i32>,
    pub max_redemptions_per_user: Option<i32>,
    pub plan_ids: Vec<i64>,
}

/// PATCH-style payload: absent fields are left unchanged. Once a promotion
/// has a redemption, only `name`, `description` and `end_at` are accepted.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdatePromotionRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub code: Option<String>,
    pub discount_percent: Option<i32>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub new_customer_only: Option<bool>,
    pub max_redemptions: Option<i32>,
    pub max_redemptions_per_user: Option<i32>,
    pub plan_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromotionResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub code: Option<String>,
    pub discount_percent: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub new_customer_only: bool,
    pub max_redemptions: Option<i32>,
    pub max_redemptions_per_user: i32,
    pub plan_ids: Vec<i64>,
    pub redemption_count: u64,
    pub created_at: DateTime<Utc>,
}

impl PromotionResponse {
    pub fn from_model(
        promotion: promotions::Model,
        plan_ids: Vec<i64>,
        redemption_count: u64,
    ) -> Self {
        Self {
            id: promotion.id,
            name: promotion.name,
            description: promotion.description,
            code: promotion.code,
            discount_percent: promotion.discount_percent,
            start_at: promotion.start_at,
            end_at: promotion.end_at,
            is_active: promotion.is_active,
            archived_at: promotion.archived_at,
            new_customer_only: promotion.new_customer_only,
            max_redemptions: promotion.max_redemptions,
            max_redemptions_per_user: promotion.max_redemptions_per_user,
            plan_ids,
            redemption_count,
            created_at: promotion.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromotionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub include_archived: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LockedPlansQuery {
    /// Promotion id being edited; its own claims are not conflicts.
    pub exclude: Option<i64>,
}

/// A plan already claimed by another active promotion; the admin UI disables
/// these in the plan picker and names the claimant.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LockedPlan {
    pub plan_id: i64,
    pub promotion_name: String,
}
