use crate::entities::{checkout_intent_entity as intents, CheckoutIntentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateCheckoutIntentRequest {
    pub plan_id: i64,
    /// Optional coupon; an invalid or expired one degrades to full price
    /// rather than failing the checkout.
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutIntentResponse {
    pub reference: Uuid,
    pub plan_id: i64,
    pub promotion_id: Option<i64>,
    pub coupon_code: Option<String>,
    pub base_price_minor: i64,
    pub discount_percent_applied: i32,
    pub discount_minor: i64,
    pub final_price_minor: i64,
    pub status: CheckoutIntentStatus,
    pub created_at: DateTime<Utc>,
}

impl From<intents::Model> for CheckoutIntentResponse {
    fn from(intent: intents::Model) -> Self {
        Self {
            reference: intent.reference,
            plan_id: intent.plan_id,
            promotion_id: intent.promotion_id,
            coupon_code: intent.coupon_code,
            base_price_minor: intent.base_price_minor,
            discount_percent_applied: intent.discount_percent_applied,
            discount_minor: intent.discount_minor,
            final_price_minor: intent.final_price_minor,
            status: intent.status,
            created_at: intent.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutIntentQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}
