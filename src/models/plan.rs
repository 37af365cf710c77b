use crate::entities::plan_entity as plans;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub duration_days: i32,
    pub is_active: bool,
    pub sort_order: i32,
}

impl From<plans::Model> for PlanResponse {
    fn from(plan: plans::Model) -> Self {
        Self {
            id: plan.id,
            code: plan.code,
            name: plan.name,
            description: plan.description,
            price_minor: plan.price_minor,
            duration_days: plan.duration_days,
            is_active: plan.is_active,
            sort_order: plan.sort_order,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreatePlanRequest {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price_minor: i64,
    pub duration_days: i32,
    #[serde(default)]
    pub sort_order: i32,
}

/// `code` is deliberately absent: it is immutable once created.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatePlanRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_minor: Option<i64>,
    pub duration_days: Option<i32>,
    pub sort_order: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PlanListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    /// Admin listing may include deactivated plans.
    pub include_inactive: Option<bool>,
}
