use crate::entities::plan_entity as plans;
use crate::error::{AppError, AppResult};
use crate::models::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct PlanService {
    pool: Arc<DatabaseConnection>,
}

impl PlanService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// Checkout-facing lookup. A missing plan and a deactivated plan read the
    /// same to the caller: the checkout must not proceed.
    pub async fn get_active_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        let plan = plans::Entity::find_by_id(plan_id).one(self.pool.as_ref()).await?;
        match plan {
            Some(plan) if plan.is_active => Ok(plan),
            _ => Err(AppError::PlanInvalid(format!(
                "Plan {plan_id} is not available"
            ))),
        }
    }

    /// Public storefront listing.
    pub async fn list_active_plans(&self) -> AppResult<Vec<PlanResponse>> {
        let plans = plans::Entity::find()
            .filter(plans::Column::IsActive.eq(true))
            .order_by_asc(plans::Column::SortOrder)
            .order_by_asc(plans::Column::Id)
            .all(self.pool.as_ref())
            .await?;
        Ok(plans.into_iter().map(PlanResponse::from).collect())
    }

    pub async fn list_plans(
        &self,
        query: &PlanListQuery,
    ) -> AppResult<PaginatedResponse<PlanResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut find = plans::Entity::find();
        if !query.include_inactive.unwrap_or(false) {
            find = find.filter(plans::Column::IsActive.eq(true));
        }

        let total = find.clone().count(self.pool.as_ref()).await?;
        let items = find
            .order_by_asc(plans::Column::SortOrder)
            .order_by_asc(plans::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_per_page())
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(PlanResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    pub async fn create_plan(&self, req: CreatePlanRequest) -> AppResult<PlanResponse> {
        let code = req.code.trim().to_string();
        if code.is_empty() {
            return Err(AppError::ValidationError("Plan code is required".into()));
        }
        validate_plan_economics(req.price_minor, req.duration_days)?;

        // friendly duplicate check before the unique constraint would trip
        let existing = plans::Entity::find()
            .filter(plans::Column::Code.eq(code.clone()))
            .one(self.pool.as_ref())
            .await?;
        if existing.is_some() {
            return Err(AppError::ValidationError(format!(
                "Plan code \"{code}\" already exists"
            )));
        }

        let plan = plans::ActiveModel {
            code: Set(code),
            name: Set(req.name.trim().to_string()),
            description: Set(req.description),
            price_minor: Set(req.price_minor),
            duration_days: Set(req.duration_days),
            is_active: Set(true),
            sort_order: Set(req.sort_order),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        log::info!("Created plan {} ({})", plan.id, plan.code);
        Ok(plan.into())
    }

    /// `code` is immutable; plans are never hard-deleted because history
    /// references them.
    pub async fn update_plan(&self, plan_id: i64, req: UpdatePlanRequest) -> AppResult<PlanResponse> {
        let plan = plans::Entity::find_by_id(plan_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;

        validate_plan_economics(
            req.price_minor.unwrap_or(plan.price_minor),
            req.duration_days.unwrap_or(plan.duration_days),
        )?;

        let mut active = plan.into_active_model();
        if let Some(name) = req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(Some(description));
        }
        if let Some(price_minor) = req.price_minor {
            active.price_minor = Set(price_minor);
        }
        if let Some(duration_days) = req.duration_days {
            active.duration_days = Set(duration_days);
        }
        if let Some(sort_order) = req.sort_order {
            active.sort_order = Set(sort_order);
        }
        active.updated_at = Set(Utc::now());

        let plan = active.update(self.pool.as_ref()).await?;
        Ok(plan.into())
    }

    pub async fn set_plan_active(&self, plan_id: i64, active: bool) -> AppResult<PlanResponse> {
        let plan = plans::Entity::find_by_id(plan_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;

        let mut am = plan.into_active_model();
        am.is_active = Set(active);
        am.updated_at = Set(Utc::now());
        let plan = am.update(self.pool.as_ref()).await?;

        log::info!(
            "Plan {} is now {}",
            plan.id,
            if active { "active" } else { "inactive" }
        );
        Ok(plan.into())
    }
}

fn validate_plan_economics(price_minor: i64, duration_days: i32) -> AppResult<()> {
    if price_minor < 0 {
        return Err(AppError::ValidationError(
            "Plan price must not be negative".into(),
        ));
    }
    if duration_days <= 0 {
        return Err(AppError::ValidationError(
            "Plan duration must be at least one day".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn plan(id: i64, is_active: bool) -> plans::Model {
        plans::Model {
            id,
            code: format!("plan-{id}"),
            name: "Monthly".to_string(),
            description: None,
            price_minor: 100_000,
            duration_days: 30,
            is_active,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn inactive_plan_is_rejected_at_checkout() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![plan(3, false)]])
            .into_connection();

        let err = PlanService::new(Arc::new(db)).get_active_plan(3).await.unwrap_err();
        assert!(matches!(err, AppError::PlanInvalid(_)));
    }

    #[tokio::test]
    async fn missing_plan_is_rejected_at_checkout() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<plans::Model>::new()])
            .into_connection();

        let err = PlanService::new(Arc::new(db)).get_active_plan(99).await.unwrap_err();
        assert!(matches!(err, AppError::PlanInvalid(_)));
    }

    #[tokio::test]
    async fn active_plan_is_returned() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![plan(3, true)]])
            .into_connection();

        let found = PlanService::new(Arc::new(db)).get_active_plan(3).await.unwrap();
        assert_eq!(found.id, 3);
    }

    #[test]
    fn plan_economics_are_validated() {
        assert!(validate_plan_economics(0, 30).is_ok());
        assert!(validate_plan_economics(-1, 30).is_err());
        assert!(validate_plan_economics(100, 0).is_err());
    }
}
