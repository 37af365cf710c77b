use crate::entities::{
    checkout_intent_entity as intents, promotion_entity as promotions,
    promotion_redemption_entity as redemptions, CheckoutIntentStatus,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::promotion_service::quota_available_on;
use crate::services::{pricing, PlanService, PromotionService};
use chrono::{Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CheckoutService {
    pool: Arc<DatabaseConnection>,
    plan_service: PlanService,
    promotion_service: PromotionService,
}

impl CheckoutService {
    pub fn new(
        pool: Arc<DatabaseConnection>,
        plan_service: PlanService,
        promotion_service: PromotionService,
    ) -> Self {
        Self {
            pool,
            plan_service,
            promotion_service,
        }
    }

    /// Prices a checkout and persists the decision as a pending intent.
    ///
    /// The stored amounts are a snapshot: later promotion edits or archival
    /// never touch an existing intent. A failing coupon prices at full; a
    /// missing or inactive plan fails the request.
    pub async fn create_intent(
        &self,
        user_id: i64,
        req: CreateCheckoutIntentRequest,
    ) -> AppResult<CheckoutIntentResponse> {
        let plan = self.plan_service.get_active_plan(req.plan_id).await?;
        let promotion = self
            .promotion_service
            .resolve_for_checkout(plan.id, user_id, req.coupon_code.as_deref())
            .await?;
        let quote = pricing::price(plan.price_minor, promotion.as_ref());
        let coupon_code = coupon_trace(req.coupon_code.as_deref(), promotion.as_ref());

        let intent = intents::ActiveModel {
            reference: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            plan_id: Set(plan.id),
            promotion_id: Set(promotion.as_ref().map(|p| p.id)),
            coupon_code: Set(coupon_code),
            base_price_minor: Set(plan.price_minor),
            discount_percent_applied: Set(quote.discount_percent),
            discount_minor: Set(quote.discount_minor),
            final_price_minor: Set(quote.final_price_minor),
            status: Set(CheckoutIntentStatus::Pending),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        log::info!(
            "Checkout intent {} for user {user_id}: plan {} at {} minor ({}% off)",
            intent.reference,
            plan.id,
            intent.final_price_minor,
            intent.discount_percent_applied
        );
        Ok(intent.into())
    }

    /// Payment-confirmed callback. The quota gates are re-checked and the
    /// redemption ledger row appended in one serializable transaction, so two
    /// confirmations racing for the last slot cannot both pass. Confirming an
    /// already-paid intent is a no-op returning the stored snapshot.
    pub async fn confirm_intent(
        &self,
        user_id: i64,
        reference: Uuid,
    ) -> AppResult<CheckoutIntentResponse> {
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let intent = intents::Entity::find()
            .filter(intents::Column::Reference.eq(reference))
            .filter(intents::Column::UserId.eq(user_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checkout intent {reference} not found")))?;

        match intent.status {
            CheckoutIntentStatus::Paid => return Ok(intent.into()),
            CheckoutIntentStatus::Pending => {}
            _ => {
                return Err(AppError::ValidationError(
                    "Checkout intent can no longer be confirmed".into(),
                ));
            }
        }

        if let Some(promotion_id) = intent.promotion_id {
            let promotion = promotions::Entity::find_by_id(promotion_id)
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError(format!(
                        "Promotion {promotion_id} referenced by intent {reference} is missing"
                    ))
                })?;

            if !quota_available_on(&txn, &promotion, user_id).await? {
                // the quota filled between quote and confirm; the snapshot is
                // no longer honorable
                let mut failed = intent.into_active_model();
                failed.status = Set(CheckoutIntentStatus::Failed);
                failed.updated_at = Set(Utc::now());
                failed.update(&txn).await?;
                txn.commit().await?;
                log::warn!("Promotion {promotion_id} quota exhausted before confirm of {reference}");
                return Err(AppError::ValidationError(
                    "Promotion is no longer available; please restart checkout".into(),
                ));
            }

            redemptions::ActiveModel {
                promotion_id: Set(promotion_id),
                user_id: Set(user_id),
                checkout_intent_id: Set(Some(intent.id)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        let mut paid = intent.into_active_model();
        paid.status = Set(CheckoutIntentStatus::Paid);
        paid.updated_at = Set(Utc::now());
        let intent = paid.update(&txn).await?;
        txn.commit().await?;

        log::info!("Checkout intent {reference} confirmed for user {user_id}");
        Ok(intent.into())
    }

    pub async fn get_intent(
        &self,
        user_id: i64,
        reference: Uuid,
    ) -> AppResult<CheckoutIntentResponse> {
        let intent = intents::Entity::find()
            .filter(intents::Column::Reference.eq(reference))
            .filter(intents::Column::UserId.eq(user_id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Checkout intent {reference} not found")))?;
        Ok(intent.into())
    }

    pub async fn list_user_intents(
        &self,
        user_id: i64,
        query: &CheckoutIntentQuery,
    ) -> AppResult<PaginatedResponse<CheckoutIntentResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let find = intents::Entity::find().filter(intents::Column::UserId.eq(user_id));
        let total = find.clone().count(self.pool.as_ref()).await?;
        let items = find
            .order_by_desc(intents::Column::CreatedAt)
            .order_by_desc(intents::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_per_page())
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(CheckoutIntentResponse::from)
            .collect();

        Ok(PaginatedResponse::new(items, &params, total))
    }

    /// Moves pending intents older than the TTL to `expired`. Run
    /// periodically from the background sweeper.
    pub async fn expire_stale_intents(&self, ttl_minutes: i64) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::minutes(ttl_minutes);
        let result = intents::Entity::update_many()
            .col_expr(
                intents::Column::Status,
                CheckoutIntentStatus::Expired.as_enum(),
            )
            .col_expr(intents::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(intents::Column::Status.eq(CheckoutIntentStatus::Pending))
            .filter(intents::Column::CreatedAt.lt(cutoff))
            .exec(self.pool.as_ref())
            .await?;
        Ok(result.rows_affected)
    }
}

/// A coupon is recorded on the intent only when the user actually typed one
/// and it resolved the promotion. An auto-applied promotion that happens to
/// carry a code leaves no trace; a failed coupon prices at full and likewise
/// records nothing.
fn coupon_trace(
    supplied: Option<&str>,
    promotion: Option<&promotions::Model>,
) -> Option<String> {
    promotion?;
    supplied
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_uppercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::plan_entity as plans;

    fn plan(id: i64) -> plans::Model {
        plans::Model {
            id,
            code: "monthly".to_string(),
            name: "Monthly".to_string(),
            description: None,
            price_minor: 100_000,
            duration_days: 30,
            is_active: true,
            sort_order: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn intent(status: CheckoutIntentStatus) -> intents::Model {
        intents::Model {
            id: 11,
            reference: Uuid::new_v4(),
            user_id: 42,
            plan_id: 3,
            promotion_id: None,
            coupon_code: None,
            base_price_minor: 100_000,
            discount_percent_applied: 0,
            discount_minor: 0,
            final_price_minor: 100_000,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(db: DatabaseConnection) -> CheckoutService {
        let db = Arc::new(db);
        CheckoutService::new(
            db.clone(),
            PlanService::new(db.clone()),
            PromotionService::new(db),
        )
    }

    #[tokio::test]
    async fn confirming_a_paid_intent_is_idempotent() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let paid = intent(CheckoutIntentStatus::Paid);
        let reference = paid.reference;

        // only the lookup runs; a second status flip would exhaust the mock
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![paid]])
            .into_connection();

        let confirmed = service(db).confirm_intent(42, reference).await.unwrap();
        assert_eq!(confirmed.status, CheckoutIntentStatus::Paid);
        assert_eq!(confirmed.final_price_minor, 100_000);
    }

    #[tokio::test]
    async fn expired_intent_cannot_be_confirmed() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let stale = intent(CheckoutIntentStatus::Expired);
        let reference = stale.reference;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stale]])
            .into_connection();

        let err = service(db).confirm_intent(42, reference).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn checkout_fails_on_inactive_plan() {
        use sea_orm::{DatabaseBackend, MockDatabase};

        let mut inactive = plan(3);
        inactive.is_active = false;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![inactive]])
            .into_connection();

        let err = service(db)
            .create_intent(
                42,
                CreateCheckoutIntentRequest {
                    plan_id: 3,
                    coupon_code: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PlanInvalid(_)));
    }

    fn code_promo(code: &str) -> promotions::Model {
        promotions::Model {
            id: 9,
            name: "Half Off".to_string(),
            description: None,
            code: Some(code.to_string()),
            discount_percent: 50,
            start_at: None,
            end_at: None,
            is_active: true,
            archived_at: None,
            new_customer_only: false,
            max_redemptions: None,
            max_redemptions_per_user: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn typed_coupon_is_recorded_normalized() {
        let promo = code_promo("HALF50");
        assert_eq!(
            coupon_trace(Some(" half50 "), Some(&promo)),
            Some("HALF50".to_string())
        );
    }

    #[test]
    fn auto_applied_promotion_leaves_no_coupon_trace() {
        // the promotion carries a code, but the user never typed it
        let promo = code_promo("HALF50");
        assert_eq!(coupon_trace(None, Some(&promo)), None);
        assert_eq!(coupon_trace(Some("   "), Some(&promo)), None);
    }

    #[test]
    fn failed_coupon_records_nothing() {
        assert_eq!(coupon_trace(Some("NOPE"), None), None);
    }
}
