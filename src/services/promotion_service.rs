use crate::entities::{
    plan_entity as plans, promotion_entity as promotions, promotion_plan_entity as promotion_plans,
    promotion_redemption_entity as redemptions,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::services::customer_history_service::is_new_customer_on;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct PromotionService {
    pool: Arc<DatabaseConnection>,
}

impl PromotionService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// Picks the single promotion applicable to a checkout, or None.
    ///
    /// A supplied coupon is authoritative: if it fails any gate the checkout
    /// proceeds at full price, with no fallback to auto-applied promotions.
    /// Without a coupon, new customers get the best-discount active
    /// new-customer promotion that covers the plan and still has quota.
    /// Database failures propagate; they are never folded into None.
    pub async fn resolve_for_checkout(
        &self,
        plan_id: i64,
        user_id: i64,
        coupon_code: Option<&str>,
    ) -> AppResult<Option<promotions::Model>> {
        let now = Utc::now();

        if let Some(code) = coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
            let normalized = code.to_uppercase();
            let promotion = promotions::Entity::find()
                .filter(promotions::Column::Code.eq(normalized))
                .one(self.pool.as_ref())
                .await?;
            let Some(promotion) = promotion else {
                return Ok(None);
            };
            if self.coupon_gate(&promotion, plan_id, user_id, now).await? {
                return Ok(Some(promotion));
            }
            return Ok(None);
        }

        if !is_new_customer_on(self.pool.as_ref(), user_id).await? {
            return Ok(None);
        }

        // Linear scan with early termination: plan-link and quota checks are
        // per-candidate I/O. Best discount first, id ascending as the stable
        // tie-break.
        let candidates = promotions::Entity::find()
            .filter(promotions::Column::IsActive.eq(true))
            .filter(promotions::Column::ArchivedAt.is_null())
            .filter(promotions::Column::NewCustomerOnly.eq(true))
            .order_by_desc(promotions::Column::DiscountPercent)
            .order_by_asc(promotions::Column::Id)
            .all(self.pool.as_ref())
            .await?;

        for promotion in candidates {
            if !promotion.window_contains(now) {
                continue;
            }
            if !plan_linked_on(self.pool.as_ref(), promotion.id, plan_id).await? {
                continue;
            }
            if !quota_available_on(self.pool.as_ref(), &promotion, user_id).await? {
                continue;
            }
            return Ok(Some(promotion));
        }

        Ok(None)
    }

    /// Coupon validity gate: every condition must hold, any failure means
    /// "no promotion", never an error.
    async fn coupon_gate(
        &self,
        promotion: &promotions::Model,
        plan_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        if !promotion.is_active || promotion.is_archived() {
            return Ok(false);
        }
        if !promotion.window_contains(now) {
            return Ok(false);
        }
        if promotion.new_customer_only && !is_new_customer_on(self.pool.as_ref(), user_id).await? {
            return Ok(false);
        }
        if !plan_linked_on(self.pool.as_ref(), promotion.id, plan_id).await? {
            return Ok(false);
        }
        quota_available_on(self.pool.as_ref(), promotion, user_id).await
    }

    /// Plans already claimed by another active, non-archived promotion.
    /// The admin UI shows these as disabled, naming the claimant.
    pub async fn locked_plans(&self, exclude_promotion_id: Option<i64>) -> AppResult<Vec<LockedPlan>> {
        let locked = locked_plan_map_on(self.pool.as_ref(), exclude_promotion_id).await?;
        let mut result: Vec<LockedPlan> = locked
            .into_iter()
            .map(|(plan_id, promotion_name)| LockedPlan {
                plan_id,
                promotion_name,
            })
            .collect();
        result.sort_by_key(|entry| entry.plan_id);
        Ok(result)
    }

    pub async fn create_promotion(&self, req: CreatePromotionRequest) -> AppResult<PromotionResponse> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError("Promotion name is required".into()));
        }
        validate_promotion_fields(
            req.discount_percent,
            req.start_at,
            req.end_at,
            req.max_redemptions,
            req.max_redemptions_per_user.unwrap_or(1),
        )?;
        let plan_ids = normalize_plan_ids(&req.plan_ids)?;
        let code = normalize_code(req.code.as_deref());

        // conflict check and inserts form one unit; serializable so two
        // concurrent promotions cannot both claim a free plan
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        if let Some(code) = &code {
            let duplicate = promotions::Entity::find()
                .filter(promotions::Column::Code.eq(code.clone()))
                .one(&txn)
                .await?;
            if duplicate.is_some() {
                return Err(AppError::ValidationError(format!(
                    "Coupon code \"{code}\" is already in use"
                )));
            }
        }

        ensure_plans_exist(&txn, &plan_ids).await?;
        let locked = locked_plan_map_on(&txn, None).await?;
        for plan_id in &plan_ids {
            if let Some(promotion_name) = locked.get(plan_id) {
                return Err(AppError::PlanConflict {
                    plan_id: *plan_id,
                    promotion_name: promotion_name.clone(),
                });
            }
        }

        let promotion = promotions::ActiveModel {
            name: Set(name),
            description: Set(req.description),
            code: Set(code),
            discount_percent: Set(req.discount_percent),
            start_at: Set(req.start_at),
            end_at: Set(req.end_at),
            is_active: Set(true),
            archived_at: Set(None),
            new_customer_only: Set(req.new_customer_only),
            max_redemptions: Set(req.max_redemptions),
            max_redemptions_per_user: Set(req.max_redemptions_per_user.unwrap_or(1)),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        replace_plan_links(&txn, promotion.id, &plan_ids, false).await?;
        txn.commit().await?;

        log::info!("Created promotion {} ({})", promotion.id, promotion.name);
        Ok(PromotionResponse::from_model(promotion, plan_ids, 0))
    }

    /// PATCH semantics with explicit locking: once a promotion has a
    /// redemption, an attempt to change any commercial field is rejected with
    /// PromotionLocked rather than silently dropped.
    pub async fn update_promotion(
        &self,
        promotion_id: i64,
        req: UpdatePromotionRequest,
    ) -> AppResult<PromotionResponse> {
        let txn = self
            .pool
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await?;

        let promotion = promotions::Entity::find_by_id(promotion_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion {promotion_id} not found")))?;

        if promotion.is_archived() {
            return Err(AppError::PromotionLocked(
                "Archived promotions are read-only".into(),
            ));
        }

        let current_plan_ids = linked_plan_ids_on(&txn, promotion.id).await?;
        let redemption_count = redemption_count_on(&txn, promotion.id).await?;
        let used = redemption_count > 0;

        if used {
            if let Some(field) = locked_field_change(&promotion, &current_plan_ids, &req) {
                return Err(AppError::PromotionLocked(format!(
                    "Promotion has redemptions; \"{field}\" can no longer be changed"
                )));
            }
        }

        validate_promotion_fields(
            req.discount_percent.unwrap_or(promotion.discount_percent),
            req.start_at.or(promotion.start_at),
            req.end_at.or(promotion.end_at),
            req.max_redemptions.or(promotion.max_redemptions),
            req.max_redemptions_per_user
                .unwrap_or(promotion.max_redemptions_per_user),
        )?;

        let mut active = promotion.clone().into_active_model();
        if let Some(name) = &req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::ValidationError("Promotion name is required".into()));
            }
            active.name = Set(name);
        }
        if let Some(description) = &req.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(end_at) = req.end_at {
            active.end_at = Set(Some(end_at));
        }

        if !used {
            if let Some(raw) = &req.code {
                let code = normalize_code(Some(raw.as_str()));
                if let Some(code) = &code {
                    let duplicate = promotions::Entity::find()
                        .filter(promotions::Column::Code.eq(code.clone()))
                        .filter(promotions::Column::Id.ne(promotion.id))
                        .one(&txn)
                        .await?;
                    if duplicate.is_some() {
                        return Err(AppError::ValidationError(format!(
                            "Coupon code \"{code}\" is already in use"
                        )));
                    }
                }
                active.code = Set(code);
            }
            if let Some(discount_percent) = req.discount_percent {
                active.discount_percent = Set(discount_percent);
            }
            if let Some(start_at) = req.start_at {
                active.start_at = Set(Some(start_at));
            }
            if let Some(is_active) = req.is_active {
                active.is_active = Set(is_active);
            }
            if let Some(new_customer_only) = req.new_customer_only {
                active.new_customer_only = Set(new_customer_only);
            }
            if let Some(max_redemptions) = req.max_redemptions {
                active.max_redemptions = Set(Some(max_redemptions));
            }
            if let Some(max_per_user) = req.max_redemptions_per_user {
                active.max_redemptions_per_user = Set(max_per_user);
            }
        }

        let final_plan_ids = if let Some(plan_ids) = &req.plan_ids {
            // only reachable while unused; the locked-field check above
            // rejects plan-set changes once redeemed
            let plan_ids = normalize_plan_ids(plan_ids)?;
            ensure_plans_exist(&txn, &plan_ids).await?;
            plan_ids
        } else {
            current_plan_ids
        };

        // guard the final plan set whenever the promotion ends up active: a
        // deactivated promotion frees its plans, so reactivating it must
        // re-claim them against whatever went live in the meantime
        if req.is_active.unwrap_or(promotion.is_active) {
            let locked = locked_plan_map_on(&txn, Some(promotion.id)).await?;
            for plan_id in &final_plan_ids {
                if let Some(promotion_name) = locked.get(plan_id) {
                    return Err(AppError::PlanConflict {
                        plan_id: *plan_id,
                        promotion_name: promotion_name.clone(),
                    });
                }
            }
        }

        if req.plan_ids.is_some() {
            replace_plan_links(&txn, promotion.id, &final_plan_ids, true).await?;
        }

        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;
        txn.commit().await?;

        Ok(PromotionResponse::from_model(
            updated,
            final_plan_ids,
            redemption_count,
        ))
    }

    /// Terminal and idempotent: archiving an archived promotion is a no-op.
    pub async fn archive_promotion(&self, promotion_id: i64) -> AppResult<()> {
        let promotion = promotions::Entity::find_by_id(promotion_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion {promotion_id} not found")))?;

        if promotion.is_archived() {
            return Ok(());
        }

        let mut active = promotion.into_active_model();
        active.archived_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        active.update(self.pool.as_ref()).await?;

        log::info!("Archived promotion {promotion_id}");
        Ok(())
    }

    pub async fn get_promotion(&self, promotion_id: i64) -> AppResult<PromotionResponse> {
        let promotion = promotions::Entity::find_by_id(promotion_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Promotion {promotion_id} not found")))?;
        let plan_ids = linked_plan_ids_on(self.pool.as_ref(), promotion.id).await?;
        let redemption_count = redemption_count_on(self.pool.as_ref(), promotion.id).await?;
        Ok(PromotionResponse::from_model(
            promotion,
            plan_ids,
            redemption_count,
        ))
    }

    pub async fn list_promotions(
        &self,
        query: &PromotionListQuery,
    ) -> AppResult<PaginatedResponse<PromotionResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let mut find = promotions::Entity::find();
        if !query.include_archived.unwrap_or(false) {
            find = find.filter(promotions::Column::ArchivedAt.is_null());
        }

        let total = find.clone().count(self.pool.as_ref()).await?;
        let page = find
            .order_by_desc(promotions::Column::CreatedAt)
            .order_by_desc(promotions::Column::Id)
            .offset(params.get_offset())
            .limit(params.get_per_page())
            .all(self.pool.as_ref())
            .await?;

        let mut items = Vec::with_capacity(page.len());
        for promotion in page {
            let plan_ids = linked_plan_ids_on(self.pool.as_ref(), promotion.id).await?;
            let redemption_count = redemption_count_on(self.pool.as_ref(), promotion.id).await?;
            items.push(PromotionResponse::from_model(
                promotion,
                plan_ids,
                redemption_count,
            ));
        }

        Ok(PaginatedResponse::new(items, &params, total))
    }
}

pub(crate) async fn plan_linked_on<C: ConnectionTrait>(
    db: &C,
    promotion_id: i64,
    plan_id: i64,
) -> AppResult<bool> {
    let link = promotion_plans::Entity::find_by_id((promotion_id, plan_id))
        .one(db)
        .await?;
    Ok(link.is_some())
}

/// Quota gate: both the promotion-wide cap and the per-user cap must leave
/// room. Either failing disqualifies the promotion.
pub(crate) async fn quota_available_on<C: ConnectionTrait>(
    db: &C,
    promotion: &promotions::Model,
    user_id: i64,
) -> AppResult<bool> {
    if let Some(max_redemptions) = promotion.max_redemptions {
        let total = redemptions::Entity::find()
            .filter(redemptions::Column::PromotionId.eq(promotion.id))
            .count(db)
            .await?;
        if total >= max_redemptions as u64 {
            return Ok(false);
        }
    }
    if promotion.max_redemptions_per_user > 0 {
        let mine = redemptions::Entity::find()
            .filter(redemptions::Column::PromotionId.eq(promotion.id))
            .filter(redemptions::Column::UserId.eq(user_id))
            .count(db)
            .await?;
        if mine >= promotion.max_redemptions_per_user as u64 {
            return Ok(false);
        }
    }
    Ok(true)
}

pub(crate) async fn redemption_count_on<C: ConnectionTrait>(
    db: &C,
    promotion_id: i64,
) -> AppResult<u64> {
    let count = redemptions::Entity::find()
        .filter(redemptions::Column::PromotionId.eq(promotion_id))
        .count(db)
        .await?;
    Ok(count)
}

async fn linked_plan_ids_on<C: ConnectionTrait>(db: &C, promotion_id: i64) -> AppResult<Vec<i64>> {
    let links = promotion_plans::Entity::find()
        .filter(promotion_plans::Column::PromotionId.eq(promotion_id))
        .order_by_asc(promotion_plans::Column::PlanId)
        .all(db)
        .await?;
    Ok(links.into_iter().map(|link| link.plan_id).collect())
}

/// Map of plan id -> name of the active, non-archived promotion claiming it,
/// excluding the promotion being edited.
async fn locked_plan_map_on<C: ConnectionTrait>(
    db: &C,
    exclude_promotion_id: Option<i64>,
) -> AppResult<HashMap<i64, String>> {
    let mut find = promotions::Entity::find()
        .filter(promotions::Column::IsActive.eq(true))
        .filter(promotions::Column::ArchivedAt.is_null());
    if let Some(id) = exclude_promotion_id {
        find = find.filter(promotions::Column::Id.ne(id));
    }
    let claimants = find.order_by_asc(promotions::Column::Id).all(db).await?;

    let mut locked = HashMap::new();
    for promotion in claimants {
        let links = promotion_plans::Entity::find()
            .filter(promotion_plans::Column::PromotionId.eq(promotion.id))
            .all(db)
            .await?;
        for link in links {
            locked.entry(link.plan_id).or_insert_with(|| promotion.name.clone());
        }
    }
    Ok(locked)
}

async fn ensure_plans_exist<C: ConnectionTrait>(db: &C, plan_ids: &[i64]) -> AppResult<()> {
    let found = plans::Entity::find()
        .filter(plans::Column::Id.is_in(plan_ids.to_vec()))
        .count(db)
        .await?;
    if found != plan_ids.len() as u64 {
        return Err(AppError::ValidationError(
            "Plan selection contains an unknown plan".into(),
        ));
    }
    Ok(())
}

/// Full plan-set replacement. Delete and insert run on the caller's
/// transaction so a crash cannot leave the promotion with zero plans.
async fn replace_plan_links<C: ConnectionTrait>(
    db: &C,
    promotion_id: i64,
    plan_ids: &[i64],
    delete_existing: bool,
) -> AppResult<()> {
    if delete_existing {
        promotion_plans::Entity::delete_many()
            .filter(promotion_plans::Column::PromotionId.eq(promotion_id))
            .exec(db)
            .await?;
    }
    let links: Vec<promotion_plans::ActiveModel> = plan_ids
        .iter()
        .map(|plan_id| promotion_plans::ActiveModel {
            promotion_id: Set(promotion_id),
            plan_id: Set(*plan_id),
        })
        .collect();
    promotion_plans::Entity::insert_many(links).exec(db).await?;
    Ok(())
}

fn normalize_code(code: Option<&str>) -> Option<String> {
    let trimmed = code?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_uppercase())
}

fn normalize_plan_ids(plan_ids: &[i64]) -> AppResult<Vec<i64>> {
    let mut ids = plan_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::PlanSelectionRequired);
    }
    Ok(ids)
}

fn validate_promotion_fields(
    discount_percent: i32,
    start_at: Option<DateTime<Utc>>,
    end_at: Option<DateTime<Utc>>,
    max_redemptions: Option<i32>,
    max_redemptions_per_user: i32,
) -> AppResult<()> {
    if !(1..=100).contains(&discount_percent) {
        return Err(AppError::ValidationError(
            "Discount percent must be between 1 and 100".into(),
        ));
    }
    if let (Some(start), Some(end)) = (start_at, end_at) {
        if start >= end {
            return Err(AppError::ValidationError(
                "Promotion start must be before its end".into(),
            ));
        }
    }
    if let Some(max) = max_redemptions {
        if max < 1 {
            return Err(AppError::ValidationError(
                "Max redemptions must be at least 1".into(),
            ));
        }
    }
    if max_redemptions_per_user < 0 {
        return Err(AppError::ValidationError(
            "Per-user redemption limit must not be negative".into(),
        ));
    }
    Ok(())
}

/// Returns the first redemption-locked field an update payload tries to
/// change, if any. Submitting the current value back is not a change;
/// name, description and end_at are always editable.
fn locked_field_change(
    promotion: &promotions::Model,
    current_plan_ids: &[i64],
    req: &UpdatePromotionRequest,
) -> Option<&'static str> {
    if let Some(raw) = &req.code {
        if normalize_code(Some(raw.as_str())) != promotion.code {
            return Some("code");
        }
    }
    if let Some(discount_percent) = req.discount_percent {
        if discount_percent != promotion.discount_percent {
            return Some("discount_percent");
        }
    }
    if let Some(start_at) = req.start_at {
        if Some(start_at) != promotion.start_at {
            return Some("start_at");
        }
    }
    if let Some(is_active) = req.is_active {
        if is_active != promotion.is_active {
            return Some("is_active");
        }
    }
    if let Some(new_customer_only) = req.new_customer_only {
        if new_customer_only != promotion.new_customer_only {
            return Some("new_customer_only");
        }
    }
    if let Some(max_redemptions) = req.max_redemptions {
        if Some(max_redemptions) != promotion.max_redemptions {
            return Some("max_redemptions");
        }
    }
    if let Some(max_per_user) = req.max_redemptions_per_user {
        if max_per_user != promotion.max_redemptions_per_user {
            return Some("max_redemptions_per_user");
        }
    }
    if let Some(plan_ids) = &req.plan_ids {
        let mut requested = plan_ids.clone();
        requested.sort_unstable();
        requested.dedup();
        if requested != current_plan_ids {
            return Some("plan_ids");
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn promo(id: i64, name: &str, discount: i32) -> promotions::Model {
        promotions::Model {
            id,
            name: name.to_string(),
            description: None,
            code: None,
            discount_percent: discount,
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

    fn link(promotion_id: i64, plan_id: i64) -> promotion_plans::Model {
        promotion_plans::Model {
            promotion_id,
            plan_id,
        }
    }

    #[tokio::test]
    async fn coupon_wins_over_auto_promotions() {
        // coupon promotion at 50%; the auto path is never consulted
        let mut coupon = promo(9, "Half Off", 50);
        coupon.code = Some("HALF50".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // lookup by code
            .append_query_results([vec![coupon]])
            // plan link exists
            .append_query_results([vec![link(9, 3)]])
            // per-user quota: no prior redemption
            .append_query_results([vec![count_row(0)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, Some("half50"))
            .await
            .unwrap();
        assert_eq!(resolved.unwrap().discount_percent, 50);
    }

    #[tokio::test]
    async fn expired_coupon_degrades_to_no_promotion() {
        let mut expired = promo(9, "Old Deal", 50);
        expired.code = Some("OLD".to_string());
        expired.end_at = Some(Utc::now() - Duration::days(1));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![expired]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, Some("OLD"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn unknown_coupon_is_not_an_error() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<promotions::Model>::new()])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, Some("NOPE"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn exhausted_quota_disqualifies_coupon() {
        let mut capped = promo(9, "One Only", 50);
        capped.code = Some("ONE".to_string());
        capped.max_redemptions = Some(1);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![capped]])
            // plan link exists
            .append_query_results([vec![link(9, 3)]])
            // promotion-wide count already at cap; per-user never reached
            .append_query_results([vec![count_row(1)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, Some("ONE"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn per_user_quota_blocks_repeat_redemption() {
        let mut coupon = promo(9, "Once Each", 20);
        coupon.code = Some("ONCE".to_string());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![coupon]])
            .append_query_results([vec![link(9, 3)]])
            // this user already redeemed once
            .append_query_results([vec![count_row(1)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, Some("ONCE"))
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn auto_promotion_selected_for_new_customer() {
        let launch = {
            let mut p = promo(5, "Launch20", 20);
            p.new_customer_only = true;
            p
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // classifier: no paid payments, no subscriptions
            .append_query_results([vec![count_row(0)], vec![count_row(0)]])
            // candidate scan
            .append_query_results([vec![launch]])
            // plan link exists
            .append_query_results([vec![link(5, 3)]])
            // per-user quota clear
            .append_query_results([vec![count_row(0)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, None)
            .await
            .unwrap();
        let resolved = resolved.unwrap();
        assert_eq!(resolved.name, "Launch20");
        assert_eq!(resolved.discount_percent, 20);
    }

    #[tokio::test]
    async fn returning_customer_gets_no_auto_promotion() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // classifier: a paid payment exists
            .append_query_results([vec![count_row(1)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, None)
            .await
            .unwrap();
        assert!(resolved.is_none());
    }

    #[tokio::test]
    async fn auto_scan_skips_candidate_without_plan_link() {
        let big_but_unlinked = {
            let mut p = promo(5, "Big", 30);
            p.new_customer_only = true;
            p
        };
        let linked = {
            let mut p = promo(6, "Smaller", 20);
            p.new_customer_only = true;
            p
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(0)], vec![count_row(0)]])
            .append_query_results([vec![big_but_unlinked, linked]])
            // first candidate: no link; second: linked
            .append_query_results([Vec::<promotion_plans::Model>::new(), vec![link(6, 3)]])
            .append_query_results([vec![count_row(0)]])
            .into_connection();

        let resolved = PromotionService::new(Arc::new(db))
            .resolve_for_checkout(3, 42, None)
            .await
            .unwrap();
        assert_eq!(resolved.unwrap().name, "Smaller");
    }

    #[tokio::test]
    async fn archiving_an_archived_promotion_is_a_noop() {
        let mut archived = promo(4, "Done", 10);
        archived.archived_at = Some(Utc::now());

        // only the lookup runs; any update would exhaust the mock
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![archived]])
            .into_connection();

        PromotionService::new(Arc::new(db)).archive_promotion(4).await.unwrap();
    }

    #[tokio::test]
    async fn create_rejects_plan_claimed_by_active_promotion() {
        let claimant = promo(2, "Spring Sale", 15);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // all selected plans exist
            .append_query_results([vec![count_row(1)]])
            // conflict scan finds the claimant holding plan 7
            .append_query_results([vec![claimant]])
            .append_query_results([vec![link(2, 7)]])
            .into_connection();

        let req = CreatePromotionRequest {
            name: "Summer Sale".to_string(),
            description: None,
            code: None,
            discount_percent: 20,
            start_at: None,
            end_at: None,
            new_customer_only: false,
            max_redemptions: None,
            max_redemptions_per_user: None,
            plan_ids: vec![7],
        };

        let err = PromotionService::new(Arc::new(db))
            .create_promotion(req)
            .await
            .unwrap_err();
        match err {
            AppError::PlanConflict {
                plan_id,
                promotion_name,
            } => {
                assert_eq!(plan_id, 7);
                assert_eq!(promotion_name, "Spring Sale");
            }
            other => panic!("expected PlanConflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reactivation_rechecks_plan_conflicts() {
        // A was deactivated, B went live on the same plan in the meantime;
        // turning A back on must not leave both claiming plan 7
        let mut dormant = promo(1, "Old Deal", 10);
        dormant.is_active = false;
        let claimant = promo(2, "Spring Sale", 15);

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![dormant]])
            .append_query_results([vec![link(1, 7)]])
            .append_query_results([vec![count_row(0)]])
            // conflict scan excluding promotion 1
            .append_query_results([vec![claimant]])
            .append_query_results([vec![link(2, 7)]])
            .into_connection();

        let req = UpdatePromotionRequest {
            is_active: Some(true),
            ..Default::default()
        };

        let err = PromotionService::new(Arc::new(db))
            .update_promotion(1, req)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::PlanConflict {
                plan_id: 7,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn active_promotion_does_not_conflict_with_itself() {
        let current = promo(1, "Spring", 25);
        let mut renamed = current.clone();
        renamed.name = "Spring Sale".to_string();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![current]])
            .append_query_results([vec![link(1, 7)]])
            .append_query_results([vec![count_row(0)]])
            // conflict scan excludes the promotion itself, leaving no claimants
            .append_query_results([Vec::<promotions::Model>::new()])
            .append_query_results([vec![renamed]])
            .into_connection();

        let req = UpdatePromotionRequest {
            name: Some("Spring Sale".to_string()),
            ..Default::default()
        };

        let updated = PromotionService::new(Arc::new(db))
            .update_promotion(1, req)
            .await
            .unwrap();
        assert_eq!(updated.name, "Spring Sale");
        assert_eq!(updated.plan_ids, vec![7]);
    }

    #[test]
    fn locked_fields_reject_changes_but_allow_same_values() {
        let mut promotion = promo(1, "Spring", 25);
        promotion.code = Some("SPRING".to_string());
        promotion.max_redemptions = Some(100);
        let plans = vec![1, 2];

        // no-op payload passes
        let noop = UpdatePromotionRequest {
            code: Some("spring".to_string()), // normalizes to the same code
            discount_percent: Some(25),
            max_redemptions: Some(100),
            plan_ids: Some(vec![2, 1]),
            ..Default::default()
        };
        assert_eq!(locked_field_change(&promotion, &plans, &noop), None);

        let change_discount = UpdatePromotionRequest {
            discount_percent: Some(30),
            ..Default::default()
        };
        assert_eq!(
            locked_field_change(&promotion, &plans, &change_discount),
            Some("discount_percent")
        );

        let change_code = UpdatePromotionRequest {
            code: Some("AUTUMN".to_string()),
            ..Default::default()
        };
        assert_eq!(
            locked_field_change(&promotion, &plans, &change_code),
            Some("code")
        );

        let change_plans = UpdatePromotionRequest {
            plan_ids: Some(vec![1, 3]),
            ..Default::default()
        };
        assert_eq!(
            locked_field_change(&promotion, &plans, &change_plans),
            Some("plan_ids")
        );

        let change_quota = UpdatePromotionRequest {
            max_redemptions: Some(200),
            ..Default::default()
        };
        assert_eq!(
            locked_field_change(&promotion, &plans, &change_quota),
            Some("max_redemptions")
        );

        // name/description/end_at stay editable
        let cosmetic = UpdatePromotionRequest {
            name: Some("Spring Sale".to_string()),
            description: Some("renamed".to_string()),
            end_at: Some(Utc::now()),
            ..Default::default()
        };
        assert_eq!(locked_field_change(&promotion, &plans, &cosmetic), None);
    }

    #[test]
    fn code_normalization() {
        assert_eq!(normalize_code(Some(" launch50 ")), Some("LAUNCH50".to_string()));
        assert_eq!(normalize_code(Some("   ")), None);
        assert_eq!(normalize_code(None), None);
    }

    #[test]
    fn plan_id_normalization() {
        assert_eq!(normalize_plan_ids(&[3, 1, 3, 2]).unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            normalize_plan_ids(&[]),
            Err(AppError::PlanSelectionRequired)
        ));
    }

    #[test]
    fn promotion_field_validation() {
        let now = Utc::now();
        assert!(validate_promotion_fields(1, None, None, None, 1).is_ok());
        assert!(validate_promotion_fields(100, None, None, Some(1), 0).is_ok());
        assert!(validate_promotion_fields(0, None, None, None, 1).is_err());
        assert!(validate_promotion_fields(101, None, None, None, 1).is_err());
        assert!(validate_promotion_fields(10, Some(now), Some(now), None, 1).is_err());
        assert!(validate_promotion_fields(10, None, None, Some(0), 1).is_err());
        assert!(validate_promotion_fields(10, None, None, None, -1).is_err());
    }
}
