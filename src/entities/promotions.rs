use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "promotions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Coupon code, stored uppercase. None for auto-applied promotions.
    pub code: Option<String>,
    pub discount_percent: i32,
    pub start_at: Option<DateTime<Utc>>,
    /// Exclusive end instant; None means the promotion never expires.
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub archived_at: Option<DateTime<Utc>>,
    pub new_customer_only: bool,
    pub max_redemptions: Option<i32>,
    /// 0 means unlimited.
    pub max_redemptions_per_user: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A promotion can only ever match or be edited while not archived.
    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    /// Activity window check: `[start_at, end_at)` with either bound optional.
    pub fn window_contains(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_at {
            if now < start {
                return false;
            }
        }
        match self.end_at {
            Some(end) => now < end,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn promo(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Model {
        Model {
            id: 1,
            name: "Test".to_string(),
            description: None,
            code: None,
            discount_percent: 10,
            start_at: start,
            end_at: end,
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
    fn test_window_open_ended() {
        let now = Utc::now();
        assert!(promo(None, None).window_contains(now));
    }

    #[test]
    fn test_window_not_started() {
        let now = Utc::now();
        let p = promo(Some(now + Duration::hours(1)), None);
        assert!(!p.window_contains(now));
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let now = Utc::now();
        let p = promo(None, Some(now));
        assert!(!p.window_contains(now));
        assert!(p.window_contains(now - Duration::seconds(1)));
    }

    #[test]
    fn test_window_starts_exactly_now() {
        let now = Utc::now();
        let p = promo(Some(now), Some(now + Duration::days(1)));
        assert!(p.window_contains(now));
    }
}
