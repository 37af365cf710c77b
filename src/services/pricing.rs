use crate::entities::promotion_entity as promotions;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceBreakdown {
    pub discount_percent: i32,
    pub discount_minor: i64,
    pub final_price_minor: i64,
}

/// Applies a promotion's percentage discount to a base price in minor units.
///
/// The discount amount floors (never rounds up) so the customer is never
/// granted more than the exact percentage implies, and the final amount
/// floors at zero. A 100% promotion producing a free checkout is a valid
/// outcome, not an error.
pub fn price(base_price_minor: i64, promotion: Option<&promotions::Model>) -> PriceBreakdown {
    let discount_percent = promotion
        .map(|p| p.discount_percent)
        .unwrap_or(0)
        .clamp(0, 100);
    let discount_minor = base_price_minor * discount_percent as i64 / 100;
    let final_price_minor = (base_price_minor - discount_minor).max(0);

    PriceBreakdown {
        discount_percent,
        discount_minor,
        final_price_minor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn promo(discount_percent: i32) -> promotions::Model {
        promotions::Model {
            id: 1,
            name: "Test".to_string(),
            description: None,
            code: None,
            discount_percent,
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
    fn test_no_promotion_is_identity() {
        let quote = price(12_345, None);
        assert_eq!(quote.discount_percent, 0);
        assert_eq!(quote.discount_minor, 0);
        assert_eq!(quote.final_price_minor, 12_345);
    }

    #[test]
    fn test_discount_floors_not_rounds() {
        let quote = price(10_000, Some(&promo(33)));
        assert_eq!(quote.discount_minor, 3_300);
        assert_eq!(quote.final_price_minor, 6_700);

        let quote = price(100, Some(&promo(33)));
        assert_eq!(quote.discount_minor, 33);
        assert_eq!(quote.final_price_minor, 67);

        // 199 * 33 / 100 = 65.67 -> 65
        let quote = price(199, Some(&promo(33)));
        assert_eq!(quote.discount_minor, 65);
        assert_eq!(quote.final_price_minor, 134);
    }

    #[test]
    fn test_full_discount_is_free() {
        let quote = price(5_000, Some(&promo(100)));
        assert_eq!(quote.discount_minor, 5_000);
        assert_eq!(quote.final_price_minor, 0);
    }

    #[test]
    fn test_percent_is_clamped() {
        let quote = price(5_000, Some(&promo(150)));
        assert_eq!(quote.discount_percent, 100);
        assert_eq!(quote.final_price_minor, 0);

        let quote = price(5_000, Some(&promo(-5)));
        assert_eq!(quote.discount_percent, 0);
        assert_eq!(quote.final_price_minor, 5_000);
    }

    #[test]
    fn test_final_price_bounds() {
        for pct in 1..=100 {
            for base in [0i64, 1, 99, 100, 101, 99_999] {
                let quote = price(base, Some(&promo(pct)));
                assert!(quote.final_price_minor >= 0);
                assert!(quote.final_price_minor <= base);
                assert_eq!(quote.final_price_minor + quote.discount_minor, base);
            }
        }
    }

    #[test]
    fn test_launch_scenario() {
        // plan at 100,000 minor units with a 20% new-customer promotion
        let quote = price(100_000, Some(&promo(20)));
        assert_eq!(quote.discount_percent, 20);
        assert_eq!(quote.discount_minor, 20_000);
        assert_eq!(quote.final_price_minor, 80_000);
    }
}
