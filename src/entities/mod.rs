pub mod checkout_intents;
pub mod payments;
pub mod plans;
pub mod promotion_plans;
pub mod promotion_redemptions;
pub mod promotions;
pub mod subscriptions;

pub use checkout_intents as checkout_intent_entity;
pub use payments as payment_entity;
pub use plans as plan_entity;
pub use promotion_plans as promotion_plan_entity;
pub use promotion_redemptions as promotion_redemption_entity;
pub use promotions as promotion_entity;
pub use subscriptions as subscription_entity;

pub use checkout_intents::CheckoutIntentStatus;
pub use payments::PaymentStatus;
pub use subscriptions::SubscriptionStatus;
