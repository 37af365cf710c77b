pub mod checkout;
pub mod plan;
pub mod promotion;

pub use checkout::checkout_config;
pub use plan::{admin_plan_config, plan_config};
pub use promotion::admin_promotion_config;
