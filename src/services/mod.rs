pub mod checkout_service;
pub mod customer_history_service;
pub mod plan_service;
pub mod pricing;
pub mod promotion_service;

pub use checkout_service::*;
pub use customer_history_service::*;
pub use plan_service::*;
pub use promotion_service::*;
