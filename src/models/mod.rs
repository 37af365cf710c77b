pub mod checkout;
pub mod common;
pub mod pagination;
pub mod plan;
pub mod promotion;

pub use checkout::*;
pub use common::*;
pub use pagination::*;
pub use plan::*;
pub use promotion::*;
