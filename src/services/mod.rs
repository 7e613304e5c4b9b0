pub mod auto_apply;
pub mod coupons;
pub mod discount;
pub mod usage;
pub mod validation;
