pub mod coupon;

pub use coupon::{
    AbsorptionSplit, CartItem, DiscountRule, RejectionReason, ValidationContext, ValidationOutcome,
};
