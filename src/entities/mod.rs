pub mod coupon;
pub mod coupon_customer_usage;
pub mod coupon_usage;

pub use coupon::Entity as Coupon;
pub use coupon_customer_usage::Entity as CouponCustomerUsage;
pub use coupon_usage::Entity as CouponUsage;
