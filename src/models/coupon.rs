use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::entities::coupon::CommissionAbsorber;

/// Tagged discount rule. The flat coupon row is projected into this enum so
/// the calculator is an exhaustive match and no invalid combination of
/// optional columns is representable past that point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountRule {
    Percentage {
        percent: Decimal,
        max_discount: Option<Decimal>,
    },
    Fixed {
        amount: Decimal,
    },
    FreeShipping,
    BuyXGetY {
        buy_quantity: u32,
        get_quantity: u32,
        get_discount_percent: Decimal,
    },
}

/// One cart line as seen by the engine. Catalog identifiers are resolved by
/// the external catalog service before the engine is called.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema, Validate)]
pub struct CartItem {
    pub product_id: Uuid,
    pub category_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub unit_price: Decimal,
    #[validate(range(min = 1))]
    pub quantity: u32,
}

impl CartItem {
    pub fn line_subtotal(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Order-side facts the validation engine and calculator need, supplied by
/// the checkout orchestrator and the customer history service.
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ValidationContext {
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub is_first_order: bool,
    #[serde(default)]
    pub customer_group: Option<String>,
    #[serde(default)]
    pub shipping_cost: Decimal,
}

impl ValidationContext {
    pub fn total_units(&self) -> u32 {
        self.cart_items.iter().map(|item| item.quantity).sum()
    }
}

/// Why a coupon was rejected. Rejections travel as data, not errors; the
/// checkout decides whether to proceed without the discount.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    Inactive,
    NotYetStarted,
    Expired,
    UsageLimitReached,
    BelowMinimumPurchase { shortfall: Decimal },
    PerUserLimitReached,
    FirstOrderOnly,
    CustomerGroupMismatch,
    NotEnoughItems { required: i32 },
    NoMatchingCategory,
    NoMatchingProduct,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inactive => write!(f, "This coupon is not active"),
            Self::NotYetStarted => write!(f, "This coupon is not active yet"),
            Self::Expired => write!(f, "This coupon has expired"),
            Self::UsageLimitReached => write!(f, "This coupon has reached its usage limit"),
            Self::BelowMinimumPurchase { shortfall } => {
                write!(f, "Add {} more to your order to use this coupon", shortfall)
            }
            Self::PerUserLimitReached => {
                write!(f, "You have already used this coupon the maximum number of times")
            }
            Self::FirstOrderOnly => write!(f, "This coupon is only valid on your first order"),
            Self::CustomerGroupMismatch => {
                write!(f, "This coupon is not available for your account")
            }
            Self::NotEnoughItems { required } => {
                write!(f, "This coupon requires at least {} items in your cart", required)
            }
            Self::NoMatchingCategory => {
                write!(f, "No items in your cart are eligible for this coupon")
            }
            Self::NoMatchingProduct => {
                write!(f, "No items in your cart are eligible for this coupon")
            }
        }
    }
}

/// Result of running a coupon through the validation engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationOutcome {
    pub fn admit() -> Self {
        Self {
            valid: true,
            reason: None,
            message: None,
        }
    }

    pub fn reject(reason: RejectionReason) -> Self {
        let message = reason.to_string();
        Self {
            valid: false,
            reason: Some(reason),
            message: Some(message),
        }
    }
}

/// How a discount's cost is divided between the platform and the vendor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AbsorptionSplit {
    pub platform: Decimal,
    pub vendor: Decimal,
}

impl AbsorptionSplit {
    /// Splits `amount` according to the absorber. For `Split` the platform
    /// takes the rounding remainder so the parts always sum exactly.
    pub fn compute(absorber: CommissionAbsorber, amount: Decimal) -> Self {
        match absorber {
            CommissionAbsorber::Platform => Self {
                platform: amount,
                vendor: Decimal::ZERO,
            },
            CommissionAbsorber::Vendor => Self {
                platform: Decimal::ZERO,
                vendor: amount,
            },
            CommissionAbsorber::Split => {
                let vendor = (amount / Decimal::from(2)).round_dp(2);
                Self {
                    platform: amount - vendor,
                    vendor,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn split_absorption_sums_exactly() {
        let split = AbsorptionSplit::compute(CommissionAbsorber::Split, dec!(10.01));
        assert_eq!(split.platform + split.vendor, dec!(10.01));
    }

    #[test]
    fn platform_absorber_takes_everything() {
        let split = AbsorptionSplit::compute(CommissionAbsorber::Platform, dec!(7.50));
        assert_eq!(split.platform, dec!(7.50));
        assert_eq!(split.vendor, Decimal::ZERO);
    }
}
