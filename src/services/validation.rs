//! Pure admission rules for a coupon against a proposed order.
//!
//! Checks run in a fixed order and the first failure wins, so an inactive and
//! expired coupon always reports "not active". The function has no side
//! effects; the clock is an explicit parameter so callers and tests pin it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::entities::coupon::{self, CouponScope};
use crate::models::{RejectionReason, ValidationContext, ValidationOutcome};

/// Decides whether `coupon` may be applied to the proposed order.
///
/// `prior_user_usage` is the customer's existing redemption count for this
/// coupon, or `None` when no customer is identified (guest validation skips
/// the per-user check).
pub fn validate(
    coupon: &coupon::Model,
    prior_user_usage: Option<i32>,
    cart_total: Decimal,
    ctx: &ValidationContext,
    now: DateTime<Utc>,
) -> ValidationOutcome {
    if !coupon.is_active {
        return ValidationOutcome::reject(RejectionReason::Inactive);
    }

    if now < coupon.starts_at {
        return ValidationOutcome::reject(RejectionReason::NotYetStarted);
    }

    if now >= coupon.expires_at {
        return ValidationOutcome::reject(RejectionReason::Expired);
    }

    if !coupon.has_remaining_uses() {
        return ValidationOutcome::reject(RejectionReason::UsageLimitReached);
    }

    if cart_total < coupon.min_purchase {
        return ValidationOutcome::reject(RejectionReason::BelowMinimumPurchase {
            shortfall: coupon.min_purchase - cart_total,
        });
    }

    if let Some(prior) = prior_user_usage {
        if prior >= coupon.per_user_limit {
            return ValidationOutcome::reject(RejectionReason::PerUserLimitReached);
        }
    }

    if coupon.first_order_only && !ctx.is_first_order {
        return ValidationOutcome::reject(RejectionReason::FirstOrderOnly);
    }

    if !coupon.customer_groups.is_empty() {
        let in_group = ctx
            .customer_group
            .as_deref()
            .map(|group| coupon.customer_groups.contains(group))
            .unwrap_or(false);
        if !in_group {
            return ValidationOutcome::reject(RejectionReason::CustomerGroupMismatch);
        }
    }

    if coupon.min_items > 0 && (ctx.total_units() as i64) < coupon.min_items as i64 {
        return ValidationOutcome::reject(RejectionReason::NotEnoughItems {
            required: coupon.min_items,
        });
    }

    if coupon.scope == CouponScope::Category {
        let matches = ctx.cart_items.iter().any(|item| {
            item.category_id
                .map(|category| coupon.applicable_categories.contains(&category))
                .unwrap_or(false)
        });
        if !matches {
            return ValidationOutcome::reject(RejectionReason::NoMatchingCategory);
        }
    }

    if coupon.scope == CouponScope::Product {
        let matches = ctx
            .cart_items
            .iter()
            .any(|item| coupon.applicable_products.contains(&item.product_id));
        if !matches {
            return ValidationOutcome::reject(RejectionReason::NoMatchingProduct);
        }
    }

    ValidationOutcome::admit()
}
