//! Pure discount math. Called only after validation admits the coupon.
//!
//! Output invariant, enforced unconditionally at the end:
//! `0 <= amount <= total` for every discount type.

use rust_decimal::Decimal;

use crate::entities::coupon::{self, CouponScope};
use crate::errors::ServiceError;
use crate::models::{DiscountRule, ValidationContext};

/// Computes the monetary discount an admitted coupon is worth on this order.
pub fn calculate_discount(
    coupon: &coupon::Model,
    total: Decimal,
    ctx: &ValidationContext,
) -> Result<Decimal, ServiceError> {
    let amount = match coupon.discount_rule()? {
        DiscountRule::Percentage {
            percent,
            max_discount,
        } => {
            let base = applicable_base(coupon, total, ctx);
            let raw = base * percent / Decimal::from(100);
            match max_discount {
                Some(cap) => raw.min(cap),
                None => raw,
            }
        }
        DiscountRule::Fixed { amount } => amount,
        DiscountRule::FreeShipping => ctx.shipping_cost,
        DiscountRule::BuyXGetY {
            buy_quantity,
            get_quantity,
            get_discount_percent,
        } => buy_x_get_y_discount(ctx, buy_quantity, get_quantity, get_discount_percent),
    };

    Ok(amount.min(total).max(Decimal::ZERO))
}

/// The sum the percentage applies to: the whole order for platform/vendor
/// scope, only the matching lines for category/product scope.
fn applicable_base(coupon: &coupon::Model, total: Decimal, ctx: &ValidationContext) -> Decimal {
    match coupon.scope {
        CouponScope::Platform | CouponScope::Vendor => total,
        CouponScope::Category => ctx
            .cart_items
            .iter()
            .filter(|item| {
                item.category_id
                    .map(|category| coupon.applicable_categories.contains(&category))
                    .unwrap_or(false)
            })
            .map(|item| item.line_subtotal())
            .sum(),
        CouponScope::Product => ctx
            .cart_items
            .iter()
            .filter(|item| coupon.applicable_products.contains(&item.product_id))
            .map(|item| item.line_subtotal())
            .sum(),
    }
}

/// Expands the cart into one entry per unit, then discounts the cheapest
/// `sets * get_quantity` units. Prices are sorted ascending so the result is
/// deterministic for a given cart.
fn buy_x_get_y_discount(
    ctx: &ValidationContext,
    buy_quantity: u32,
    get_quantity: u32,
    get_discount_percent: Decimal,
) -> Decimal {
    let set_size = buy_quantity + get_quantity;
    if set_size == 0 || get_quantity == 0 {
        return Decimal::ZERO;
    }

    let mut unit_prices: Vec<Decimal> = ctx
        .cart_items
        .iter()
        .flat_map(|item| std::iter::repeat(item.unit_price).take(item.quantity as usize))
        .collect();

    let eligible_sets = unit_prices.len() as u32 / set_size;
    if eligible_sets == 0 {
        return Decimal::ZERO;
    }

    unit_prices.sort();
    let discounted_units = (eligible_sets * get_quantity) as usize;
    let discounted_sum: Decimal = unit_prices.iter().take(discounted_units).copied().sum();

    discounted_sum * get_discount_percent / Decimal::from(100)
}
