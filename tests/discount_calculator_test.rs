mod common;

use chrono::Utc;
use common::{coupon_fixture, unit_item};
use coupon_engine_api::entities::coupon::{CouponScope, DiscountType, IdSet};
use coupon_engine_api::models::ValidationContext;
use coupon_engine_api::services::discount::calculate_discount;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

#[test]
fn save10_scenario_raw_30_clamped_to_cap_20() {
    // SAVE10: percentage, value=10, minPurchase=50, maxDiscount=20.
    let mut coupon = coupon_fixture(Utc::now());
    coupon.value = dec!(10);
    coupon.min_purchase = dec!(50);
    coupon.max_discount = Some(dec!(20));

    let amount =
        calculate_discount(&coupon, dec!(300), &ValidationContext::default()).unwrap();
    assert_eq!(amount, dec!(20));
}

#[test]
fn percentage_without_cap_is_proportional() {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.value = dec!(25);

    let amount =
        calculate_discount(&coupon, dec!(200), &ValidationContext::default()).unwrap();
    assert_eq!(amount, dec!(50));
}

#[test]
fn category_scoped_percentage_uses_matching_lines_as_base() {
    let category = Uuid::new_v4();
    let mut coupon = coupon_fixture(Utc::now());
    coupon.value = dec!(10);
    coupon.scope = CouponScope::Category;
    coupon.applicable_categories = IdSet(vec![category]);

    let mut in_scope = unit_item(dec!(80));
    in_scope.category_id = Some(category);
    let mut off_scope = unit_item(dec!(120));
    off_scope.category_id = Some(Uuid::new_v4());

    let ctx = ValidationContext {
        cart_items: vec![in_scope, off_scope],
        ..ValidationContext::default()
    };

    // 10% of the 80 in-scope line, not of the 200 total.
    let amount = calculate_discount(&coupon, dec!(200), &ctx).unwrap();
    assert_eq!(amount, dec!(8));
}

#[test]
fn product_scoped_percentage_uses_matching_lines_as_base() {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.value = dec!(50);
    coupon.scope = CouponScope::Product;

    let mut in_scope = unit_item(dec!(40));
    in_scope.quantity = 2;
    coupon.applicable_products = IdSet(vec![in_scope.product_id]);

    let ctx = ValidationContext {
        cart_items: vec![in_scope, unit_item(dec!(100))],
        ..ValidationContext::default()
    };

    let amount = calculate_discount(&coupon, dec!(180), &ctx).unwrap();
    assert_eq!(amount, dec!(40));
}

#[test]
fn fixed_discount_clamps_to_order_total() {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.discount_type = DiscountType::Fixed;
    coupon.value = dec!(50);

    let amount = calculate_discount(&coupon, dec!(20), &ValidationContext::default()).unwrap();
    assert_eq!(amount, dec!(20));
}

#[test]
fn free_shipping_is_worth_the_shipping_cost() {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.discount_type = DiscountType::FreeShipping;
    coupon.value = Decimal::ZERO;

    let ctx = ValidationContext {
        shipping_cost: dec!(12.99),
        ..ValidationContext::default()
    };
    assert_eq!(calculate_discount(&coupon, dec!(100), &ctx).unwrap(), dec!(12.99));

    // No shipping cost supplied means nothing to discount.
    assert_eq!(
        calculate_discount(&coupon, dec!(100), &ValidationContext::default()).unwrap(),
        Decimal::ZERO
    );
}

fn bogo_coupon(buy: i32, get: i32, pct: Decimal) -> coupon_engine_api::entities::coupon::Model {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.discount_type = DiscountType::BuyXGetY;
    coupon.value = Decimal::ZERO;
    coupon.buy_quantity = Some(buy);
    coupon.get_quantity = Some(get);
    coupon.get_discount_percent = Some(pct);
    coupon
}

#[test]
fn bogo_gives_the_cheapest_unit_free() {
    let coupon = bogo_coupon(1, 1, dec!(100));
    let ctx = ValidationContext {
        cart_items: vec![unit_item(dec!(100)), unit_item(dec!(20))],
        ..ValidationContext::default()
    };
    assert_eq!(calculate_discount(&coupon, dec!(120), &ctx).unwrap(), dec!(20));
}

#[test]
fn bogo_discounts_cheapest_units_across_full_sets() {
    let coupon = bogo_coupon(1, 1, dec!(100));
    let ctx = ValidationContext {
        cart_items: vec![
            unit_item(dec!(100)),
            unit_item(dec!(50)),
            unit_item(dec!(30)),
            unit_item(dec!(20)),
        ],
        ..ValidationContext::default()
    };
    // Two full buy-1-get-1 sets over four units: the two cheapest units
    // (20 and 30) are free.
    assert_eq!(calculate_discount(&coupon, dec!(200), &ctx).unwrap(), dec!(50));
}

#[test]
fn bogo_with_partial_discount_percent() {
    let coupon = bogo_coupon(2, 1, dec!(50));
    let mut item = unit_item(dec!(30));
    item.quantity = 3;
    let ctx = ValidationContext {
        cart_items: vec![item],
        ..ValidationContext::default()
    };
    // One set of three units, cheapest unit half off.
    assert_eq!(calculate_discount(&coupon, dec!(90), &ctx).unwrap(), dec!(15));
}

#[test]
fn bogo_without_a_full_set_gives_nothing() {
    let coupon = bogo_coupon(3, 1, dec!(100));
    let ctx = ValidationContext {
        cart_items: vec![
            unit_item(dec!(10)),
            unit_item(dec!(10)),
            unit_item(dec!(10)),
        ],
        ..ValidationContext::default()
    };
    assert_eq!(
        calculate_discount(&coupon, dec!(30), &ctx).unwrap(),
        Decimal::ZERO
    );
}

#[test]
fn calculation_is_idempotent() {
    let mut coupon = coupon_fixture(Utc::now());
    coupon.value = dec!(15);
    let ctx = ValidationContext::default();

    let first = calculate_discount(&coupon, dec!(75), &ctx).unwrap();
    let second = calculate_discount(&coupon, dec!(75), &ctx).unwrap();
    assert_eq!(first, second);
}
