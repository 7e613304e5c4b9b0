mod common;

use chrono::{Duration, Utc};
use common::{coupon_fixture, unit_item};
use coupon_engine_api::entities::coupon::{CouponScope, GroupSet, IdSet};
use coupon_engine_api::models::{RejectionReason, ValidationContext};
use coupon_engine_api::services::validation::validate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn ctx() -> ValidationContext {
    ValidationContext::default()
}

#[test]
fn admits_a_plain_active_coupon() {
    let now = Utc::now();
    let coupon = coupon_fixture(now);
    let outcome = validate(&coupon, None, dec!(100), &ctx(), now);
    assert!(outcome.valid);
    assert_eq!(outcome.reason, None);
}

#[test]
fn first_failing_check_wins() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    // Inactive, expired, over limit, and below minimum all at once: the
    // fixed check order must report inactive.
    coupon.is_active = false;
    coupon.expires_at = now - Duration::days(1);
    coupon.starts_at = now - Duration::days(2);
    coupon.usage_limit = Some(1);
    coupon.used_count = 1;
    coupon.min_purchase = dec!(1000);

    let outcome = validate(&coupon, None, dec!(10), &ctx(), now);
    assert_eq!(outcome.reason, Some(RejectionReason::Inactive));
}

#[test]
fn not_yet_started_before_window() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.starts_at = now + Duration::days(1);
    coupon.expires_at = now + Duration::days(10);

    let outcome = validate(&coupon, None, dec!(100), &ctx(), now);
    assert_eq!(outcome.reason, Some(RejectionReason::NotYetStarted));
}

#[test]
fn expired_yesterday_reports_expired_regardless_of_other_fields() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.expires_at = now - Duration::days(1);
    coupon.starts_at = now - Duration::days(10);
    coupon.usage_limit = Some(100);
    coupon.min_purchase = dec!(5);

    let outcome = validate(&coupon, None, dec!(100), &ctx(), now);
    assert_eq!(outcome.reason, Some(RejectionReason::Expired));
}

#[test]
fn exhausted_global_limit_is_rejected() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.usage_limit = Some(5);
    coupon.used_count = 5;

    let outcome = validate(&coupon, None, dec!(100), &ctx(), now);
    assert_eq!(outcome.reason, Some(RejectionReason::UsageLimitReached));
}

#[test]
fn minimum_purchase_reports_the_shortfall() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.min_purchase = dec!(50);

    let outcome = validate(&coupon, None, dec!(42.50), &ctx(), now);
    assert_eq!(
        outcome.reason,
        Some(RejectionReason::BelowMinimumPurchase {
            shortfall: dec!(7.50)
        })
    );
    let message = outcome.message.expect("rejections carry a message");
    assert!(message.contains("7.50"));
}

#[test]
fn per_user_limit_applies_only_with_a_known_customer() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.per_user_limit = 1;

    let rejected = validate(&coupon, Some(1), dec!(100), &ctx(), now);
    assert_eq!(rejected.reason, Some(RejectionReason::PerUserLimitReached));

    let guest = validate(&coupon, None, dec!(100), &ctx(), now);
    assert!(guest.valid);
}

#[test]
fn first_order_only_rejects_repeat_customers() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.first_order_only = true;

    let outcome = validate(&coupon, None, dec!(100), &ctx(), now);
    assert_eq!(outcome.reason, Some(RejectionReason::FirstOrderOnly));

    let first_order = ValidationContext {
        is_first_order: true,
        ..ValidationContext::default()
    };
    assert!(validate(&coupon, None, dec!(100), &first_order, now).valid);
}

#[test]
fn customer_group_must_match_when_restricted() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.customer_groups = GroupSet(vec!["wholesale".to_string()]);

    let retail = ValidationContext {
        customer_group: Some("retail".to_string()),
        ..ValidationContext::default()
    };
    let outcome = validate(&coupon, None, dec!(100), &retail, now);
    assert_eq!(outcome.reason, Some(RejectionReason::CustomerGroupMismatch));

    let wholesale = ValidationContext {
        customer_group: Some("wholesale".to_string()),
        ..ValidationContext::default()
    };
    assert!(validate(&coupon, None, dec!(100), &wholesale, now).valid);
}

#[test]
fn min_items_counts_quantities_not_lines() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.min_items = 3;

    let mut item = unit_item(dec!(10));
    item.quantity = 2;
    let two_units = ValidationContext {
        cart_items: vec![item.clone()],
        ..ValidationContext::default()
    };
    let outcome = validate(&coupon, None, dec!(100), &two_units, now);
    assert_eq!(
        outcome.reason,
        Some(RejectionReason::NotEnoughItems { required: 3 })
    );

    item.quantity = 3;
    let three_units = ValidationContext {
        cart_items: vec![item],
        ..ValidationContext::default()
    };
    assert!(validate(&coupon, None, dec!(100), &three_units, now).valid);
}

#[test]
fn category_scope_requires_an_intersecting_line() {
    let now = Utc::now();
    let in_scope = Uuid::new_v4();
    let mut coupon = coupon_fixture(now);
    coupon.scope = CouponScope::Category;
    coupon.applicable_categories = IdSet(vec![in_scope]);

    let mut off_scope_item = unit_item(dec!(10));
    off_scope_item.category_id = Some(Uuid::new_v4());
    let miss = ValidationContext {
        cart_items: vec![off_scope_item],
        ..ValidationContext::default()
    };
    let outcome = validate(&coupon, None, dec!(100), &miss, now);
    assert_eq!(outcome.reason, Some(RejectionReason::NoMatchingCategory));

    let mut matching_item = unit_item(dec!(10));
    matching_item.category_id = Some(in_scope);
    let hit = ValidationContext {
        cart_items: vec![matching_item],
        ..ValidationContext::default()
    };
    assert!(validate(&coupon, None, dec!(100), &hit, now).valid);
}

#[test]
fn product_scope_requires_an_intersecting_line() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    let item = unit_item(dec!(10));
    coupon.scope = CouponScope::Product;
    coupon.applicable_products = IdSet(vec![Uuid::new_v4()]);

    let miss = ValidationContext {
        cart_items: vec![item.clone()],
        ..ValidationContext::default()
    };
    let outcome = validate(&coupon, None, dec!(100), &miss, now);
    assert_eq!(outcome.reason, Some(RejectionReason::NoMatchingProduct));

    coupon.applicable_products = IdSet(vec![item.product_id]);
    let hit = ValidationContext {
        cart_items: vec![item],
        ..ValidationContext::default()
    };
    assert!(validate(&coupon, None, dec!(100), &hit, now).valid);
}

#[test]
fn validation_is_idempotent() {
    let now = Utc::now();
    let mut coupon = coupon_fixture(now);
    coupon.min_purchase = dec!(50);
    let context = ctx();

    let first = validate(&coupon, None, dec!(30), &context, now);
    let second = validate(&coupon, None, dec!(30), &context, now);
    assert_eq!(first, second);

    let total = Decimal::from(100);
    let first_ok = validate(&coupon, None, total, &context, now);
    let second_ok = validate(&coupon, None, total, &context, now);
    assert_eq!(first_ok, second_ok);
}
