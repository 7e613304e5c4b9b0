#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use coupon_engine_api::entities::coupon::{
    self, CommissionAbsorber, CouponScope, DiscountType, GroupSet, IdSet,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A platform-wide percentage coupon valid around `now`, to be adjusted per
/// test.
pub fn coupon_fixture(now: DateTime<Utc>) -> coupon::Model {
    coupon::Model {
        id: Uuid::new_v4(),
        code: "SAVE10".to_string(),
        description: None,
        discount_type: DiscountType::Percentage,
        value: Decimal::from(10),
        scope: CouponScope::Platform,
        applicable_categories: IdSet::default(),
        applicable_products: IdSet::default(),
        min_purchase: Decimal::ZERO,
        max_discount: None,
        min_items: 0,
        starts_at: now - Duration::days(1),
        expires_at: now + Duration::days(30),
        usage_limit: None,
        used_count: 0,
        per_user_limit: 1,
        vendor_id: None,
        stackable: false,
        auto_apply: false,
        commission_absorber: CommissionAbsorber::Platform,
        buy_quantity: None,
        get_quantity: None,
        get_discount_percent: None,
        first_order_only: false,
        customer_groups: GroupSet::default(),
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}

/// Fresh migrated database plus a drained event channel for DB-backed tests.
pub async fn test_state() -> (
    std::sync::Arc<sea_orm::DatabaseConnection>,
    std::sync::Arc<coupon_engine_api::events::EventSender>,
) {
    let path = std::env::temp_dir().join(format!("coupon_engine_test_{}.db", Uuid::new_v4()));
    let url = format!("sqlite://{}?mode=rwc", path.display());

    let pool = coupon_engine_api::db::establish_connection(&url)
        .await
        .expect("db connect");
    coupon_engine_api::db::run_migrations(&pool)
        .await
        .expect("migrations");

    let (tx, rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(coupon_engine_api::events::process_events(rx));

    (
        std::sync::Arc::new(pool),
        std::sync::Arc::new(coupon_engine_api::events::EventSender::new(tx)),
    )
}

/// A single cart line with quantity 1.
pub fn unit_item(unit_price: Decimal) -> coupon_engine_api::models::CartItem {
    coupon_engine_api::models::CartItem {
        product_id: Uuid::new_v4(),
        category_id: None,
        vendor_id: None,
        unit_price,
        quantity: 1,
    }
}
