//! Codeless promotion selection.
//!
//! `find_candidates` is a set-membership query against the catalog, not
//! validation: every candidate must still go through the validation engine
//! before being offered, which `eligible_coupons` does per coupon. Whether
//! multiple valid coupons are combined is the checkout's decision, driven by
//! each coupon's `stackable` flag.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::coupon,
    errors::ServiceError,
    models::ValidationContext,
    services::{coupons::CouponService, validation},
};

#[derive(Clone)]
pub struct AutoApplyService {
    db: Arc<DatabaseConnection>,
    coupons: Arc<CouponService>,
}

impl AutoApplyService {
    pub fn new(db: Arc<DatabaseConnection>, coupons: Arc<CouponService>) -> Self {
        Self { db, coupons }
    }

    /// Catalog query for auto-apply candidates: active, inside the window,
    /// usage not exhausted, minimum purchase satisfied, and either
    /// platform-wide or owned by the supplied vendor. Ordered by face value
    /// descending as a presentation priority, not a cap.
    #[instrument(skip(self))]
    pub async fn find_candidates(
        &self,
        vendor_id: Option<Uuid>,
        cart_total: Decimal,
    ) -> Result<Vec<coupon::Model>, ServiceError> {
        let now = Utc::now();

        let mut scope_condition = Condition::any().add(coupon::Column::VendorId.is_null());
        if let Some(vendor) = vendor_id {
            scope_condition = scope_condition.add(coupon::Column::VendorId.eq(vendor));
        }

        let candidates = coupon::Entity::find()
            .filter(coupon::Column::IsActive.eq(true))
            .filter(coupon::Column::AutoApply.eq(true))
            .filter(coupon::Column::StartsAt.lte(now))
            .filter(coupon::Column::ExpiresAt.gt(now))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(
                        Expr::col((coupon::Entity, coupon::Column::UsedCount))
                            .lt(Expr::col((coupon::Entity, coupon::Column::UsageLimit))),
                    ),
            )
            .filter(coupon::Column::MinPurchase.lte(cart_total))
            .filter(scope_condition)
            .order_by_desc(coupon::Column::Value)
            .all(&*self.db)
            .await?;

        Ok(candidates)
    }

    /// Candidates filtered through the full validation engine for a specific
    /// customer and cart. Query membership does not imply validity (per-user
    /// limit, first-order-only, scope intersection all still apply).
    #[instrument(skip(self, ctx))]
    pub async fn eligible_coupons(
        &self,
        vendor_id: Option<Uuid>,
        customer_id: Option<Uuid>,
        cart_total: Decimal,
        ctx: &ValidationContext,
    ) -> Result<Vec<coupon::Model>, ServiceError> {
        let now = Utc::now();
        let mut eligible = Vec::new();

        for candidate in self.find_candidates(vendor_id, cart_total).await? {
            let prior = match customer_id {
                Some(customer) => Some(self.coupons.prior_usage(candidate.id, customer).await?),
                None => None,
            };
            let outcome = validation::validate(&candidate, prior, cart_total, ctx, now);
            if outcome.valid {
                eligible.push(candidate);
            }
        }

        Ok(eligible)
    }
}
