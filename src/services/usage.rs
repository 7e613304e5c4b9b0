//! Usage accounting: the engine's only mutation path.
//!
//! Recording runs after the owning order is durably committed. The global
//! and per-customer limit guards are conditional UPDATEs inside one
//! transaction, so two checkouts racing on the last redemption cannot both
//! pass the limit, and a failed guard surfaces as a limit error rather than
//! silently skipping the accounting.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::coupon::{self, CommissionAbsorber},
    entities::{coupon_customer_usage, coupon_usage},
    errors::{CouponError, ServiceError},
    events::{Event, EventSender},
    models::AbsorptionSplit,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordUsageInput {
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub sub_order_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub discount_amount: Decimal,
    pub order_total: Decimal,
    /// Overrides the coupon's own commission absorber when present.
    pub absorbed_by: Option<CommissionAbsorber>,
}

/// Ledger aggregates for admin and vendor reporting.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponStats {
    pub coupon_id: Uuid,
    pub total_uses: u64,
    pub total_discount: Decimal,
    pub unique_customers: u64,
    pub average_order_value: Decimal,
    pub platform_absorbed: Decimal,
    pub vendor_absorbed: Decimal,
}

#[derive(Clone)]
pub struct UsageService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl UsageService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Records one redemption: ledger row, global counter, per-customer
    /// counter, all-or-nothing.
    #[instrument(skip(self, input), fields(order_id = %input.order_id))]
    pub async fn record_usage(
        &self,
        coupon_id: Uuid,
        input: RecordUsageInput,
    ) -> Result<coupon_usage::Model, ServiceError> {
        if input.discount_amount < Decimal::ZERO || input.discount_amount > input.order_total {
            return Err(ServiceError::InvalidInput(format!(
                "Discount amount {} must be between 0 and the order total {}",
                input.discount_amount, input.order_total
            )));
        }

        let coupon = coupon::Entity::find_by_id(coupon_id)
            .one(&*self.db)
            .await?
            .ok_or(CouponError::NotFound)?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        // Global limit guard and increment in one conditional UPDATE. Zero
        // rows affected means another checkout consumed the last redemption.
        let guard = coupon::Entity::update_many()
            .col_expr(
                coupon::Column::UsedCount,
                Expr::col((coupon::Entity, coupon::Column::UsedCount)).add(1),
            )
            .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
            .filter(coupon::Column::Id.eq(coupon_id))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(
                        Expr::col((coupon::Entity, coupon::Column::UsedCount))
                            .lt(Expr::col((coupon::Entity, coupon::Column::UsageLimit))),
                    ),
            )
            .exec(&txn)
            .await?;
        if guard.rows_affected == 0 {
            txn.rollback().await?;
            return Err(CouponError::LimitReached.into());
        }

        // Per-customer guard, same conditional-update shape against the
        // counter row. A missing row is created; the unique index on
        // (coupon_id, customer_id) turns a concurrent first use into a
        // detectable race instead of a double count.
        let per_user = coupon_customer_usage::Entity::update_many()
            .col_expr(
                coupon_customer_usage::Column::UsageCount,
                Expr::col((
                    coupon_customer_usage::Entity,
                    coupon_customer_usage::Column::UsageCount,
                ))
                .add(1),
            )
            .col_expr(coupon_customer_usage::Column::UpdatedAt, Expr::value(now))
            .filter(coupon_customer_usage::Column::CouponId.eq(coupon_id))
            .filter(coupon_customer_usage::Column::CustomerId.eq(input.customer_id))
            .filter(coupon_customer_usage::Column::UsageCount.lt(coupon.per_user_limit))
            .exec(&txn)
            .await?;

        if per_user.rows_affected == 0 {
            let existing = coupon_customer_usage::Entity::find()
                .filter(coupon_customer_usage::Column::CouponId.eq(coupon_id))
                .filter(coupon_customer_usage::Column::CustomerId.eq(input.customer_id))
                .one(&txn)
                .await?;
            if existing.is_some() {
                txn.rollback().await?;
                return Err(CouponError::PerUserLimitReached.into());
            }

            let first_use = coupon_customer_usage::ActiveModel {
                id: Set(Uuid::new_v4()),
                coupon_id: Set(coupon_id),
                customer_id: Set(input.customer_id),
                usage_count: Set(1),
                updated_at: Set(now),
            };
            if let Err(err) = first_use.insert(&txn).await {
                txn.rollback().await?;
                return Err(match err.sql_err() {
                    Some(SqlErr::UniqueConstraintViolation(_)) => {
                        CouponError::ConcurrentLimitRace.into()
                    }
                    _ => ServiceError::DatabaseError(err),
                });
            }
        }

        let absorber = input.absorbed_by.unwrap_or(coupon.commission_absorber);
        let split = AbsorptionSplit::compute(absorber, input.discount_amount);

        let usage = coupon_usage::ActiveModel {
            id: Set(Uuid::new_v4()),
            coupon_id: Set(coupon_id),
            coupon_code: Set(coupon.code.clone()),
            discount_type: Set(coupon.discount_type),
            customer_id: Set(input.customer_id),
            order_id: Set(input.order_id),
            sub_order_id: Set(input.sub_order_id),
            vendor_id: Set(input.vendor_id.or(coupon.vendor_id)),
            discount_amount: Set(input.discount_amount),
            order_total: Set(input.order_total),
            absorbed_by: Set(absorber),
            platform_absorption: Set(split.platform),
            vendor_absorption: Set(split.vendor),
            used_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;

        // The redemption is durable once the transaction commits; a failed
        // event publish is logged, not surfaced, or a retry would double
        // count.
        if let Err(err) = self
            .event_sender
            .send(Event::CouponRedeemed {
                coupon_id,
                customer_id: input.customer_id,
                order_id: input.order_id,
                discount_amount: input.discount_amount,
            })
            .await
        {
            warn!(%coupon_id, "failed to publish redemption event: {}", err);
        }

        Ok(usage)
    }

    /// Redemption history for a coupon, newest first.
    pub async fn list_usages(
        &self,
        coupon_id: Uuid,
    ) -> Result<Vec<coupon_usage::Model>, ServiceError> {
        let rows = coupon_usage::Entity::find()
            .filter(coupon_usage::Column::CouponId.eq(coupon_id))
            .order_by_desc(coupon_usage::Column::UsedAt)
            .all(&*self.db)
            .await?;
        Ok(rows)
    }

    /// Aggregates over the ledger for reporting.
    #[instrument(skip(self))]
    pub async fn usage_stats(&self, coupon_id: Uuid) -> Result<CouponStats, ServiceError> {
        let rows = self.list_usages(coupon_id).await?;

        let total_uses = rows.len() as u64;
        let mut total_discount = Decimal::ZERO;
        let mut total_order_value = Decimal::ZERO;
        let mut platform_absorbed = Decimal::ZERO;
        let mut vendor_absorbed = Decimal::ZERO;
        let mut customers: HashSet<Uuid> = HashSet::new();

        for row in &rows {
            total_discount += row.discount_amount;
            total_order_value += row.order_total;
            platform_absorbed += row.platform_absorption;
            vendor_absorbed += row.vendor_absorption;
            customers.insert(row.customer_id);
        }

        let average_order_value = if total_uses > 0 {
            (total_order_value / Decimal::from(total_uses)).round_dp(2)
        } else {
            Decimal::ZERO
        };

        Ok(CouponStats {
            coupon_id,
            total_uses,
            total_discount,
            unique_customers: customers.len() as u64,
            average_order_value,
            platform_absorbed,
            vendor_absorbed,
        })
    }
}
