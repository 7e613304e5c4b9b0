//! Coupon catalog: creation, lookup, mutation, and the checkout-facing
//! validate/apply entry points.
//!
//! Creation enforces the ownership invariant (a vendor-owned coupon is forced
//! to vendor scope with the vendor absorbing the discount) and the definition
//! invariants per discount type. Deletion is refused once a coupon has been
//! used; deactivation is the sanctioned off-switch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::coupon::{self, CommissionAbsorber, CouponScope, DiscountType, GroupSet, IdSet},
    entities::coupon_customer_usage,
    errors::{CouponError, ServiceError},
    events::{Event, EventSender},
    models::{ValidationContext, ValidationOutcome},
    services::{discount, validation},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct BuyXGetYConfig {
    #[validate(range(min = 1))]
    pub buy_quantity: i32,
    #[validate(range(min = 1))]
    pub get_quantity: i32,
    pub get_discount_percent: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateCouponInput {
    #[validate(length(min = 3, max = 32))]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default = "default_scope")]
    pub scope: CouponScope,
    #[serde(default)]
    pub applicable_categories: Vec<Uuid>,
    #[serde(default)]
    pub applicable_products: Vec<Uuid>,
    #[serde(default)]
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub min_items: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub usage_limit: Option<i32>,
    #[serde(default = "default_per_user_limit")]
    pub per_user_limit: i32,
    pub vendor_id: Option<Uuid>,
    #[serde(default)]
    pub stackable: bool,
    #[serde(default)]
    pub auto_apply: bool,
    #[serde(default = "default_absorber")]
    pub commission_absorber: CommissionAbsorber,
    #[validate]
    pub buy_x_get_y: Option<BuyXGetYConfig>,
    #[serde(default)]
    pub first_order_only: bool,
    #[serde(default)]
    pub customer_groups: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_scope() -> CouponScope {
    CouponScope::Platform
}

fn default_absorber() -> CommissionAbsorber {
    CommissionAbsorber::Platform
}

fn default_per_user_limit() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCouponInput {
    pub code: Option<String>,
    pub description: Option<String>,
    pub value: Option<Decimal>,
    pub applicable_categories: Option<Vec<Uuid>>,
    pub applicable_products: Option<Vec<Uuid>>,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub min_items: Option<i32>,
    pub starts_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub usage_limit: Option<Option<i32>>,
    pub per_user_limit: Option<i32>,
    pub stackable: Option<bool>,
    pub auto_apply: Option<bool>,
    pub first_order_only: Option<bool>,
    pub customer_groups: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ListCouponsFilter {
    pub vendor_id: Option<Uuid>,
    pub active: Option<bool>,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for ListCouponsFilter {
    fn default() -> Self {
        Self {
            vendor_id: None,
            active: None,
            page: default_page(),
            limit: default_limit(),
        }
    }
}

fn default_page() -> u64 {
    1
}

fn default_limit() -> u64 {
    20
}

/// Outcome of validate-and-calculate, the checkout-facing dry run.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedCoupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub stackable: bool,
    pub outcome: ValidationOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<Decimal>,
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CouponService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Creates a coupon. When `acting_vendor` is present the ownership
    /// invariant overrides whatever the payload asked for.
    #[instrument(skip(self, input))]
    pub async fn create_coupon(
        &self,
        input: CreateCouponInput,
        acting_vendor: Option<Uuid>,
    ) -> Result<coupon::Model, ServiceError> {
        input.validate()?;

        let code = normalize_code(&input.code);
        let vendor_id = acting_vendor.or(input.vendor_id);
        let (scope, absorber) = if vendor_id.is_some() {
            (CouponScope::Vendor, CommissionAbsorber::Vendor)
        } else {
            (input.scope, input.commission_absorber)
        };

        validate_definition(
            input.discount_type,
            input.value,
            input.starts_at,
            input.expires_at,
            input.usage_limit,
            input.per_user_limit,
            input.buy_x_get_y.as_ref(),
        )?;

        let existing = coupon::Entity::find()
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Coupon code {} already exists",
                code
            )));
        }

        let now = Utc::now();
        let model = coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            description: Set(input.description),
            discount_type: Set(input.discount_type),
            value: Set(input.value),
            scope: Set(scope),
            applicable_categories: Set(IdSet(input.applicable_categories)),
            applicable_products: Set(IdSet(input.applicable_products)),
            min_purchase: Set(input.min_purchase),
            max_discount: Set(input.max_discount),
            min_items: Set(input.min_items),
            starts_at: Set(input.starts_at),
            expires_at: Set(input.expires_at),
            usage_limit: Set(input.usage_limit),
            used_count: Set(0),
            per_user_limit: Set(input.per_user_limit),
            vendor_id: Set(vendor_id),
            stackable: Set(input.stackable),
            auto_apply: Set(input.auto_apply),
            commission_absorber: Set(absorber),
            buy_quantity: Set(input.buy_x_get_y.as_ref().map(|b| b.buy_quantity)),
            get_quantity: Set(input.buy_x_get_y.as_ref().map(|b| b.get_quantity)),
            get_discount_percent: Set(input.buy_x_get_y.as_ref().map(|b| b.get_discount_percent)),
            first_order_only: Set(input.first_order_only),
            customer_groups: Set(GroupSet(input.customer_groups)),
            is_active: Set(input.is_active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let created = model.insert(&*self.db).await?;
        info!(coupon_id = %created.id, code = %created.code, "coupon created");

        self.event_sender
            .send(Event::CouponCreated(created.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(created)
    }

    pub async fn get_coupon(&self, id: Uuid) -> Result<coupon::Model, ServiceError> {
        coupon::Entity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| CouponError::NotFound.into())
    }

    /// Case-insensitive lookup; codes are stored uppercase.
    pub async fn get_by_code(&self, code: &str) -> Result<coupon::Model, ServiceError> {
        coupon::Entity::find()
            .filter(coupon::Column::Code.eq(normalize_code(code)))
            .one(&*self.db)
            .await?
            .ok_or_else(|| CouponError::NotFound.into())
    }

    pub async fn list_coupons(
        &self,
        filter: ListCouponsFilter,
    ) -> Result<(Vec<coupon::Model>, u64), ServiceError> {
        let mut query = coupon::Entity::find().order_by_desc(coupon::Column::CreatedAt);
        if let Some(vendor_id) = filter.vendor_id {
            query = query.filter(coupon::Column::VendorId.eq(vendor_id));
        }
        if let Some(active) = filter.active {
            query = query.filter(coupon::Column::IsActive.eq(active));
        }

        let page = filter.page.max(1);
        let limit = filter.limit.clamp(1, 100);
        let paginator = query.paginate(&*self.db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;
        Ok((items, total))
    }

    /// Applies a partial update. Vendors may only touch their own coupons and
    /// the code is immutable once the coupon has been used.
    #[instrument(skip(self, input))]
    pub async fn update_coupon(
        &self,
        id: Uuid,
        input: UpdateCouponInput,
        acting_vendor: Option<Uuid>,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = self.get_coupon(id).await?;
        check_ownership(&existing, acting_vendor)?;

        if let Some(new_code) = &input.code {
            let normalized = normalize_code(new_code);
            if normalized != existing.code && existing.used_count > 0 {
                return Err(ServiceError::InvalidOperation(
                    "Coupon code cannot change once the coupon has been used".to_string(),
                ));
            }
        }

        let starts_at = input.starts_at.unwrap_or(existing.starts_at);
        let expires_at = input.expires_at.unwrap_or(existing.expires_at);
        let value = input.value.unwrap_or(existing.value);
        let usage_limit = input.usage_limit.unwrap_or(existing.usage_limit);
        let per_user_limit = input.per_user_limit.unwrap_or(existing.per_user_limit);
        let buy_x_get_y = match (
            existing.buy_quantity,
            existing.get_quantity,
            existing.get_discount_percent,
        ) {
            (Some(buy), Some(get), Some(pct)) => Some(BuyXGetYConfig {
                buy_quantity: buy,
                get_quantity: get,
                get_discount_percent: pct,
            }),
            _ => None,
        };
        validate_definition(
            existing.discount_type,
            value,
            starts_at,
            expires_at,
            usage_limit,
            per_user_limit,
            buy_x_get_y.as_ref(),
        )?;
        if let Some(limit) = usage_limit {
            if limit < existing.used_count {
                return Err(ServiceError::InvalidOperation(format!(
                    "Usage limit {} is below the {} redemptions already recorded",
                    limit, existing.used_count
                )));
            }
        }

        let mut active: coupon::ActiveModel = existing.into();
        if let Some(code) = input.code {
            active.code = Set(normalize_code(&code));
        }
        if let Some(description) = input.description {
            active.description = Set(Some(description));
        }
        if let Some(v) = input.value {
            active.value = Set(v);
        }
        if let Some(categories) = input.applicable_categories {
            active.applicable_categories = Set(IdSet(categories));
        }
        if let Some(products) = input.applicable_products {
            active.applicable_products = Set(IdSet(products));
        }
        if let Some(min_purchase) = input.min_purchase {
            active.min_purchase = Set(min_purchase);
        }
        if let Some(max_discount) = input.max_discount {
            active.max_discount = Set(Some(max_discount));
        }
        if let Some(min_items) = input.min_items {
            active.min_items = Set(min_items);
        }
        if let Some(v) = input.starts_at {
            active.starts_at = Set(v);
        }
        if let Some(v) = input.expires_at {
            active.expires_at = Set(v);
        }
        if let Some(v) = input.usage_limit {
            active.usage_limit = Set(v);
        }
        if let Some(v) = input.per_user_limit {
            active.per_user_limit = Set(v);
        }
        if let Some(v) = input.stackable {
            active.stackable = Set(v);
        }
        if let Some(v) = input.auto_apply {
            active.auto_apply = Set(v);
        }
        if let Some(v) = input.first_order_only {
            active.first_order_only = Set(v);
        }
        if let Some(groups) = input.customer_groups {
            active.customer_groups = Set(GroupSet(groups));
        }
        if let Some(v) = input.is_active {
            active.is_active = Set(v);
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::CouponUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Soft off-switch, always permitted for the owner.
    #[instrument(skip(self))]
    pub async fn deactivate_coupon(
        &self,
        id: Uuid,
        acting_vendor: Option<Uuid>,
    ) -> Result<coupon::Model, ServiceError> {
        let existing = self.get_coupon(id).await?;
        check_ownership(&existing, acting_vendor)?;

        let mut active: coupon::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send(Event::CouponDeactivated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(updated)
    }

    /// Hard delete, refused once the coupon has been used; the ledger must
    /// keep pointing at a coupon that existed.
    #[instrument(skip(self))]
    pub async fn delete_coupon(
        &self,
        id: Uuid,
        acting_vendor: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let existing = self.get_coupon(id).await?;
        check_ownership(&existing, acting_vendor)?;

        if existing.used_count > 0 {
            return Err(ServiceError::Conflict(
                "Coupon has recorded usage and can only be deactivated".to_string(),
            ));
        }

        coupon::Entity::delete_by_id(id).exec(&*self.db).await?;

        self.event_sender
            .send(Event::CouponDeleted(id))
            .await
            .map_err(ServiceError::EventError)?;

        Ok(())
    }

    /// Validates a code against a proposed order without side effects.
    #[instrument(skip(self, ctx))]
    pub async fn validate_code(
        &self,
        code: &str,
        customer_id: Option<Uuid>,
        cart_total: Decimal,
        ctx: &ValidationContext,
    ) -> Result<(coupon::Model, ValidationOutcome), ServiceError> {
        let coupon = self.get_by_code(code).await?;
        let prior = match customer_id {
            Some(customer) => Some(self.prior_usage(coupon.id, customer).await?),
            None => None,
        };
        let outcome = validation::validate(&coupon, prior, cart_total, ctx, Utc::now());
        Ok((coupon, outcome))
    }

    /// Validate-and-calculate in one step. Still pure with respect to the
    /// catalog; usage accounting happens only after order commit.
    #[instrument(skip(self, ctx))]
    pub async fn apply_code(
        &self,
        code: &str,
        customer_id: Option<Uuid>,
        cart_total: Decimal,
        ctx: &ValidationContext,
    ) -> Result<AppliedCoupon, ServiceError> {
        let (coupon, outcome) = self
            .validate_code(code, customer_id, cart_total, ctx)
            .await?;

        let discount_amount = if outcome.valid {
            Some(discount::calculate_discount(&coupon, cart_total, ctx)?)
        } else {
            None
        };

        Ok(AppliedCoupon {
            coupon_id: coupon.id,
            code: coupon.code,
            stackable: coupon.stackable,
            outcome,
            discount_amount,
        })
    }

    /// The customer's recorded redemption count for a coupon.
    pub async fn prior_usage(&self, coupon_id: Uuid, customer_id: Uuid) -> Result<i32, ServiceError> {
        let row = coupon_customer_usage::Entity::find()
            .filter(coupon_customer_usage::Column::CouponId.eq(coupon_id))
            .filter(coupon_customer_usage::Column::CustomerId.eq(customer_id))
            .one(&*self.db)
            .await?;
        Ok(row.map(|r| r.usage_count).unwrap_or(0))
    }
}

fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn check_ownership(
    coupon: &coupon::Model,
    acting_vendor: Option<Uuid>,
) -> Result<(), ServiceError> {
    if let Some(vendor) = acting_vendor {
        if coupon.vendor_id != Some(vendor) {
            return Err(CouponError::OwnershipViolation.into());
        }
    }
    Ok(())
}

/// Definition invariants shared by create and update.
fn validate_definition(
    discount_type: DiscountType,
    value: Decimal,
    starts_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    usage_limit: Option<i32>,
    per_user_limit: i32,
    buy_x_get_y: Option<&BuyXGetYConfig>,
) -> Result<(), ServiceError> {
    if starts_at >= expires_at {
        return Err(ServiceError::ValidationError(
            "Coupon start must be before its expiry".to_string(),
        ));
    }
    if let Some(limit) = usage_limit {
        if limit < 1 {
            return Err(ServiceError::ValidationError(
                "Usage limit must be at least 1".to_string(),
            ));
        }
    }
    if per_user_limit < 1 {
        return Err(ServiceError::ValidationError(
            "Per-user limit must be at least 1".to_string(),
        ));
    }

    match discount_type {
        DiscountType::Percentage => {
            if value <= Decimal::ZERO || value > Decimal::from(100) {
                return Err(ServiceError::ValidationError(
                    "Percentage value must be between 0 and 100".to_string(),
                ));
            }
        }
        DiscountType::Fixed => {
            if value <= Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "Fixed discount value must be positive".to_string(),
                ));
            }
        }
        DiscountType::FreeShipping => {}
        DiscountType::BuyXGetY => {
            let config = buy_x_get_y.ok_or_else(|| {
                ServiceError::ValidationError(
                    "buy_x_get_y coupons require a buy/get configuration".to_string(),
                )
            })?;
            if config.buy_quantity < 1 || config.get_quantity < 1 {
                return Err(ServiceError::ValidationError(
                    "buy_x_get_y quantities must be at least 1".to_string(),
                ));
            }
            if config.get_discount_percent <= Decimal::ZERO
                || config.get_discount_percent > Decimal::from(100)
            {
                return Err(ServiceError::ValidationError(
                    "buy_x_get_y discount percent must be between 0 and 100".to_string(),
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn bogo_input(buy_quantity: i32, get_quantity: i32) -> CreateCouponInput {
        let now = Utc::now();
        CreateCouponInput {
            code: "BOGOTEST".to_string(),
            description: None,
            discount_type: DiscountType::BuyXGetY,
            value: Decimal::ZERO,
            scope: CouponScope::Platform,
            applicable_categories: vec![],
            applicable_products: vec![],
            min_purchase: Decimal::ZERO,
            max_discount: None,
            min_items: 0,
            starts_at: now - Duration::days(1),
            expires_at: now + Duration::days(30),
            usage_limit: None,
            per_user_limit: 1,
            vendor_id: None,
            stackable: false,
            auto_apply: false,
            commission_absorber: CommissionAbsorber::Platform,
            buy_x_get_y: Some(BuyXGetYConfig {
                buy_quantity,
                get_quantity,
                get_discount_percent: dec!(100),
            }),
            first_order_only: false,
            customer_groups: vec![],
            is_active: true,
        }
    }

    #[test]
    fn payload_validation_reaches_the_nested_bogo_config() {
        assert!(bogo_input(0, 1).validate().is_err());
        assert!(bogo_input(1, 0).validate().is_err());
        assert!(bogo_input(1, 1).validate().is_ok());
    }

    #[test]
    fn codes_are_trimmed_and_uppercased() {
        assert_eq!(normalize_code("  sAvE10 "), "SAVE10");
    }

    #[test]
    fn definition_rejects_inverted_windows() {
        let now = Utc::now();
        let result = validate_definition(
            DiscountType::Fixed,
            dec!(5),
            now,
            now - Duration::days(1),
            None,
            1,
            None,
        );
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }
}
