use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::coupon::DiscountRule;

/// How a coupon's monetary value is computed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
    #[sea_orm(string_value = "free_shipping")]
    FreeShipping,
    #[sea_orm(string_value = "buy_x_get_y")]
    BuyXGetY,
}

/// Which part of an order the discount may be computed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum CouponScope {
    #[sea_orm(string_value = "platform")]
    Platform,
    #[sea_orm(string_value = "vendor")]
    Vendor,
    #[sea_orm(string_value = "category")]
    Category,
    #[sea_orm(string_value = "product")]
    Product,
}

/// The party whose revenue is reduced by the discount amount.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum CommissionAbsorber {
    #[sea_orm(string_value = "platform")]
    Platform,
    #[sea_orm(string_value = "vendor")]
    Vendor,
    #[sea_orm(string_value = "split")]
    Split,
}

/// JSON-backed set of identifiers for category/product scope narrowing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct IdSet(pub Vec<Uuid>);

impl IdSet {
    pub fn contains(&self, id: &Uuid) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// JSON-backed set of customer group names.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct GroupSet(pub Vec<String>);

impl GroupSet {
    pub fn contains(&self, group: &str) -> bool {
        self.0.iter().any(|g| g == group)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Unique code, stored uppercase; lookups normalize their input.
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: Decimal,
    pub scope: CouponScope,
    #[sea_orm(column_type = "Json")]
    pub applicable_categories: IdSet,
    #[sea_orm(column_type = "Json")]
    pub applicable_products: IdSet,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub min_items: i32,
    pub starts_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// None means unlimited redemptions.
    pub usage_limit: Option<i32>,
    pub used_count: i32,
    pub per_user_limit: i32,
    /// Owning vendor; None means platform-wide.
    pub vendor_id: Option<Uuid>,
    pub stackable: bool,
    pub auto_apply: bool,
    pub commission_absorber: CommissionAbsorber,
    pub buy_quantity: Option<i32>,
    pub get_quantity: Option<i32>,
    pub get_discount_percent: Option<Decimal>,
    pub first_order_only: bool,
    #[sea_orm(column_type = "Json")]
    pub customer_groups: GroupSet,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::coupon_usage::Entity")]
    Usages,
    #[sea_orm(has_many = "super::coupon_customer_usage::Entity")]
    CustomerUsages,
}

impl Related<super::coupon_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usages.def()
    }
}

impl Related<super::coupon_customer_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustomerUsages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Projects the flat row into the tagged discount rule so calculation can
    /// be an exhaustive match. A `buy_x_get_y` row missing its sub-fields is
    /// an error, not a silent zero discount.
    pub fn discount_rule(&self) -> Result<DiscountRule, ServiceError> {
        match self.discount_type {
            DiscountType::Percentage => Ok(DiscountRule::Percentage {
                percent: self.value,
                max_discount: self.max_discount,
            }),
            DiscountType::Fixed => Ok(DiscountRule::Fixed { amount: self.value }),
            DiscountType::FreeShipping => Ok(DiscountRule::FreeShipping),
            DiscountType::BuyXGetY => {
                let (buy, get, pct) = match (
                    self.buy_quantity,
                    self.get_quantity,
                    self.get_discount_percent,
                ) {
                    (Some(buy), Some(get), Some(pct)) if buy > 0 && get > 0 => (buy, get, pct),
                    _ => {
                        return Err(ServiceError::ValidationError(format!(
                            "Coupon {} is missing its buy-x-get-y configuration",
                            self.code
                        )))
                    }
                };
                Ok(DiscountRule::BuyXGetY {
                    buy_quantity: buy as u32,
                    get_quantity: get as u32,
                    get_discount_percent: pct,
                })
            }
        }
    }

    /// Whether the global usage limit still has headroom.
    pub fn has_remaining_uses(&self) -> bool {
        match self.usage_limit {
            Some(limit) => self.used_count < limit,
            None => true,
        }
    }
}
