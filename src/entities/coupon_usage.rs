use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::coupon::{CommissionAbsorber, DiscountType};

/// One redemption in the append-only usage ledger. Rows are created exactly
/// once per successful checkout that consumed a coupon and never mutated.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupon_usages")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub coupon_id: Uuid,
    /// Denormalized snapshot; the live coupon's code could change before
    /// first use, the ledger keeps what the customer actually redeemed.
    pub coupon_code: String,
    pub discount_type: DiscountType,
    pub customer_id: Uuid,
    pub order_id: Uuid,
    pub sub_order_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub discount_amount: Decimal,
    pub order_total: Decimal,
    pub absorbed_by: CommissionAbsorber,
    /// Invariant: platform_absorption + vendor_absorption == discount_amount.
    pub platform_absorption: Decimal,
    pub vendor_absorption: Decimal,
    pub used_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::coupon::Entity",
        from = "Column::CouponId",
        to = "super::coupon::Column::Id"
    )]
    Coupon,
}

impl Related<super::coupon::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Coupon.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
