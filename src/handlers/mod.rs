pub mod coupons;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::events::EventSender;
use crate::services::{auto_apply::AutoApplyService, coupons::CouponService, usage::UsageService};

pub use coupons::coupon_routes;

/// Aggregated services used by the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub coupons: Arc<CouponService>,
    pub auto_apply: Arc<AutoApplyService>,
    pub usage: Arc<UsageService>,
}

impl AppServices {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        let coupons = Arc::new(CouponService::new(db.clone(), event_sender.clone()));
        let auto_apply = Arc::new(AutoApplyService::new(db.clone(), coupons.clone()));
        let usage = Arc::new(UsageService::new(db, event_sender));
        Self {
            coupons,
            auto_apply,
            usage,
        }
    }
}
