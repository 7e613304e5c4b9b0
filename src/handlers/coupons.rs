//! REST surface for the coupon engine.
//!
//! The acting vendor, when any, arrives from the vendor identity layer; here
//! it is carried on the payload or query so the ownership checks in the
//! service layer can run.

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{coupon, coupon_usage},
    models::{CartItem, ValidationContext, ValidationOutcome},
    services::coupons::{
        AppliedCoupon, CreateCouponInput, ListCouponsFilter, UpdateCouponInput,
    },
    services::usage::{CouponStats, RecordUsageInput},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};

pub fn coupon_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_coupon))
        .route("/", get(list_coupons))
        .route("/validate", post(validate_coupon))
        .route("/apply", post(apply_coupon))
        .route(
            "/auto-apply",
            get(auto_apply_candidates).post(eligible_coupons),
        )
        .route("/by-code/:code", get(get_coupon_by_code))
        .route("/:id", get(get_coupon))
        .route("/:id", put(update_coupon))
        .route("/:id", delete(delete_coupon))
        .route("/:id/deactivate", post(deactivate_coupon))
        .route("/:id/redeem", post(redeem_coupon))
        .route("/:id/usages", get(list_coupon_usages))
        .route("/:id/stats", get(coupon_stats))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    #[serde(flatten)]
    pub coupon: CreateCouponInput,
    /// Set when a vendor (not an admin) is creating the coupon.
    pub acting_vendor: Option<Uuid>,
}

async fn create_coupon(
    State(state): State<AppState>,
    Json(payload): Json<CreateCouponRequest>,
) -> ApiResult<coupon::Model> {
    let created = state
        .services
        .coupons
        .create_coupon(payload.coupon, payload.acting_vendor)
        .await?;
    Ok(Json(ApiResponse::success(created)))
}

async fn list_coupons(
    State(state): State<AppState>,
    Query(filter): Query<ListCouponsFilter>,
) -> ApiResult<PaginatedResponse<coupon::Model>> {
    let page = filter.page.max(1);
    let limit = filter.limit.clamp(1, 100);
    let (items, total) = state.services.coupons.list_coupons(filter).await?;
    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages: total.div_ceil(limit),
    })))
}

async fn get_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<coupon::Model> {
    let coupon = state.services.coupons.get_coupon(id).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

async fn get_coupon_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<coupon::Model> {
    let coupon = state.services.coupons.get_by_code(&code).await?;
    Ok(Json(ApiResponse::success(coupon)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    #[serde(flatten)]
    pub changes: UpdateCouponInput,
    pub acting_vendor: Option<Uuid>,
}

async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCouponRequest>,
) -> ApiResult<coupon::Model> {
    let updated = state
        .services
        .coupons
        .update_coupon(id, payload.changes, payload.acting_vendor)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ActingVendorQuery {
    pub acting_vendor: Option<Uuid>,
}

async fn deactivate_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActingVendorQuery>,
) -> ApiResult<coupon::Model> {
    let updated = state
        .services
        .coupons
        .deactivate_coupon(id, query.acting_vendor)
        .await?;
    Ok(Json(ApiResponse::success(updated)))
}

async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActingVendorQuery>,
) -> ApiResult<serde_json::Value> {
    state
        .services
        .coupons
        .delete_coupon(id, query.acting_vendor)
        .await?;
    Ok(Json(ApiResponse::success(serde_json::json!({ "deleted": id }))))
}

/// Cart facts supplied by the checkout orchestrator with each engine call.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CartPayload {
    pub cart_total: Decimal,
    #[serde(default)]
    pub cart_items: Vec<CartItem>,
    #[serde(default)]
    pub is_first_order: bool,
    #[serde(default)]
    pub customer_group: Option<String>,
    #[serde(default)]
    pub shipping_cost: Decimal,
}

impl CartPayload {
    fn context(&self) -> ValidationContext {
        ValidationContext {
            cart_items: self.cart_items.clone(),
            is_first_order: self.is_first_order,
            customer_group: self.customer_group.clone(),
            shipping_cost: self.shipping_cost,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidateCouponRequest {
    pub code: String,
    pub customer_id: Option<Uuid>,
    #[serde(flatten)]
    pub cart: CartPayload,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValidateCouponResponse {
    pub coupon_id: Uuid,
    pub code: String,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

async fn validate_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> ApiResult<ValidateCouponResponse> {
    let ctx = payload.cart.context();
    let (coupon, outcome) = state
        .services
        .coupons
        .validate_code(
            &payload.code,
            payload.customer_id,
            payload.cart.cart_total,
            &ctx,
        )
        .await?;
    Ok(Json(ApiResponse::success(ValidateCouponResponse {
        coupon_id: coupon.id,
        code: coupon.code,
        outcome,
    })))
}

async fn apply_coupon(
    State(state): State<AppState>,
    Json(payload): Json<ValidateCouponRequest>,
) -> ApiResult<AppliedCoupon> {
    let ctx = payload.cart.context();
    let applied = state
        .services
        .coupons
        .apply_code(
            &payload.code,
            payload.customer_id,
            payload.cart.cart_total,
            &ctx,
        )
        .await?;
    Ok(Json(ApiResponse::success(applied)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AutoApplyQuery {
    pub vendor_id: Option<Uuid>,
    pub cart_total: Decimal,
}

/// Query-only candidate listing. Candidates are not validated for any
/// particular customer; POST the full cart to get eligible coupons.
async fn auto_apply_candidates(
    State(state): State<AppState>,
    Query(query): Query<AutoApplyQuery>,
) -> ApiResult<Vec<coupon::Model>> {
    let candidates = state
        .services
        .auto_apply
        .find_candidates(query.vendor_id, query.cart_total)
        .await?;
    Ok(Json(ApiResponse::success(candidates)))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EligibleCouponsRequest {
    pub vendor_id: Option<Uuid>,
    pub customer_id: Option<Uuid>,
    #[serde(flatten)]
    pub cart: CartPayload,
}

/// Candidates filtered through the validation engine for this customer and
/// cart, per-user limits included.
async fn eligible_coupons(
    State(state): State<AppState>,
    Json(payload): Json<EligibleCouponsRequest>,
) -> ApiResult<Vec<coupon::Model>> {
    let ctx = payload.cart.context();
    let eligible = state
        .services
        .auto_apply
        .eligible_coupons(
            payload.vendor_id,
            payload.customer_id,
            payload.cart.cart_total,
            &ctx,
        )
        .await?;
    Ok(Json(ApiResponse::success(eligible)))
}

async fn redeem_coupon(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordUsageInput>,
) -> ApiResult<coupon_usage::Model> {
    let usage = state.services.usage.record_usage(id, payload).await?;
    Ok(Json(ApiResponse::success(usage)))
}

async fn list_coupon_usages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<coupon_usage::Model>> {
    let usages = state.services.usage.list_usages(id).await?;
    Ok(Json(ApiResponse::success(usages)))
}

async fn coupon_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<CouponStats> {
    let stats = state.services.usage.usage_stats(id).await?;
    Ok(Json(ApiResponse::success(stats)))
}
