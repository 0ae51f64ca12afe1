//! HTTP handlers for payables-service.

use crate::dtos::{
    CreatePaymentRequest, PaymentSeriesResponse, PromoteResponse, TransitionPaymentRequest,
};
use crate::services::{generator, metrics, promoter, transition};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "payables-service" })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    metrics::get_metrics()
}

/// POST /payments: expand and persist a payment series.
pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let payments = generator::expand(
        &request.spec,
        request.created_by_id,
        request.payment_request_id,
    )
    .inspect_err(|_| metrics::record_error("create_payment"))?;
    store::insert_all(state.store.as_ref(), Collection::Payments, &payments)
        .await
        .inspect_err(|_| metrics::record_error("create_payment"))?;

    metrics::record_series_created(request.spec.series_type.as_str());
    Ok((
        StatusCode::CREATED,
        Json(PaymentSeriesResponse { payments }),
    ))
}

/// PUT /payments/:id/series: transition the series containing a payment.
pub async fn transition_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(request): Json<TransitionPaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let today = Utc::now().date_naive();
    let payments = transition::transition_payment_series(
        state.store.as_ref(),
        payment_id,
        &request.new_spec,
        today,
    )
    .await
    .inspect_err(|_| metrics::record_error("transition_payment"))?;

    Ok(Json(PaymentSeriesResponse { payments }))
}

/// POST /payments/promote-due: flip due SCHEDULED payments to PENDING.
pub async fn promote_due(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now().date_naive();
    let promoted = promoter::promote_due_payments(state.store.as_ref(), now)
        .await
        .inspect_err(|_| metrics::record_error("promote_due"))?;

    metrics::record_promotions(promoted);
    Ok(Json(PromoteResponse { promoted }))
}
