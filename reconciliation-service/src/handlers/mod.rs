//! HTTP handlers for reconciliation-service.

use crate::dtos::{
    CandidatesResponse, CommitRequest, CommitResponse, CreateReceivableRequest,
    ReceivablesResponse, SettleResponse, SyncRequest, SyncResponse,
};
use crate::services::{committer, dedupe, matcher, metrics, receivables};
use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use backoffice_core::error::AppError;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "reconciliation-service" })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    metrics::get_metrics()
}

/// POST /accounts/:id/statements/sync: dedupe and record a fetched batch.
pub async fn sync_statements(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
    Json(request): Json<SyncRequest>,
) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let result = dedupe::sync_account_statements(
        state.store.as_ref(),
        account_id,
        &request.entries,
        request.last_sync,
        request.created_by_id,
        today,
    )
    .await;

    match result {
        Ok(inserted) => {
            metrics::record_sync("success", inserted);
            Ok(Json(SyncResponse { inserted }))
        }
        Err(err) => {
            metrics::record_sync("failure", 0);
            metrics::record_error("sync_statements");
            Err(err)
        }
    }
}

/// GET /accounts/:id/reconciliation/candidates: tolerance-based proposals.
pub async fn reconciliation_candidates(
    State(state): State<AppState>,
    Path(account_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let proposals = matcher::reconcile_candidates(state.store.as_ref(), account_id)
        .await
        .inspect_err(|_| metrics::record_error("reconcile_candidates"))?;
    Ok(Json(CandidatesResponse { proposals }))
}

/// POST /reconciliation/commit: flip both sides to RECONCILED.
pub async fn commit_reconciliation(
    State(state): State<AppState>,
    Json(request): Json<CommitRequest>,
) -> Result<impl IntoResponse, AppError> {
    let result = committer::commit_reconciliation(
        state.store.as_ref(),
        request.reconciliation_statement_id,
        request.bank_statement_id,
    )
    .await;

    match result {
        Ok((reconciliation_statement, bank_statement)) => {
            metrics::record_commit("success");
            Ok(Json(CommitResponse {
                reconciliation_statement,
                bank_statement,
            }))
        }
        Err(err) => {
            metrics::record_commit("failure");
            metrics::record_error("commit_reconciliation");
            Err(err)
        }
    }
}

/// POST /receivables: create receivables under the payment method's terms.
pub async fn create_receivable(
    State(state): State<AppState>,
    Json(request): Json<CreateReceivableRequest>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let today = Utc::now().date_naive();
    let rows = receivables::create_receivable(state.store.as_ref(), &request, today)
        .await
        .inspect_err(|_| metrics::record_receivable_operation("create", "failure"))?;

    metrics::record_receivable_operation("create", "success");
    Ok((
        StatusCode::CREATED,
        Json(ReceivablesResponse { receivables: rows }),
    ))
}

/// POST /receivables/settle-due: settle receivables whose funds arrive today.
pub async fn settle_due(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let today = Utc::now().date_naive();
    let settled = receivables::settle_due_receivables(state.store.as_ref(), today)
        .await
        .inspect_err(|_| metrics::record_receivable_operation("settle", "failure"))?;

    metrics::record_receivable_operation("settle", "success");
    Ok(Json(SettleResponse { settled }))
}

/// POST /receivables/:id/cancel
pub async fn cancel_receivable(
    State(state): State<AppState>,
    Path(receivable_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receivable = receivables::cancel_receivable(state.store.as_ref(), receivable_id)
        .await
        .inspect_err(|_| metrics::record_receivable_operation("cancel", "failure"))?;
    metrics::record_receivable_operation("cancel", "success");
    Ok(Json(receivable))
}

/// POST /receivables/:id/reverse
pub async fn reverse_receivable(
    State(state): State<AppState>,
    Path(receivable_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let receivable = receivables::reverse_receivable(state.store.as_ref(), receivable_id)
        .await
        .inspect_err(|_| metrics::record_receivable_operation("reverse", "failure"))?;
    metrics::record_receivable_operation("reverse", "success");
    Ok(Json(receivable))
}
