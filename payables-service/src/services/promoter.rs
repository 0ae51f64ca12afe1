//! Due-date promotion: SCHEDULED payments whose due date has arrived become
//! PENDING. Idempotent, runs from a periodic job or on demand.

use crate::models::Payment;
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};

#[instrument(skip(store))]
pub async fn promote_due_payments(
    store: &dyn RecordStore,
    now: NaiveDate,
) -> Result<u64, AppError> {
    let due: Vec<Payment> = store::find_as(
        store,
        Collection::Payments,
        &Filter::new().eq("status", "SCHEDULED").lte("due_date", now),
    )
    .await?;

    if due.is_empty() {
        return Ok(0);
    }

    let ids: Vec<String> = due.iter().map(|p| p.id.to_string()).collect();
    let updated = store
        .update(
            Collection::Payments,
            &Filter::new().is_in("id", ids),
            json!({ "status": "PENDING" }),
        )
        .await?;

    info!(promoted = updated.len(), "Promoted due payments to PENDING");
    Ok(updated.len() as u64)
}
