//! Reconciliation commit: flip an internal entry and its chosen bank
//! statement entry to RECONCILED together.
//!
//! The store has no multi-collection transaction, so the second update is
//! guarded by a compensating rollback of the first. Only a failed rollback
//! surfaces as [`AppError::PartialApplication`].

use crate::models::{
    BankStatementEntry, ReconciliationStatement, ReconciliationStatus, StatementStatus,
};
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use serde_json::json;
use tracing::{error, info, instrument};
use uuid::Uuid;

#[instrument(skip(store))]
pub async fn commit_reconciliation(
    store: &dyn RecordStore,
    reconciliation_id: Uuid,
    statement_id: Uuid,
) -> Result<(ReconciliationStatement, BankStatementEntry), AppError> {
    let reconciliation: ReconciliationStatement = store::find_one_as(
        store,
        Collection::ReconciliationStatements,
        &Filter::new().eq("id", reconciliation_id),
    )
    .await?;
    let statement: BankStatementEntry = store::find_one_as(
        store,
        Collection::BankStatements,
        &Filter::new().eq("id", statement_id),
    )
    .await?;

    if reconciliation.status == ReconciliationStatus::Reconciled {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "reconciliation statement {} is already reconciled",
            reconciliation_id
        )));
    }
    if statement.status == StatementStatus::Reconciled {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "bank statement {} is already reconciled",
            statement_id
        )));
    }

    let updated_reconciliation = store
        .update(
            Collection::ReconciliationStatements,
            &Filter::new().eq("id", reconciliation_id),
            json!({ "status": "RECONCILED", "bank_statement_id": statement_id }),
        )
        .await?;

    let updated_statement = match store
        .update(
            Collection::BankStatements,
            &Filter::new().eq("id", statement_id),
            json!({ "status": "RECONCILED" }),
        )
        .await
    {
        Ok(rows) => rows,
        Err(err) => return rollback(store, reconciliation_id, err).await,
    };

    info!(
        reconciliation_id = %reconciliation_id,
        statement_id = %statement_id,
        "Reconciliation committed"
    );

    Ok((
        first_row(updated_reconciliation, "reconciliation statement")?,
        first_row(updated_statement, "bank statement")?,
    ))
}

/// Undo the reconciliation-side update after the statement-side one failed.
async fn rollback(
    store: &dyn RecordStore,
    reconciliation_id: Uuid,
    cause: AppError,
) -> Result<(ReconciliationStatement, BankStatementEntry), AppError> {
    let undo = store
        .update(
            Collection::ReconciliationStatements,
            &Filter::new().eq("id", reconciliation_id),
            json!({ "status": "PENDING", "bank_statement_id": null }),
        )
        .await;

    match undo {
        Ok(_) => {
            error!(
                reconciliation_id = %reconciliation_id,
                error = %cause,
                "Commit failed, first update rolled back"
            );
            Err(AppError::StoreError(anyhow::anyhow!(
                "commit failed and was rolled back: {}",
                cause
            )))
        }
        Err(rollback_err) => Err(AppError::PartialApplication(anyhow::anyhow!(
            "commit failed ({}) and rollback also failed ({}): reconciliation {} needs manual repair",
            cause,
            rollback_err,
            reconciliation_id
        ))),
    }
}

fn first_row<T: serde::de::DeserializeOwned>(
    rows: Vec<serde_json::Value>,
    what: &str,
) -> Result<T, AppError> {
    let row = rows
        .into_iter()
        .next()
        .ok_or_else(|| AppError::StoreError(anyhow::anyhow!("updated {} vanished", what)))?;
    serde_json::from_value(row)
        .map_err(|e| AppError::StoreError(anyhow::anyhow!("malformed {} row: {}", what, e)))
}
