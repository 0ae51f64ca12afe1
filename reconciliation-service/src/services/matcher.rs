//! Tolerance-based candidate matching between pending internal entries and
//! pending bank statement entries.

use crate::dtos::MatchProposal;
use crate::models::{BankStatementEntry, ReconciliationStatement};
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

/// An external entry is a candidate when it lands within one calendar day,
/// has the same direction, and differs by at most one unit of currency. The
/// value tolerance is absolute, not proportional.
pub fn is_candidate(internal: &ReconciliationStatement, external: &BankStatementEntry) -> bool {
    let date_delta = (external.transaction_date - internal.transaction_date)
        .num_days()
        .abs();
    let value_delta = (external.value - internal.value).abs();

    date_delta <= 1 && external.direction == internal.direction && value_delta <= Decimal::ONE
}

/// Pair every pending internal entry with its candidates. Entries with no
/// candidate still appear, with an empty list; no ranking is applied.
pub fn match_candidates(
    internal: Vec<ReconciliationStatement>,
    external: &[BankStatementEntry],
) -> Vec<MatchProposal> {
    internal
        .into_iter()
        .map(|entry| {
            let candidates = external
                .iter()
                .filter(|candidate| is_candidate(&entry, candidate))
                .cloned()
                .collect();
            MatchProposal {
                internal: entry,
                candidates,
            }
        })
        .collect()
}

/// Load both pending sets for an account and run the matcher over them.
#[instrument(skip(store))]
pub async fn reconcile_candidates(
    store: &dyn RecordStore,
    bank_account_id: Uuid,
) -> Result<Vec<MatchProposal>, AppError> {
    let internal: Vec<ReconciliationStatement> = store::find_as(
        store,
        Collection::ReconciliationStatements,
        &Filter::new()
            .eq("bank_account_id", bank_account_id)
            .eq("status", "PENDING"),
    )
    .await?;

    let external: Vec<BankStatementEntry> = store::find_as(
        store,
        Collection::BankStatements,
        &Filter::new()
            .eq("bank_account_id", bank_account_id)
            .eq("status", "PENDING"),
    )
    .await?;

    Ok(match_candidates(internal, &external))
}
