//! Statement deduplication and the account sync entry point.
//!
//! External feeds overlap between syncs, so freshly fetched entries are
//! compared against the rows already recorded inside a rolling lookback
//! window before anything is inserted. Running the same batch twice inserts
//! nothing the second time.

use crate::dtos::FreshEntry;
use crate::models::{ReconciliationStatement, ReconciliationStatus};
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use chrono::{Days, NaiveDate};
use tracing::{info, instrument};
use uuid::Uuid;

/// Start of the dedupe lookback window.
///
/// One day before the last sync tolerates late-posting bank entries; the
/// window never reaches further back than 29 days, which also bootstraps
/// accounts that have never synced.
pub fn lookback_start(last_sync: Option<NaiveDate>, today: NaiveDate) -> NaiveDate {
    let bootstrap = today
        .checked_sub_days(Days::new(29))
        .unwrap_or(NaiveDate::MIN);
    match last_sync {
        Some(sync) => sync
            .checked_sub_days(Days::new(1))
            .unwrap_or(NaiveDate::MIN)
            .max(bootstrap),
        None => bootstrap,
    }
}

/// The natural key deliberately excludes direction: some feeds report the
/// sign inconsistently, and the matcher enforces direction equality later.
fn is_recorded(entry: &FreshEntry, existing: &[ReconciliationStatement]) -> bool {
    existing.iter().any(|row| {
        row.transaction_date == entry.transaction_date
            && row.description == entry.description
            && row.document == entry.document
            && row.value == entry.value
    })
}

/// Keep only the fresh entries not already recorded, preserving input order.
pub fn dedupe(fresh: &[FreshEntry], existing: &[ReconciliationStatement]) -> Vec<FreshEntry> {
    if existing.is_empty() {
        return fresh.to_vec();
    }
    fresh
        .iter()
        .filter(|entry| !is_recorded(entry, existing))
        .cloned()
        .collect()
}

/// Deduplicate a fetched batch against the account's recent history and
/// record the genuinely new entries. Returns how many were inserted.
#[instrument(skip(store, entries))]
pub async fn sync_account_statements(
    store: &dyn RecordStore,
    bank_account_id: Uuid,
    entries: &[FreshEntry],
    last_sync: Option<NaiveDate>,
    created_by_id: Uuid,
    today: NaiveDate,
) -> Result<u64, AppError> {
    if entries.is_empty() {
        return Ok(0);
    }

    let window_start = lookback_start(last_sync, today);
    let existing: Vec<ReconciliationStatement> = store::find_as(
        store,
        Collection::ReconciliationStatements,
        &Filter::new()
            .eq("bank_account_id", bank_account_id)
            .gte("transaction_date", window_start),
    )
    .await?;

    let new_entries = dedupe(entries, &existing);
    if new_entries.is_empty() {
        info!(fetched = entries.len(), "No new statements to record");
        return Ok(0);
    }

    let rows: Vec<ReconciliationStatement> = new_entries
        .into_iter()
        .map(|entry| ReconciliationStatement {
            id: Uuid::new_v4(),
            bank_account_id,
            transaction_date: entry.transaction_date,
            value_date: entry.value_date,
            direction: entry.direction,
            description: entry.description,
            document: entry.document,
            value: entry.value,
            status: ReconciliationStatus::Pending,
            bank_statement_id: None,
            api_payload: entry.api_payload,
            created_by_id,
        })
        .collect();

    store::insert_all(store, Collection::ReconciliationStatements, &rows).await?;

    info!(
        fetched = entries.len(),
        inserted = rows.len(),
        "Recorded new statements"
    );
    Ok(rows.len() as u64)
}
