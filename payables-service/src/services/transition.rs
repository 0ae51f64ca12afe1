//! Payment series transition engine.
//!
//! A transition takes an existing payment row and a new spec, and rewrites
//! the series so the group matches the new shape. All nine (old type, new
//! type) pairs are reachable. Validation and row generation happen before the
//! first destructive store call; a store failure after that point is
//! reported as [`AppError::PartialApplication`] so operators know the group
//! needs manual reconciliation.
//!
//! Two concurrent transitions on the same series group are not safe; callers
//! must serialize edits per group.

use crate::dtos::PaymentSpec;
use crate::models::{Payment, PaymentStatus, SeriesType};
use crate::services::generator;
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use chrono::NaiveDate;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

/// Apply `new_spec` to the series containing `payment_id`.
///
/// `today` anchors forward-looking regenerations (installments→recurring
/// starts its new series today, not at the edited due date).
#[instrument(skip(store, new_spec))]
pub async fn transition_payment_series(
    store: &dyn RecordStore,
    payment_id: Uuid,
    new_spec: &PaymentSpec,
    today: NaiveDate,
) -> Result<Vec<Payment>, AppError> {
    let current: Payment = store::find_one_as(
        store,
        Collection::Payments,
        &Filter::new().eq("id", payment_id),
    )
    .await?;

    if current.status.is_terminal() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "payment {} is in a terminal state and can no longer be edited",
            current.id
        )));
    }

    info!(
        from = current.series_type.as_str(),
        to = new_spec.series_type.as_str(),
        "Transitioning payment series"
    );

    let result = match (current.series_type, new_spec.series_type) {
        (SeriesType::Single, SeriesType::Single) => update_single(store, &current, new_spec).await,
        (SeriesType::Installments, SeriesType::Installments) => {
            reshape_installments(store, &current, new_spec).await
        }
        (SeriesType::Recurring, SeriesType::Recurring) => {
            reshape_recurring(store, &current, new_spec).await
        }
        (SeriesType::Installments, SeriesType::Single) => {
            installments_to_single(store, &current, new_spec).await
        }
        (SeriesType::Installments, SeriesType::Recurring) => {
            installments_to_recurring(store, &current, new_spec, today).await
        }
        (SeriesType::Recurring, SeriesType::Installments)
        | (SeriesType::Recurring, SeriesType::Single) => {
            replace_recurring_tail(store, &current, new_spec).await
        }
        (SeriesType::Single, SeriesType::Installments)
        | (SeriesType::Single, SeriesType::Recurring) => {
            replace_single(store, &current, new_spec).await
        }
    };

    let outcome = if result.is_ok() { "success" } else { "failure" };
    super::metrics::record_transition(
        current.series_type.as_str(),
        new_spec.series_type.as_str(),
        outcome,
    );
    result
}

/// single→single: rewrite the row in place and reset it to SCHEDULED.
async fn update_single(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let patch = json!({
        "supplier_name": new_spec.supplier_name,
        "description": new_spec.description,
        "value": new_spec.value,
        "due_date": new_spec.due_date,
        "status": PaymentStatus::Scheduled,
    });

    let updated = store
        .update(
            Collection::Payments,
            &Filter::new().eq("id", current.id),
            patch,
        )
        .await?;
    updated
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::StoreError(anyhow::anyhow!("malformed payment row: {}", e)))
        })
        .collect()
}

/// installments→installments: replace the tail of the group from the edited
/// index onward, then persist the new total count on every surviving row.
async fn reshape_installments(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let group = group_of(current)?;
    let edited_index = current.installment_number.ok_or_else(|| {
        AppError::StoreError(anyhow::anyhow!(
            "installment payment {} has no installment number",
            current.id
        ))
    })?;
    let new_count = new_spec
        .installments
        .filter(|&n| n >= 1)
        .ok_or_else(|| AppError::validation("installments must be at least 1"))?;

    let rows = group_rows(store, group).await?;
    ensure_window_is_rewritable(&rows, current.due_date)?;

    // History guard: never shrink below installments that are settled or
    // already in the immutable past relative to the edited row.
    let protected_max = rows
        .iter()
        .filter(|p| p.status.is_terminal() || p.due_date < current.due_date)
        .filter_map(|p| p.installment_number)
        .max()
        .unwrap_or(0);
    let min_allowed = protected_max.max(edited_index);
    if new_count < min_allowed {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "cannot reduce series to {} installments: {} are already settled or past",
            new_count,
            min_allowed
        )));
    }

    let tail = generator::expand_installment_tail(
        new_spec,
        current.created_by_id,
        current.payment_request_id,
        group,
        edited_index,
        new_count,
    )?;

    store
        .delete(
            Collection::Payments,
            &Filter::new()
                .eq("payment_group", group)
                .gte("due_date", current.due_date)
                .is_in("status", PaymentStatus::editable()),
        )
        .await?;

    store::insert_all(store, Collection::Payments, &tail)
        .await
        .map_err(partial)?;
    store
        .update(
            Collection::Payments,
            &Filter::new().eq("payment_group", group),
            json!({ "installments": new_count }),
        )
        .await
        .map_err(partial)?;

    group_rows(store, group).await
}

/// recurring→recurring: replace the tail with the updated frequency, value
/// and end date, keeping the same group.
async fn reshape_recurring(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let group = group_of(current)?;
    let frequency = new_spec
        .frequency
        .ok_or_else(|| AppError::validation("recurring payments require a frequency"))?;
    let end_date = new_spec
        .end_date
        .ok_or_else(|| AppError::validation("recurring payments require an end date"))?;

    ensure_window_is_rewritable(&group_rows(store, group).await?, current.due_date)?;

    let tail = generator::expand_recurring_tail(
        new_spec,
        current.created_by_id,
        current.payment_request_id,
        group,
        new_spec.due_date,
        frequency,
        end_date,
    )?;

    store
        .delete(
            Collection::Payments,
            &Filter::new()
                .eq("payment_group", group)
                .gte("due_date", current.due_date)
                .is_in("status", PaymentStatus::editable()),
        )
        .await?;

    store::insert_all(store, Collection::Payments, &tail)
        .await
        .map_err(partial)?;

    group_rows(store, group).await
}

/// installments→single: drop strictly-later installments, convert the edited
/// row to a standalone single, and shrink the surviving rows' count.
async fn installments_to_single(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let group = group_of(current)?;

    store
        .delete(
            Collection::Payments,
            &Filter::new()
                .eq("payment_group", group)
                .gt("due_date", current.due_date)
                .is_in("status", PaymentStatus::editable()),
        )
        .await?;

    let converted = store
        .update(
            Collection::Payments,
            &Filter::new().eq("id", current.id),
            json!({
                "supplier_name": new_spec.supplier_name,
                "description": new_spec.description,
                "value": new_spec.value,
                "due_date": new_spec.due_date,
                "status": PaymentStatus::Scheduled,
                "type": SeriesType::Single,
                "payment_group": null,
                "installment_number": null,
                "installments": null,
                "frequency": null,
                "end_date": null,
            }),
        )
        .await
        .map_err(partial)?;

    // Surviving settled installments keep the group; their count must now
    // reflect the shortened series.
    let survivors = group_rows(store, group).await.map_err(partial)?;
    if !survivors.is_empty() {
        store
            .update(
                Collection::Payments,
                &Filter::new().eq("payment_group", group),
                json!({ "installments": survivors.len() }),
            )
            .await
            .map_err(partial)?;
    }

    converted
        .into_iter()
        .map(|row| {
            serde_json::from_value(row)
                .map_err(|e| AppError::StoreError(anyhow::anyhow!("malformed payment row: {}", e)))
        })
        .collect()
}

/// installments→recurring: the new series is forward-looking and starts
/// today under a fresh group; the old group's settled rows are backfilled
/// with their final count.
async fn installments_to_recurring(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
    today: NaiveDate,
) -> Result<Vec<Payment>, AppError> {
    let group = group_of(current)?;
    let frequency = new_spec
        .frequency
        .ok_or_else(|| AppError::validation("recurring payments require a frequency"))?;
    let end_date = new_spec
        .end_date
        .ok_or_else(|| AppError::validation("recurring payments require an end date"))?;

    ensure_window_is_rewritable(&group_rows(store, group).await?, current.due_date)?;

    let series = generator::expand_recurring_tail(
        new_spec,
        current.created_by_id,
        current.payment_request_id,
        Uuid::new_v4(),
        today,
        frequency,
        end_date,
    )?;

    store
        .delete(
            Collection::Payments,
            &Filter::new()
                .eq("payment_group", group)
                .gte("due_date", current.due_date)
                .is_in("status", PaymentStatus::editable()),
        )
        .await?;

    store::insert_all(store, Collection::Payments, &series)
        .await
        .map_err(partial)?;

    let remaining = group_rows(store, group).await.map_err(partial)?;
    if !remaining.is_empty() {
        store
            .update(
                Collection::Payments,
                &Filter::new().eq("payment_group", group),
                json!({ "installments": remaining.len() }),
            )
            .await
            .map_err(partial)?;
    }

    Ok(series)
}

/// recurring→installments and recurring→single: the tail is removed and a
/// brand-new series is generated from the caller's payload.
async fn replace_recurring_tail(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let group = group_of(current)?;

    let series = generator::expand(new_spec, current.created_by_id, current.payment_request_id)?;

    store
        .delete(
            Collection::Payments,
            &Filter::new()
                .eq("payment_group", group)
                .gte("due_date", current.due_date)
                .is_in("status", PaymentStatus::editable()),
        )
        .await?;

    store::insert_all(store, Collection::Payments, &series)
        .await
        .map_err(partial)?;

    Ok(series)
}

/// single→installments and single→recurring: the original row is superseded,
/// not preserved.
async fn replace_single(
    store: &dyn RecordStore,
    current: &Payment,
    new_spec: &PaymentSpec,
) -> Result<Vec<Payment>, AppError> {
    let series = generator::expand(new_spec, current.created_by_id, current.payment_request_id)?;

    store
        .delete(Collection::Payments, &Filter::new().eq("id", current.id))
        .await?;

    store::insert_all(store, Collection::Payments, &series)
        .await
        .map_err(partial)?;

    Ok(series)
}

/// A settled (PAID/CANCELED) row standing inside the span a reshape would
/// rewrite cannot be deleted, and regenerating the tail around it would leave
/// the group with duplicate installment indices or due dates. The edit is
/// refused instead.
fn ensure_window_is_rewritable(rows: &[Payment], edited_due: NaiveDate) -> Result<(), AppError> {
    if let Some(settled) = rows
        .iter()
        .find(|p| p.status.is_terminal() && p.due_date >= edited_due)
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "payment {} is settled and due {}, inside the span this edit would rewrite",
            settled.id,
            settled.due_date
        )));
    }
    Ok(())
}

fn group_of(payment: &Payment) -> Result<Uuid, AppError> {
    payment.payment_group.ok_or_else(|| {
        AppError::StoreError(anyhow::anyhow!(
            "{:?} payment {} has no series group",
            payment.series_type,
            payment.id
        ))
    })
}

async fn group_rows(store: &dyn RecordStore, group: Uuid) -> Result<Vec<Payment>, AppError> {
    store::find_as(
        store,
        Collection::Payments,
        &Filter::new().eq("payment_group", group),
    )
    .await
}

/// A failure after the first destructive step left the group half-rewritten.
fn partial(err: AppError) -> AppError {
    AppError::PartialApplication(anyhow::Error::new(err))
}
