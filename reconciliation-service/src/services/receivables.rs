//! Receivable lifecycle: creation under payment-method terms, scheduled
//! settlement, cancellation and reversal.

use crate::dtos::CreateReceivableRequest;
use crate::models::{
    BankStatementEntry, Direction, PaymentMethodTerms, Receivable, ReceivableStatus,
    ReconciliationStatement, ReconciliationStatus, StatementStatus,
};
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, RecordStore};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

enum PaymentCondition {
    Immediate,
    Installments(u32),
    ThirtySixtyNinety,
}

fn parse_condition(condition: &str) -> Result<PaymentCondition, AppError> {
    match condition {
        "immediate" => Ok(PaymentCondition::Immediate),
        "30/60/90" => Ok(PaymentCondition::ThirtySixtyNinety),
        other => {
            let count: u32 = other
                .strip_suffix('x')
                .and_then(|n| n.parse().ok())
                .ok_or_else(|| {
                    AppError::validation(format!("unsupported payment condition: {}", other))
                })?;
            if !(1..=12).contains(&count) {
                return Err(AppError::validation(
                    "installment payment conditions must be between 1x and 12x",
                ));
            }
            Ok(PaymentCondition::Installments(count))
        }
    }
}

/// Net value after the payment method's percentage and flat fees.
fn net_value(gross: Decimal, terms: &PaymentMethodTerms) -> Decimal {
    (gross * (Decimal::ONE - terms.aliquot / Decimal::ONE_HUNDRED) - terms.fixed_aliquot)
        .round_dp(2)
}

/// Create the receivable rows for a request under its payment method's
/// terms. An immediate receivable paid today takes the fast path: the bank
/// statement entry and internal ledger entry are created already RECONCILED.
#[instrument(skip(store, request))]
pub async fn create_receivable(
    store: &dyn RecordStore,
    request: &CreateReceivableRequest,
    today: NaiveDate,
) -> Result<Vec<Receivable>, AppError> {
    let terms: PaymentMethodTerms = store::find_one_as(
        store,
        Collection::PaymentMethods,
        &Filter::new().eq("id", request.payment_method_id),
    )
    .await?;

    let net = net_value(request.value, &terms);
    let group = Uuid::new_v4();

    let receivables = match parse_condition(&terms.payment_condition)? {
        PaymentCondition::Immediate => {
            let status = if request.payment_date == today {
                ReceivableStatus::Received
            } else {
                ReceivableStatus::Pending
            };
            vec![receivable_row(request, group, request.payment_date, net, status)]
        }
        PaymentCondition::Installments(count) => {
            split_rows(request, group, request.payment_date, net, count)?
        }
        PaymentCondition::ThirtySixtyNinety => split_rows(request, group, today, net, 3)?,
    };

    store::insert_all(store, Collection::Receivables, &receivables).await?;

    if let Some(settled) = receivables
        .iter()
        .find(|r| r.status == ReceivableStatus::Received)
    {
        record_settlement(store, settled, today, ReconciledOnCreate::Yes)
            .await
            .map_err(partial)?;
    }

    info!(
        condition = %terms.payment_condition,
        rows = receivables.len(),
        "Receivable created"
    );
    Ok(receivables)
}

/// Settle PENDING receivables whose funds reach the account today, i.e.
/// `payment_date + settlement_days == today`. Each settlement spawns a
/// PENDING credit entry on the bank statement for the matcher to pick up.
#[instrument(skip(store))]
pub async fn settle_due_receivables(
    store: &dyn RecordStore,
    today: NaiveDate,
) -> Result<u64, AppError> {
    let pending: Vec<Receivable> = store::find_as(
        store,
        Collection::Receivables,
        &Filter::new()
            .eq("status", "PENDING")
            .lte("payment_date", today),
    )
    .await?;

    let mut due = Vec::new();
    for receivable in pending {
        let terms: PaymentMethodTerms = store::find_one_as(
            store,
            Collection::PaymentMethods,
            &Filter::new().eq("id", receivable.payment_method_id),
        )
        .await?;
        let settles_on = receivable
            .payment_date
            .checked_add_days(Days::new(terms.settlement_days as u64));
        if settles_on == Some(today) {
            due.push(receivable);
        }
    }

    if due.is_empty() {
        return Ok(0);
    }

    let mut touched = false;
    for receivable in &due {
        match record_settlement(store, receivable, today, ReconciledOnCreate::No).await {
            Ok(()) => touched = true,
            Err(err) if touched => return Err(partial(err)),
            Err(err) => return Err(err),
        }
    }

    let ids: Vec<String> = due.iter().map(|r| r.id.to_string()).collect();
    store
        .update(
            Collection::Receivables,
            &Filter::new().is_in("id", ids),
            json!({ "status": "RECEIVED" }),
        )
        .await
        .map_err(partial)?;

    info!(settled = due.len(), "Settled due receivables");
    Ok(due.len() as u64)
}

/// Cancel a receivable and drop the statement entry it spawned, if any.
#[instrument(skip(store))]
pub async fn cancel_receivable(
    store: &dyn RecordStore,
    receivable_id: Uuid,
) -> Result<Receivable, AppError> {
    let receivable = editable_receivable(store, receivable_id).await?;

    store
        .update(
            Collection::Receivables,
            &Filter::new().eq("id", receivable_id),
            json!({ "status": "CANCELED" }),
        )
        .await?;
    store
        .delete(
            Collection::BankStatements,
            &Filter::new().eq("receivable_id", receivable_id),
        )
        .await
        .map_err(partial)?;

    Ok(Receivable {
        status: ReceivableStatus::Canceled,
        ..receivable
    })
}

/// Reverse a settled receivable, marking both it and its statement entry.
#[instrument(skip(store))]
pub async fn reverse_receivable(
    store: &dyn RecordStore,
    receivable_id: Uuid,
) -> Result<Receivable, AppError> {
    let receivable = editable_receivable(store, receivable_id).await?;

    // Resolve the statement entry before touching anything, so a missing
    // entry fails cleanly instead of leaving the receivable half-reversed.
    let statement: BankStatementEntry = store::find_one_as(
        store,
        Collection::BankStatements,
        &Filter::new().eq("receivable_id", receivable_id),
    )
    .await?;

    store
        .update(
            Collection::Receivables,
            &Filter::new().eq("id", receivable_id),
            json!({ "status": "REVERSED" }),
        )
        .await?;
    store
        .update(
            Collection::BankStatements,
            &Filter::new().eq("id", statement.id),
            json!({ "status": "REVERSED" }),
        )
        .await
        .map_err(partial)?;

    Ok(Receivable {
        status: ReceivableStatus::Reversed,
        ..receivable
    })
}

async fn editable_receivable(
    store: &dyn RecordStore,
    receivable_id: Uuid,
) -> Result<Receivable, AppError> {
    let receivable: Receivable = store::find_one_as(
        store,
        Collection::Receivables,
        &Filter::new().eq("id", receivable_id),
    )
    .await?;

    if matches!(
        receivable.status,
        ReceivableStatus::Canceled | ReceivableStatus::Reversed
    ) {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "receivable {} is already canceled or reversed",
            receivable_id
        )));
    }
    Ok(receivable)
}

enum ReconciledOnCreate {
    Yes,
    No,
}

/// Record the bank-side effect of a settled receivable. On the immediate
/// fast path both the statement entry and the internal ledger entry are
/// written as RECONCILED and linked; scheduled settlements leave a PENDING
/// entry for the matcher.
async fn record_settlement(
    store: &dyn RecordStore,
    receivable: &Receivable,
    today: NaiveDate,
    reconciled: ReconciledOnCreate,
) -> Result<(), AppError> {
    let description = receivable
        .notes
        .clone()
        .unwrap_or_else(|| format!("Payment received from {}", receivable.customer_name));

    let entry = BankStatementEntry {
        id: Uuid::new_v4(),
        bank_account_id: receivable.bank_account_id,
        transaction_date: today,
        value_date: Some(today),
        direction: Direction::Credit,
        description: description.clone(),
        document: None,
        value: receivable.value,
        status: match reconciled {
            ReconciledOnCreate::Yes => StatementStatus::Reconciled,
            ReconciledOnCreate::No => StatementStatus::Pending,
        },
        receivable_id: Some(receivable.id),
        created_by_id: receivable.created_by_id,
    };
    store::insert_all(store, Collection::BankStatements, std::slice::from_ref(&entry)).await?;

    if matches!(reconciled, ReconciledOnCreate::Yes) {
        let ledger_entry = ReconciliationStatement {
            id: Uuid::new_v4(),
            bank_account_id: receivable.bank_account_id,
            transaction_date: today,
            value_date: Some(today),
            direction: Direction::Credit,
            description,
            document: None,
            value: receivable.value,
            status: ReconciliationStatus::Reconciled,
            bank_statement_id: Some(entry.id),
            api_payload: None,
            created_by_id: receivable.created_by_id,
        };
        store::insert_all(
            store,
            Collection::ReconciliationStatements,
            std::slice::from_ref(&ledger_entry),
        )
        .await?;
    }

    Ok(())
}

fn receivable_row(
    request: &CreateReceivableRequest,
    group: Uuid,
    payment_date: NaiveDate,
    value: Decimal,
    status: ReceivableStatus,
) -> Receivable {
    Receivable {
        id: Uuid::new_v4(),
        customer_name: request.customer_name.clone(),
        notes: request.notes.clone(),
        value,
        payment_method_id: request.payment_method_id,
        bank_account_id: request.bank_account_id,
        status,
        payment_date,
        receivable_group: Some(group),
        created_by_id: request.created_by_id,
    }
}

/// N PENDING rows thirty days apart, starting thirty days after `base`,
/// each carrying an equal share of the net value.
fn split_rows(
    request: &CreateReceivableRequest,
    group: Uuid,
    base: NaiveDate,
    net: Decimal,
    count: u32,
) -> Result<Vec<Receivable>, AppError> {
    let share = (net / Decimal::from(count)).round_dp(2);
    (1..=count)
        .map(|i| {
            let payment_date = base
                .checked_add_days(Days::new(30 * i as u64))
                .ok_or_else(|| {
                    AppError::validation("receivable schedule exceeds supported dates")
                })?;
            Ok(receivable_row(
                request,
                group,
                payment_date,
                share,
                ReceivableStatus::Pending,
            ))
        })
        .collect()
}

fn partial(err: AppError) -> AppError {
    AppError::PartialApplication(anyhow::Error::new(err))
}
