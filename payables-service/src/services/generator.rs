//! Payment series expansion.
//!
//! Pure functions turning a [`PaymentSpec`] into the ordered payment rows a
//! series is made of. No store access happens here; callers persist the
//! result themselves.

use crate::dtos::PaymentSpec;
use crate::models::{Frequency, Payment, PaymentStatus, SeriesType};
use backoffice_core::error::AppError;
use chrono::NaiveDate;
use uuid::Uuid;

/// Expand a spec into its payment rows.
///
/// `single` yields one ungrouped row. `installments` yields `n` rows one
/// month apart, indices 1..=n, sharing a fresh group id. `recurring` yields
/// rows from the start date through the end date (inclusive) under the
/// spec's frequency, also sharing a fresh group id.
pub fn expand(
    spec: &PaymentSpec,
    created_by_id: Uuid,
    payment_request_id: Option<Uuid>,
) -> Result<Vec<Payment>, AppError> {
    match spec.series_type {
        SeriesType::Single => Ok(vec![base_payment(
            spec,
            created_by_id,
            payment_request_id,
            spec.due_date,
        )]),
        SeriesType::Installments => {
            let count = spec
                .installments
                .filter(|&n| n >= 1)
                .ok_or_else(|| AppError::validation("installments must be at least 1"))?;
            expand_installment_tail(spec, created_by_id, payment_request_id, Uuid::new_v4(), 1, count)
        }
        SeriesType::Recurring => {
            let frequency = spec
                .frequency
                .ok_or_else(|| AppError::validation("recurring payments require a frequency"))?;
            let end_date = spec
                .end_date
                .ok_or_else(|| AppError::validation("recurring payments require an end date"))?;
            expand_recurring_tail(
                spec,
                created_by_id,
                payment_request_id,
                Uuid::new_v4(),
                spec.due_date,
                frequency,
                end_date,
            )
        }
    }
}

/// Generate installment rows `first_index..=count` starting at the spec's due
/// date, attached to an existing group. Used both for fresh series (from
/// index 1) and for regenerating the tail of an edited series.
pub fn expand_installment_tail(
    spec: &PaymentSpec,
    created_by_id: Uuid,
    payment_request_id: Option<Uuid>,
    group: Uuid,
    first_index: u32,
    count: u32,
) -> Result<Vec<Payment>, AppError> {
    if first_index > count {
        return Err(AppError::validation(
            "installment index exceeds installment count",
        ));
    }

    let mut payments = Vec::with_capacity((count - first_index + 1) as usize);
    for (offset, index) in (first_index..=count).enumerate() {
        let due_date = Frequency::Monthly
            .nth(spec.due_date, offset as u32)
            .ok_or_else(|| AppError::validation("installment schedule exceeds supported dates"))?;

        let mut payment = base_payment(spec, created_by_id, payment_request_id, due_date);
        payment.series_type = SeriesType::Installments;
        payment.payment_group = Some(group);
        payment.installment_number = Some(index);
        payment.installments = Some(count);
        payments.push(payment);
    }
    Ok(payments)
}

/// Generate recurring rows from `start` through `end_date` (inclusive),
/// attached to an existing group.
pub fn expand_recurring_tail(
    spec: &PaymentSpec,
    created_by_id: Uuid,
    payment_request_id: Option<Uuid>,
    group: Uuid,
    start: NaiveDate,
    frequency: Frequency,
    end_date: NaiveDate,
) -> Result<Vec<Payment>, AppError> {
    if start > end_date {
        return Err(AppError::validation(
            "recurring start date is after the end date",
        ));
    }

    let mut payments = Vec::new();
    for step in 0u32.. {
        let due_date = frequency
            .nth(start, step)
            .ok_or_else(|| AppError::validation("recurring schedule exceeds supported dates"))?;
        if due_date > end_date {
            break;
        }

        let mut payment = base_payment(spec, created_by_id, payment_request_id, due_date);
        payment.series_type = SeriesType::Recurring;
        payment.payment_group = Some(group);
        payment.frequency = Some(frequency);
        payment.end_date = Some(end_date);
        payments.push(payment);
    }
    Ok(payments)
}

fn base_payment(
    spec: &PaymentSpec,
    created_by_id: Uuid,
    payment_request_id: Option<Uuid>,
    due_date: NaiveDate,
) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        supplier_name: spec.supplier_name.clone(),
        description: spec.description.clone(),
        value: spec.value,
        due_date,
        status: PaymentStatus::Scheduled,
        series_type: SeriesType::Single,
        payment_group: None,
        installment_number: None,
        installments: None,
        frequency: None,
        end_date: None,
        payment_request_id,
        created_by_id,
    }
}
