//! Domain models for payables-service.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of a scheduled payment.
///
/// SCHEDULED rows are promoted to PENDING once their due date arrives; PAID
/// and CANCELED are terminal and immune to series edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Scheduled,
    Pending,
    Paid,
    Canceled,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Paid | Self::Canceled)
    }

    /// The statuses a series edit is allowed to touch.
    pub fn editable() -> [&'static str; 2] {
        ["SCHEDULED", "PENDING"]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Single,
    Installments,
    Recurring,
}

impl SeriesType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Installments => "installments",
            Self::Recurring => "recurring",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Biweekly,
    Monthly,
    Bimonthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Due date `steps` periods after `start`. Offsets are taken from the
    /// start date, not the previous occurrence, so a month-end start clamps
    /// per occurrence (Jan 31, Feb 29, Mar 31) instead of drifting.
    /// Returns `None` on calendar overflow.
    pub fn nth(&self, start: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            Self::Biweekly => start.checked_add_days(chrono::Days::new(14 * steps as u64)),
            Self::Monthly => start.checked_add_months(Months::new(steps)),
            Self::Bimonthly => start.checked_add_months(Months::new(2 * steps)),
            Self::Quarterly => start.checked_add_months(Months::new(3 * steps)),
            Self::Yearly => start.checked_add_months(Months::new(12 * steps)),
        }
    }
}

/// One scheduled cash-flow event. Rows of the same series share a
/// `payment_group`; a `single` payment has no group and no series fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub supplier_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: Decimal,
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub series_type: SeriesType,
    #[serde(default)]
    pub payment_group: Option<Uuid>,
    #[serde(default)]
    pub installment_number: Option<u32>,
    #[serde(default)]
    pub installments: Option<u32>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub payment_request_id: Option<Uuid>,
    pub created_by_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frequency_nth_clamps_month_ends_without_drift() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(
            Frequency::Monthly.nth(jan31, 1),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert_eq!(
            Frequency::Monthly.nth(jan31, 2),
            NaiveDate::from_ymd_opt(2024, 3, 31)
        );
        assert_eq!(
            Frequency::Quarterly.nth(jan31, 1),
            NaiveDate::from_ymd_opt(2024, 4, 30)
        );
    }

    #[test]
    fn frequency_nth_biweekly_is_fourteen_days() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            Frequency::Biweekly.nth(d, 2),
            NaiveDate::from_ymd_opt(2024, 3, 29)
        );
    }

    #[test]
    fn status_serializes_screaming_snake() {
        assert_eq!(
            serde_json::to_value(PaymentStatus::Scheduled).unwrap(),
            serde_json::json!("SCHEDULED")
        );
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::Pending.is_terminal());
    }
}
