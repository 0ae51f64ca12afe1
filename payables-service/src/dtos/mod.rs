use crate::models::{Frequency, Payment, SeriesType};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// The caller-supplied shape of a payment series. The same spec drives both
/// series creation and series transitions.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaymentSpec {
    #[validate(length(min = 1))]
    pub supplier_name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: Decimal,
    pub due_date: NaiveDate,
    #[serde(rename = "type")]
    pub series_type: SeriesType,
    /// Required when `series_type` is `installments`.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub installments: Option<u32>,
    /// Required when `series_type` is `recurring`.
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub spec: PaymentSpec,
    pub created_by_id: Uuid,
    #[serde(default)]
    pub payment_request_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TransitionPaymentRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub new_spec: PaymentSpec,
}

#[derive(Serialize)]
pub struct PaymentSeriesResponse {
    pub payments: Vec<Payment>,
}

#[derive(Serialize)]
pub struct PromoteResponse {
    pub promoted: u64,
}
