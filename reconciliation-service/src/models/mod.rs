//! Domain models for reconciliation-service.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Credit,
    Debit,
}

/// Lifecycle of an internally recorded ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Pending,
    Reconciled,
}

/// Lifecycle of an externally observed bank statement entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatementStatus {
    Pending,
    Reconciled,
    Reversed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceivableStatus {
    Pending,
    Received,
    Canceled,
    Reversed,
}

/// An internally recorded ledger entry awaiting reconciliation against the
/// bank. Rows land here from the periodic external sync (after dedupe) and
/// from the immediate-settlement shortcut.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationStatement {
    pub id: Uuid,
    pub bank_account_id: Uuid,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub value_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub description: String,
    #[serde(default)]
    pub document: Option<String>,
    pub value: Decimal,
    pub status: ReconciliationStatus,
    /// Set once the entry is committed against a bank statement entry.
    #[serde(default)]
    pub bank_statement_id: Option<Uuid>,
    /// Raw feed payload, kept for audit.
    #[serde(default)]
    pub api_payload: Option<Value>,
    pub created_by_id: Uuid,
}

/// An externally observed movement on the bank account, typically spawned
/// when a receivable settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankStatementEntry {
    pub id: Uuid,
    pub bank_account_id: Uuid,
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub value_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub description: String,
    #[serde(default)]
    pub document: Option<String>,
    pub value: Decimal,
    pub status: StatementStatus,
    #[serde(default)]
    pub receivable_id: Option<Uuid>,
    pub created_by_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receivable {
    pub id: Uuid,
    pub customer_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Net value after payment-method fees.
    pub value: Decimal,
    pub payment_method_id: Uuid,
    pub bank_account_id: Uuid,
    pub status: ReceivableStatus,
    pub payment_date: NaiveDate,
    #[serde(default)]
    pub receivable_group: Option<Uuid>,
    pub created_by_id: Uuid,
}

/// Fee and settlement terms attached to a payment method.
///
/// `payment_condition` is one of `immediate`, `Nx` (N monthly installments,
/// 1..=12) or `30/60/90`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethodTerms {
    pub id: Uuid,
    pub name: String,
    /// Percentage fee on the gross value.
    pub aliquot: Decimal,
    /// Flat fee deducted after the percentage fee.
    pub fixed_aliquot: Decimal,
    pub payment_condition: String,
    /// Days between the customer paying and the funds reaching the account.
    pub settlement_days: u32,
}
