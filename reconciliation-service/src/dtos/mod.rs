use crate::models::{
    BankStatementEntry, Direction, Receivable, ReconciliationStatement,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

/// One externally fetched statement row, before it is deduplicated and
/// recorded. Carries no identity or status yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreshEntry {
    pub transaction_date: NaiveDate,
    #[serde(default)]
    pub value_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub description: String,
    #[serde(default)]
    pub document: Option<String>,
    pub value: Decimal,
    #[serde(default)]
    pub api_payload: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct SyncRequest {
    pub entries: Vec<FreshEntry>,
    /// When the account was last synced; bounds the dedupe lookback.
    #[serde(default)]
    pub last_sync: Option<NaiveDate>,
    pub created_by_id: Uuid,
}

#[derive(Serialize)]
pub struct SyncResponse {
    pub inserted: u64,
}

/// One pending internal entry with every external entry that matches it
/// within tolerance. Zero candidates is a valid (and reportable) outcome.
#[derive(Debug, Serialize)]
pub struct MatchProposal {
    pub internal: ReconciliationStatement,
    pub candidates: Vec<BankStatementEntry>,
}

#[derive(Serialize)]
pub struct CandidatesResponse {
    pub proposals: Vec<MatchProposal>,
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub reconciliation_statement_id: Uuid,
    pub bank_statement_id: Uuid,
}

#[derive(Serialize)]
pub struct CommitResponse {
    pub reconciliation_statement: ReconciliationStatement,
    pub bank_statement: BankStatementEntry,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReceivableRequest {
    #[validate(length(min = 1))]
    pub customer_name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Gross value; payment-method fees are deducted on creation.
    pub value: Decimal,
    pub payment_method_id: Uuid,
    pub bank_account_id: Uuid,
    pub payment_date: NaiveDate,
    pub created_by_id: Uuid,
}

#[derive(Serialize)]
pub struct ReceivablesResponse {
    pub receivables: Vec<Receivable>,
}

#[derive(Serialize)]
pub struct SettleResponse {
    pub settled: u64,
}
