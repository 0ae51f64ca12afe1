#![allow(dead_code)]

use async_trait::async_trait;
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, MemoryStore, RecordStore};
use chrono::NaiveDate;
use reconciliation_service::dtos::FreshEntry;
use reconciliation_service::models::{
    BankStatementEntry, Direction, PaymentMethodTerms, Receivable, ReceivableStatus,
    ReconciliationStatement, ReconciliationStatus, StatementStatus,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const ACTOR: Uuid = Uuid::from_u128(0xA11CE);
pub const ACCOUNT: Uuid = Uuid::from_u128(0xBA2C);

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("invalid test date")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("invalid test decimal")
}

pub fn fresh_entry(day: &str, description: &str, document: &str, value: &str) -> FreshEntry {
    FreshEntry {
        transaction_date: date(day),
        value_date: Some(date(day)),
        direction: Direction::Debit,
        description: description.to_string(),
        document: Some(document.to_string()),
        value: dec(value),
        api_payload: None,
    }
}

pub fn internal_statement(
    day: &str,
    value: &str,
    direction: Direction,
) -> ReconciliationStatement {
    ReconciliationStatement {
        id: Uuid::new_v4(),
        bank_account_id: ACCOUNT,
        transaction_date: date(day),
        value_date: Some(date(day)),
        direction,
        description: "internal entry".to_string(),
        document: None,
        value: dec(value),
        status: ReconciliationStatus::Pending,
        bank_statement_id: None,
        api_payload: None,
        created_by_id: ACTOR,
    }
}

pub fn bank_entry(day: &str, value: &str, direction: Direction) -> BankStatementEntry {
    BankStatementEntry {
        id: Uuid::new_v4(),
        bank_account_id: ACCOUNT,
        transaction_date: date(day),
        value_date: Some(date(day)),
        direction,
        description: "bank entry".to_string(),
        document: None,
        value: dec(value),
        status: StatementStatus::Pending,
        receivable_id: None,
        created_by_id: ACTOR,
    }
}

pub fn payment_method(
    condition: &str,
    aliquot: &str,
    fixed_aliquot: &str,
    settlement_days: u32,
) -> PaymentMethodTerms {
    PaymentMethodTerms {
        id: Uuid::new_v4(),
        name: format!("card {}", condition),
        aliquot: dec(aliquot),
        fixed_aliquot: dec(fixed_aliquot),
        payment_condition: condition.to_string(),
        settlement_days,
    }
}

pub async fn seed<T: serde::Serialize>(store: &dyn RecordStore, collection: Collection, rows: &[T]) {
    store::insert_all(store, collection, rows)
        .await
        .expect("failed to seed rows");
}

pub async fn all_statements(store: &dyn RecordStore) -> Vec<ReconciliationStatement> {
    store::find_as(store, Collection::ReconciliationStatements, &Filter::new())
        .await
        .expect("failed to list reconciliation statements")
}

pub async fn all_bank_entries(store: &dyn RecordStore) -> Vec<BankStatementEntry> {
    store::find_as(store, Collection::BankStatements, &Filter::new())
        .await
        .expect("failed to list bank statements")
}

pub async fn all_receivables(store: &dyn RecordStore) -> Vec<Receivable> {
    store::find_as(store, Collection::Receivables, &Filter::new())
        .await
        .expect("failed to list receivables")
}

pub fn received(receivables: &[Receivable]) -> usize {
    receivables
        .iter()
        .filter(|r| r.status == ReceivableStatus::Received)
        .count()
}

/// A store that delegates to [`MemoryStore`] but fails `update` calls on a
/// collection once its budget runs out. Collections without a budget never
/// fail. Used to exercise rollback and partial-application paths.
pub struct FlakyStore {
    inner: MemoryStore,
    update_budget: Mutex<HashMap<Collection, usize>>,
}

impl FlakyStore {
    pub fn new(update_budget: &[(Collection, usize)]) -> Self {
        Self {
            inner: MemoryStore::new(),
            update_budget: Mutex::new(update_budget.iter().copied().collect()),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

#[async_trait]
impl RecordStore for FlakyStore {
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, AppError> {
        self.inner.find(collection, filter).await
    }

    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Value, AppError> {
        self.inner.find_one(collection, filter).await
    }

    async fn insert(
        &self,
        collection: Collection,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        self.inner.insert(collection, rows).await
    }

    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, AppError> {
        let mut budget = self.update_budget.lock().await;
        if let Some(remaining) = budget.get_mut(&collection) {
            if *remaining == 0 {
                return Err(AppError::StoreError(anyhow::anyhow!(
                    "injected update failure on {}",
                    collection
                )));
            }
            *remaining -= 1;
        }
        drop(budget);
        self.inner.update(collection, filter, patch).await
    }

    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, AppError> {
        self.inner.delete(collection, filter).await
    }
}
