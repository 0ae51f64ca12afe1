//! Record Store Adapter: generic transactional CRUD over named collections.
//!
//! Core services never touch a storage engine directly. They speak this
//! trait, which is implemented by an in-memory fake ([`MemoryStore`], used by
//! tests and as the default backend) and a Postgres/JSONB backend
//! ([`PgStore`]). Rows are JSON objects carrying an `id` field; typed access
//! goes through the serde helpers below.

mod filter;
mod memory;
mod postgres;

pub use filter::{Condition, Filter, FilterOp};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// The record collections known to the back office.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Payments,
    PaymentMethods,
    Receivables,
    BankStatements,
    ReconciliationStatements,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Payments => "payments",
            Self::PaymentMethods => "payment_methods",
            Self::Receivables => "receivables",
            Self::BankStatements => "bank_statements",
            Self::ReconciliationStatements => "reconciliation_statements",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Return every row matching the filter, in insertion order.
    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, AppError>;

    /// Return the first row matching the filter, or `NotFound`.
    async fn find_one(&self, collection: Collection, filter: &Filter) -> Result<Value, AppError>;

    /// Append rows to the collection and return them as stored.
    async fn insert(&self, collection: Collection, rows: Vec<Value>) -> Result<Vec<Value>, AppError>;

    /// Shallow-merge `patch` into every matching row; returns the updated rows.
    async fn update(
        &self,
        collection: Collection,
        filter: &Filter,
        patch: Value,
    ) -> Result<Vec<Value>, AppError>;

    /// Delete every matching row; returns the number of rows removed.
    async fn delete(&self, collection: Collection, filter: &Filter) -> Result<u64, AppError>;
}

/// Fetch and deserialize every matching row.
pub async fn find_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &Filter,
) -> Result<Vec<T>, AppError> {
    store
        .find(collection, filter)
        .await?
        .into_iter()
        .map(|row| from_row(collection, row))
        .collect()
}

/// Fetch and deserialize the first matching row, or `NotFound`.
pub async fn find_one_as<T: DeserializeOwned>(
    store: &dyn RecordStore,
    collection: Collection,
    filter: &Filter,
) -> Result<T, AppError> {
    let row = store.find_one(collection, filter).await?;
    from_row(collection, row)
}

/// Serialize records and insert them in one call.
pub async fn insert_all<T: Serialize>(
    store: &dyn RecordStore,
    collection: Collection,
    records: &[T],
) -> Result<(), AppError> {
    let rows = records
        .iter()
        .map(to_row)
        .collect::<Result<Vec<_>, _>>()?;
    store.insert(collection, rows).await?;
    Ok(())
}

pub fn to_row<T: Serialize>(record: &T) -> Result<Value, AppError> {
    serde_json::to_value(record)
        .map_err(|e| AppError::StoreError(anyhow::anyhow!("failed to serialize record: {}", e)))
}

fn from_row<T: DeserializeOwned>(collection: Collection, row: Value) -> Result<T, AppError> {
    serde_json::from_value(row).map_err(|e| {
        AppError::StoreError(anyhow::anyhow!("malformed {} row: {}", collection, e))
    })
}
