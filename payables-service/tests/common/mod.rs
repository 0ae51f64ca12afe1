#![allow(dead_code)]

use async_trait::async_trait;
use backoffice_core::error::AppError;
use backoffice_core::store::{self, Collection, Filter, MemoryStore, RecordStore};
use chrono::NaiveDate;
use payables_service::dtos::PaymentSpec;
use payables_service::models::{Frequency, Payment, SeriesType};
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

pub const ACTOR: Uuid = Uuid::from_u128(0xA11CE);

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("invalid test date")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("invalid test decimal")
}

pub fn single_spec(due: &str, value: &str) -> PaymentSpec {
    PaymentSpec {
        supplier_name: "Acme Ltd".to_string(),
        description: Some("office supplies".to_string()),
        value: dec(value),
        due_date: date(due),
        series_type: SeriesType::Single,
        installments: None,
        frequency: None,
        end_date: None,
    }
}

pub fn installments_spec(due: &str, value: &str, count: u32) -> PaymentSpec {
    PaymentSpec {
        series_type: SeriesType::Installments,
        installments: Some(count),
        ..single_spec(due, value)
    }
}

pub fn recurring_spec(due: &str, end: &str, value: &str, frequency: Frequency) -> PaymentSpec {
    PaymentSpec {
        series_type: SeriesType::Recurring,
        frequency: Some(frequency),
        end_date: Some(date(end)),
        ..single_spec(due, value)
    }
}

pub async fn seed(store: &dyn RecordStore, payments: &[Payment]) {
    store::insert_all(store, Collection::Payments, payments)
        .await
        .expect("failed to seed payments");
}

pub async fn all_payments(store: &dyn RecordStore) -> Vec<Payment> {
    store::find_as(store, Collection::Payments, &Filter::new())
        .await
        .expect("failed to list payments")
}

pub async fn group_payments(store: &dyn RecordStore, group: Uuid) -> Vec<Payment> {
    store::find_as(
        store,
        Collection::Payments,
        &Filter::new().eq("payment_group", group),
    )
    .await
    .expect("failed to list group payments")
}

/// A store that delegates to [`MemoryStore`] but fails `update` calls on a
/// collection once its budget runs out. Collections without a budget never
/// fail. Used to exercise the partial-application path of transitions.
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
