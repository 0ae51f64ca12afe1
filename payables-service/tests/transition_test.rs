mod common;

use backoffice_core::error::AppError;
use backoffice_core::store::{Collection, MemoryStore};
use common::*;
use payables_service::models::{Frequency, Payment, PaymentStatus, SeriesType};
use payables_service::services::{generator, transition::transition_payment_series};

fn by_index(payments: &[Payment], index: u32) -> &Payment {
    payments
        .iter()
        .find(|p| p.installment_number == Some(index))
        .expect("missing installment index")
}

async fn seed_installments(store: &MemoryStore, due: &str, count: u32) -> Vec<Payment> {
    let payments = generator::expand(&installments_spec(due, "100.00", count), ACTOR, None)
        .expect("expand failed");
    seed(store, &payments).await;
    payments
}

#[tokio::test]
async fn single_to_single_updates_in_place() {
    let store = MemoryStore::new();
    let original = generator::expand(&single_spec("2024-03-10", "150.00"), ACTOR, None)
        .expect("expand failed");
    seed(&store, &original).await;

    let mut new_spec = single_spec("2024-04-01", "175.50");
    new_spec.supplier_name = "New Supplier".to_string();
    let result = transition_payment_series(&store, original[0].id, &new_spec, date("2024-03-01"))
        .await
        .expect("transition failed");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].id, original[0].id);
    assert_eq!(result[0].supplier_name, "New Supplier");
    assert_eq!(result[0].value, dec("175.50"));
    assert_eq!(result[0].due_date, date("2024-04-01"));
    assert_eq!(result[0].status, PaymentStatus::Scheduled);
    assert_eq!(all_payments(&store).await.len(), 1);
}

#[tokio::test]
async fn installments_reshape_extends_series() {
    let store = MemoryStore::new();
    let original = seed_installments(&store, "2024-01-15", 3).await;
    let edited = by_index(&original, 2);

    let result = transition_payment_series(
        &store,
        edited.id,
        &installments_spec("2024-02-15", "100.00", 5),
        date("2024-01-01"),
    )
    .await
    .expect("transition failed");

    assert_eq!(result.len(), 5);
    let mut indices: Vec<_> = result.iter().filter_map(|p| p.installment_number).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert!(result.iter().all(|p| p.installments == Some(5)));
    assert!(result
        .iter()
        .all(|p| p.payment_group == original[0].payment_group));
}

#[tokio::test]
async fn shrink_below_settled_count_conflicts_and_leaves_rows() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&installments_spec("2024-01-15", "100.00", 6), ACTOR, None)
        .expect("expand failed");
    original[2].status = PaymentStatus::Paid;
    seed(&store, &original).await;

    let edited = by_index(&original, 2);
    let err = transition_payment_series(
        &store,
        edited.id,
        &installments_spec("2024-02-15", "100.00", 2),
        date("2024-01-01"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let rows = all_payments(&store).await;
    assert_eq!(rows.len(), 6);
    assert!(rows.iter().all(|p| p.installments == Some(6)));
}

#[tokio::test]
async fn settled_installment_inside_rewrite_window_conflicts() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&installments_spec("2024-01-15", "100.00", 3), ACTOR, None)
        .expect("expand failed");
    original[1].status = PaymentStatus::Paid; // #2, due 2024-02-15
    seed(&store, &original).await;

    // Editing #1 would rewrite the whole group, including the paid row.
    let edited = by_index(&original, 1);
    let err = transition_payment_series(
        &store,
        edited.id,
        &installments_spec("2024-01-15", "100.00", 3),
        date("2024-01-01"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let rows = all_payments(&store).await;
    assert_eq!(rows.len(), 3);
    let mut indices: Vec<_> = rows.iter().filter_map(|p| p.installment_number).collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2, 3]);
}

#[tokio::test]
async fn settled_recurring_row_inside_rewrite_window_conflicts() {
    let store = MemoryStore::new();
    let spec = recurring_spec("2024-01-01", "2024-04-01", "80.00", Frequency::Monthly);
    let mut original = generator::expand(&spec, ACTOR, None).expect("expand failed");
    original[2].status = PaymentStatus::Paid; // due 2024-03-01
    seed(&store, &original).await;

    let edited = &original[1]; // 2024-02-01
    let err = transition_payment_series(
        &store,
        edited.id,
        &recurring_spec("2024-02-15", "2024-04-15", "95.00", Frequency::Monthly),
        date("2024-02-01"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    let rows = all_payments(&store).await;
    assert_eq!(rows.len(), 4);
    let mut dates: Vec<_> = rows.iter().map(|p| p.due_date).collect();
    dates.sort_unstable();
    dates.dedup();
    assert_eq!(dates.len(), rows.len());
}

#[tokio::test]
async fn conversion_with_settled_row_in_window_conflicts() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&installments_spec("2024-01-15", "100.00", 3), ACTOR, None)
        .expect("expand failed");
    original[2].status = PaymentStatus::Paid; // #3, due 2024-03-15
    seed(&store, &original).await;

    let edited = by_index(&original, 1);
    let err = transition_payment_series(
        &store,
        edited.id,
        &recurring_spec("2024-02-01", "2024-06-01", "90.00", Frequency::Monthly),
        date("2024-02-01"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(all_payments(&store).await.len(), 3);
}

#[tokio::test]
async fn failure_after_delete_surfaces_partial_application() {
    // No update budget on payments: the recount after the tail insert fails.
    let store = FlakyStore::new(&[(Collection::Payments, 0)]);
    let original = generator::expand(&installments_spec("2024-01-15", "100.00", 3), ACTOR, None)
        .expect("expand failed");
    seed(&store, &original).await;

    let edited = by_index(&original, 2);
    let err = transition_payment_series(
        &store,
        edited.id,
        &installments_spec("2024-02-15", "100.00", 5),
        date("2024-01-01"),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::PartialApplication(_)));
    // The tail landed but the recount did not: the group is half-rewritten.
    let rows = all_payments(store.inner()).await;
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().any(|p| p.installments == Some(3)));
}

#[tokio::test]
async fn installments_round_trip_restores_due_dates() {
    let store = MemoryStore::new();
    let original = seed_installments(&store, "2024-01-15", 3).await;
    let original_dates: Vec<_> = original.iter().map(|p| p.due_date).collect();
    let first = by_index(&original, 1);

    transition_payment_series(
        &store,
        first.id,
        &installments_spec("2024-01-15", "100.00", 5),
        date("2024-01-01"),
    )
    .await
    .expect("grow failed");

    let grown = all_payments(&store).await;
    assert_eq!(grown.len(), 5);
    let first = by_index(&grown, 1);

    transition_payment_series(
        &store,
        first.id,
        &installments_spec("2024-01-15", "100.00", 3),
        date("2024-01-01"),
    )
    .await
    .expect("shrink failed");

    let restored = all_payments(&store).await;
    let mut dates: Vec<_> = restored.iter().map(|p| p.due_date).collect();
    dates.sort_unstable();
    assert_eq!(dates, original_dates);
}

#[tokio::test]
async fn installments_to_single_converts_and_recounts_survivors() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&installments_spec("2024-01-15", "100.00", 4), ACTOR, None)
        .expect("expand failed");
    original[0].status = PaymentStatus::Paid;
    seed(&store, &original).await;
    let group = original[0].payment_group.expect("missing group");

    let edited = by_index(&original, 2);
    let result = transition_payment_series(
        &store,
        edited.id,
        &single_spec("2024-02-20", "250.00"),
        date("2024-02-01"),
    )
    .await
    .expect("transition failed");

    assert_eq!(result.len(), 1);
    let converted = &result[0];
    assert_eq!(converted.id, edited.id);
    assert_eq!(converted.series_type, SeriesType::Single);
    assert!(converted.payment_group.is_none());
    assert!(converted.installment_number.is_none());
    assert!(converted.installments.is_none());

    // Only the settled first installment keeps the group, now a 1-long series.
    let survivors = group_payments(&store, group).await;
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].installment_number, Some(1));
    assert_eq!(survivors[0].installments, Some(1));
    assert_eq!(all_payments(&store).await.len(), 2);
}

#[tokio::test]
async fn installments_to_recurring_starts_today_under_new_group() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&installments_spec("2024-01-15", "100.00", 3), ACTOR, None)
        .expect("expand failed");
    original[0].status = PaymentStatus::Paid;
    seed(&store, &original).await;
    let old_group = original[0].payment_group.expect("missing group");

    let edited = by_index(&original, 2);
    let result = transition_payment_series(
        &store,
        edited.id,
        &recurring_spec("2024-02-15", "2024-08-01", "90.00", Frequency::Monthly),
        date("2024-06-01"),
    )
    .await
    .expect("transition failed");

    // Forward-looking series starts today, not at the edited due date.
    assert_eq!(result[0].due_date, date("2024-06-01"));
    assert_eq!(result.len(), 3);
    assert!(result.iter().all(|p| p.series_type == SeriesType::Recurring));
    assert!(result.iter().all(|p| p.payment_group != Some(old_group)));

    let old_rows = group_payments(&store, old_group).await;
    assert_eq!(old_rows.len(), 1);
    assert_eq!(old_rows[0].installments, Some(1));
}

#[tokio::test]
async fn recurring_reshape_replaces_tail_in_same_group() {
    let store = MemoryStore::new();
    let spec = recurring_spec("2024-01-01", "2024-04-01", "80.00", Frequency::Monthly);
    let original = generator::expand(&spec, ACTOR, None).expect("expand failed");
    seed(&store, &original).await;
    let group = original[0].payment_group.expect("missing group");

    let edited = &original[1]; // 2024-02-01
    let result = transition_payment_series(
        &store,
        edited.id,
        &recurring_spec("2024-02-15", "2024-03-15", "95.00", Frequency::Biweekly),
        date("2024-02-01"),
    )
    .await
    .expect("transition failed");

    assert!(result.iter().all(|p| p.payment_group == Some(group)));
    let rows = all_payments(&store).await;
    let mut dates: Vec<_> = rows.iter().map(|p| p.due_date).collect();
    dates.sort_unstable();
    assert_eq!(
        dates,
        vec![
            date("2024-01-01"),
            date("2024-02-15"),
            date("2024-02-29"),
            date("2024-03-14"),
        ]
    );
}

#[tokio::test]
async fn recurring_to_single_replaces_future_rows() {
    let store = MemoryStore::new();
    let spec = recurring_spec("2024-01-01", "2024-03-01", "80.00", Frequency::Monthly);
    let original = generator::expand(&spec, ACTOR, None).expect("expand failed");
    seed(&store, &original).await;

    let edited = &original[1]; // 2024-02-01
    let result = transition_payment_series(
        &store,
        edited.id,
        &single_spec("2024-02-10", "200.00"),
        date("2024-02-01"),
    )
    .await
    .expect("transition failed");

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].series_type, SeriesType::Single);

    let rows = all_payments(&store).await;
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().any(|p| p.due_date == date("2024-01-01")));
    assert!(rows.iter().any(|p| p.due_date == date("2024-02-10")));
}

#[tokio::test]
async fn single_to_installments_supersedes_original() {
    let store = MemoryStore::new();
    let original = generator::expand(&single_spec("2024-03-10", "300.00"), ACTOR, None)
        .expect("expand failed");
    seed(&store, &original).await;

    let result = transition_payment_series(
        &store,
        original[0].id,
        &installments_spec("2024-04-01", "100.00", 3),
        date("2024-03-01"),
    )
    .await
    .expect("transition failed");

    assert_eq!(result.len(), 3);
    let rows = all_payments(&store).await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|p| p.id != original[0].id));
}

#[tokio::test]
async fn terminal_payment_cannot_be_edited() {
    let store = MemoryStore::new();
    let mut original = generator::expand(&single_spec("2024-03-10", "150.00"), ACTOR, None)
        .expect("expand failed");
    original[0].status = PaymentStatus::Canceled;
    seed(&store, &original).await;

    let err = transition_payment_series(
        &store,
        original[0].id,
        &single_spec("2024-04-01", "100.00"),
        date("2024-03-01"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn missing_payment_is_not_found() {
    let store = MemoryStore::new();
    let err = transition_payment_series(
        &store,
        uuid::Uuid::new_v4(),
        &single_spec("2024-04-01", "100.00"),
        date("2024-03-01"),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
