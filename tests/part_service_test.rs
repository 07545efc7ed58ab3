use std::sync::Arc;

use assert_matches::assert_matches;
use automanage_api::entities::part::{self, DEFAULT_STOCK_MINIMUM};
use automanage_api::entities::part_order_item;
use automanage_api::errors::ServiceError;
use automanage_api::events::{self, Event};
use automanage_api::services::parts::{PartInput, PartService};
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

fn sample_part(id: i32, stock_on_hand: i32, stock_minimum: i32) -> part::Model {
    part::Model {
        id,
        part_code: format!("PC-{id:04}"),
        name: "Filtro de óleo".to_string(),
        description: None,
        price: dec!(85.90),
        stock_on_hand,
        stock_minimum,
        category: Some("Filtros".to_string()),
        compatible_models: Some("fh16,fm".to_string()),
    }
}

fn sample_input(part_code: &str, stock_on_hand: i32) -> PartInput {
    PartInput {
        part_code: part_code.to_string(),
        name: "Filtro de óleo".to_string(),
        description: None,
        price: dec!(85.90),
        stock_on_hand,
        stock_minimum: None,
        category: None,
        compatible_models: None,
    }
}

fn service(db: DatabaseConnection) -> (PartService, tokio::sync::mpsc::Receiver<Event>) {
    let (events, rx) = events::channel(8);
    (PartService::new(Arc::new(db), events), rx)
}

#[tokio::test]
async fn opposite_adjustments_restore_the_original_stock_level() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([
            vec![sample_part(1, 10, 5)],
            vec![sample_part(1, 15, 5)],
            vec![sample_part(1, 15, 5)],
            vec![sample_part(1, 10, 5)],
        ])
        .into_connection();
    let (service, _rx) = service(db);

    let after_add = service.adjust_stock(1, 5).await.unwrap();
    assert_eq!(after_add.stock_on_hand, 15);
    assert!(!after_add.low_stock);

    let after_remove = service.adjust_stock(1, -5).await.unwrap();
    assert_eq!(after_remove.stock_on_hand, 10);
}

#[tokio::test]
async fn a_withdrawal_past_zero_is_rejected_and_nothing_is_written() {
    // Only the lookup is queued; an attempted write would exhaust the mock
    // and surface as a database error instead of the named rejection.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1, 3, 5)]])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.adjust_stock(1, -4).await.unwrap_err();

    match err {
        ServiceError::NegativeStock(msg) => {
            assert!(msg.contains("Estoque não pode ser negativo"))
        }
        other => panic!("expected NegativeStock, got {other:?}"),
    }
}

#[tokio::test]
async fn a_withdrawal_to_exactly_zero_is_allowed_and_flags_low_stock() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1, 5, 5)], vec![sample_part(1, 0, 5)]])
        .into_connection();
    let (service, mut rx) = service(db);

    let status = service.adjust_stock(1, -5).await.unwrap();

    assert_eq!(status.stock_on_hand, 0);
    assert!(status.low_stock);
    assert!(matches!(
        rx.recv().await,
        Some(Event::StockAdjusted {
            part_id: 1,
            new_stock: 0,
            low_stock: true,
        })
    ));
}

#[tokio::test]
async fn stock_above_the_minimum_does_not_flag_low_stock() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1, 10, 5)], vec![sample_part(1, 12, 5)]])
        .into_connection();
    let (service, _rx) = service(db);

    let status = service.adjust_stock(1, 2).await.unwrap();
    assert!(!status.low_stock);
}

#[tokio::test]
async fn create_rejects_a_duplicate_part_code() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1, 10, 5)]])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.create(sample_input("PC-0001", 10)).await.unwrap_err();

    match err {
        ServiceError::DuplicateKey(msg) => assert!(msg.contains("Código de peça")),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[tokio::test]
async fn create_rejects_a_negative_initial_stock() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _rx) = service(db);

    let err = service.create(sample_input("PC-0002", -1)).await.unwrap_err();

    assert_matches!(err, ServiceError::NegativeStock(_));
}

#[tokio::test]
async fn create_defaults_the_reorder_threshold() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<part::Model>::new()])
        .append_query_results([vec![sample_part(1, 10, DEFAULT_STOCK_MINIMUM)]])
        .into_connection();
    let (service, _rx) = service(db);

    let created = service.create(sample_input("PC-0001", 10)).await.unwrap();
    assert_eq!(created.stock_minimum, DEFAULT_STOCK_MINIMUM);
}

#[tokio::test]
async fn removal_is_blocked_while_order_lines_reference_the_part() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1, 10, 5)]])
        .append_query_results([vec![part_order_item::Model {
            id: 1,
            part_order_id: 1,
            part_id: 1,
            quantity: 2,
            unit_price: dec!(85.90),
            subtotal: dec!(171.80),
        }]])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.remove(1).await.unwrap_err();

    match err {
        ServiceError::InvalidInput(msg) => assert!(msg.contains("pedidos registrados")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}
