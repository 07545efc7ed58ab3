use std::sync::Arc;

use automanage_api::entities::{part, part_order, part_order_item, PartOrderStatus};
use automanage_api::errors::ServiceError;
use automanage_api::events::{self, Event};
use automanage_api::services::part_orders::{NewPartOrder, NewPartOrderItem, PartOrderService};
use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

fn sample_part(id: i32) -> part::Model {
    part::Model {
        id,
        part_code: format!("PC-{id:04}"),
        name: "Filtro de óleo".to_string(),
        description: None,
        price: dec!(85.90),
        stock_on_hand: 10,
        stock_minimum: 5,
        category: None,
        compatible_models: None,
    }
}

fn sample_order(id: i32, status: PartOrderStatus) -> part_order::Model {
    part_order::Model {
        id,
        order_date: Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap(),
        customer_name: "Oficina Central".to_string(),
        customer_tax_id: None,
        customer_phone: None,
        total_value: dec!(110.50),
        status,
        salesperson_id: None,
    }
}

fn sample_item(id: i32, order_id: i32, part_id: i32, quantity: i32) -> part_order_item::Model {
    part_order_item::Model {
        id,
        part_order_id: order_id,
        part_id,
        quantity,
        unit_price: dec!(50.00),
        subtotal: dec!(100.00),
    }
}

fn new_order(items: Vec<NewPartOrderItem>) -> NewPartOrder {
    NewPartOrder {
        customer_name: "Oficina Central".to_string(),
        customer_tax_id: None,
        customer_phone: None,
        salesperson_id: None,
        order_date: None,
        items,
    }
}

fn service(db: DatabaseConnection) -> (PartOrderService, tokio::sync::mpsc::Receiver<Event>) {
    let (events, rx) = events::channel(8);
    (PartOrderService::new(Arc::new(db), events), rx)
}

#[tokio::test]
async fn create_computes_line_subtotals_and_the_order_total() {
    let mut item2 = sample_item(2, 5, 2, 1);
    item2.unit_price = dec!(10.50);
    item2.subtotal = dec!(10.50);

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_part(1)], vec![sample_part(2)]])
        .append_query_results([vec![sample_order(5, PartOrderStatus::Pending)]])
        .append_query_results([vec![sample_item(1, 5, 1, 2)], vec![item2]])
        .into_connection();
    let (service, mut rx) = service(db);

    let details = service
        .create(new_order(vec![
            NewPartOrderItem {
                part_id: 1,
                quantity: 2,
                unit_price: dec!(50.00),
            },
            NewPartOrderItem {
                part_id: 2,
                quantity: 1,
                unit_price: dec!(10.50),
            },
        ]))
        .await
        .unwrap();

    assert_eq!(details.order.total_value, dec!(110.50));
    assert_eq!(details.order.status, PartOrderStatus::Pending);
    assert_eq!(details.items.len(), 2);
    assert!(matches!(
        rx.recv().await,
        Some(Event::PartOrderCreated { id: 5 })
    ));
}

#[tokio::test]
async fn an_order_without_items_is_rejected() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _rx) = service(db);

    let err = service.create(new_order(Vec::new())).await.unwrap_err();

    match err {
        ServiceError::InvalidInput(msg) => assert!(msg.contains("ao menos um item")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[tokio::test]
async fn a_non_positive_quantity_is_rejected_before_the_part_lookup() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let (service, _rx) = service(db);

    let err = service
        .create(new_order(vec![NewPartOrderItem {
            part_id: 1,
            quantity: 0,
            unit_price: dec!(50.00),
        }]))
        .await
        .unwrap_err();

    match err {
        ServiceError::InvalidInput(msg) => assert!(msg.contains("Quantidade")),
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unknown_part_fails_the_whole_order() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<part::Model>::new()])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service
        .create(new_order(vec![NewPartOrderItem {
            part_id: 999,
            quantity: 1,
            unit_price: dec!(50.00),
        }]))
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delivered_orders_admit_no_further_transition() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_order(5, PartOrderStatus::Delivered)]])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service
        .update_status(5, PartOrderStatus::Cancelled)
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InvalidInput(_));
}

#[tokio::test]
async fn a_status_change_reports_the_old_and_new_names() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_order(5, PartOrderStatus::Pending)]])
        .append_query_results([vec![sample_order(5, PartOrderStatus::Approved)]])
        .into_connection();
    let (service, mut rx) = service(db);

    let updated = service
        .update_status(5, PartOrderStatus::Approved)
        .await
        .unwrap();

    assert_eq!(updated.status, PartOrderStatus::Approved);
    assert!(matches!(
        rx.recv().await,
        Some(Event::PartOrderStatusChanged { id: 5, old, new })
            if old == "Pending" && new == "Approved"
    ));
}

#[tokio::test]
async fn removal_deletes_the_lines_with_the_order() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_order(5, PartOrderStatus::Cancelled)]])
        .append_exec_results([
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            },
            MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            },
        ])
        .into_connection();
    let (service, _rx) = service(db);

    service.remove(5).await.unwrap();
}
