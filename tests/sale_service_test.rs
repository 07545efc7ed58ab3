use std::sync::Arc;

use automanage_api::entities::{sale, salesperson, vehicle};
use automanage_api::errors::ServiceError;
use automanage_api::events::{self, Event};
use automanage_api::services::sales::{NewSale, SaleService};
use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

fn sample_vehicle(chassis: &str) -> vehicle::Model {
    vehicle::Model {
        chassis: chassis.to_string(),
        model: "FM".to_string(),
        year: 2023,
        color: None,
        price: dec!(100000.00),
        mileage: 45000,
        equipment: None,
        engine_version: None,
        application: None,
        owner_id: None,
    }
}

fn sample_salesperson(id: i32) -> salesperson::Model {
    salesperson::Model {
        id,
        name: "Carlos".to_string(),
        base_salary: dec!(3000.00),
    }
}

fn sample_sale(id: i32, vehicle_id: &str, salesperson_id: i32) -> sale::Model {
    sale::Model {
        id,
        vehicle_id: vehicle_id.to_string(),
        salesperson_id,
        sale_date: Utc.with_ymd_and_hms(2026, 2, 15, 10, 30, 0).unwrap(),
        final_price: dec!(100000.00),
    }
}

fn new_sale(vehicle_id: &str) -> NewSale {
    NewSale {
        vehicle_id: vehicle_id.to_string(),
        salesperson_id: 1,
        sale_date: None,
        final_price: dec!(100000.00),
    }
}

fn service(db: DatabaseConnection) -> (SaleService, tokio::sync::mpsc::Receiver<Event>) {
    let (events, rx) = events::channel(8);
    (SaleService::new(Arc::new(db), events), rx)
}

#[tokio::test]
async fn selling_an_available_vehicle_succeeds() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_vehicle("CHASSI123")]])
        .append_query_results([vec![sample_salesperson(1)]])
        .append_query_results([Vec::<sale::Model>::new()])
        .append_query_results([vec![sample_sale(42, "CHASSI123", 1)]])
        .into_connection();
    let (service, mut rx) = service(db);

    let details = service.register(new_sale("CHASSI123")).await.unwrap();

    assert_eq!(details.sale.id, 42);
    assert_eq!(details.sale.vehicle_id, "CHASSI123");
    assert!(details.vehicle.is_some());
    assert!(details.salesperson.is_some());
    assert!(matches!(
        rx.recv().await,
        Some(Event::SaleRegistered { id: 42, .. })
    ));
}

#[tokio::test]
async fn selling_the_same_vehicle_twice_reports_already_sold() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_vehicle("CHASSI123")]])
        .append_query_results([vec![sample_salesperson(1)]])
        .append_query_results([vec![sample_sale(42, "CHASSI123", 1)]])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.register(new_sale("CHASSI123")).await.unwrap_err();

    match err {
        ServiceError::AlreadySold(msg) => assert!(msg.contains("já foi vendido")),
        other => panic!("expected AlreadySold, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unknown_vehicle_fails_before_any_other_check() {
    // Only the vehicle lookup is queued; reaching the salesperson lookup
    // would exhaust the mock and surface as a database error instead.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<vehicle::Model>::new()])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.register(new_sale("FANTASMA")).await.unwrap_err();

    match err {
        ServiceError::NotFound(msg) => assert!(msg.contains("Veículo não encontrado")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn an_unknown_salesperson_is_reported_after_the_vehicle_check() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_vehicle("CHASSI123")]])
        .append_query_results([Vec::<salesperson::Model>::new()])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service.register(new_sale("CHASSI123")).await.unwrap_err();

    match err {
        ServiceError::NotFound(msg) => assert!(msg.contains("Vendedor não encontrado")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn a_non_positive_price_is_rejected_before_the_insert() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_vehicle("CHASSI123")]])
        .append_query_results([vec![sample_salesperson(1)]])
        .append_query_results([Vec::<sale::Model>::new()])
        .into_connection();
    let (service, _rx) = service(db);

    let err = service
        .register(NewSale {
            final_price: dec!(0),
            ..new_sale("CHASSI123")
        })
        .await
        .unwrap_err();

    match err {
        ServiceError::InvalidInput(msg) => {
            assert!(msg.contains("Valor final deve ser maior que zero"))
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[tokio::test]
async fn an_explicit_sale_date_is_kept() {
    let stamped = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
    let mut expected = sample_sale(7, "CHASSI777", 1);
    expected.sale_date = stamped;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![sample_vehicle("CHASSI777")]])
        .append_query_results([vec![sample_salesperson(1)]])
        .append_query_results([Vec::<sale::Model>::new()])
        .append_query_results([vec![expected]])
        .into_connection();
    let (service, _rx) = service(db);

    let details = service
        .register(NewSale {
            sale_date: Some(stamped),
            ..new_sale("CHASSI777")
        })
        .await
        .unwrap();

    assert_eq!(details.sale.sale_date, stamped);
}
