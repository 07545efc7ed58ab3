pub mod owners;
pub mod part_orders;
pub mod parts;
pub mod sales;
pub mod salespeople;
pub mod vehicles;

use std::sync::Arc;

use crate::db::DbPool;
use crate::events::EventSender;

/// All services wired over a single connection pool and event channel.
/// The embedding application builds one of these and hands out clones.
#[derive(Clone)]
pub struct AppServices {
    pub vehicles: vehicles::VehicleService,
    pub owners: owners::OwnerService,
    pub salespeople: salespeople::SalespersonService,
    pub sales: sales::SaleService,
    pub parts: parts::PartService,
    pub part_orders: part_orders::PartOrderService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, events: EventSender) -> Self {
        Self {
            vehicles: vehicles::VehicleService::new(db.clone(), events.clone()),
            owners: owners::OwnerService::new(db.clone(), events.clone()),
            salespeople: salespeople::SalespersonService::new(db.clone()),
            sales: sales::SaleService::new(db.clone(), events.clone()),
            parts: parts::PartService::new(db.clone(), events.clone()),
            part_orders: part_orders::PartOrderService::new(db, events),
        }
    }
}
