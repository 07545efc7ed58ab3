use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

/// Events emitted by the services after a successful commit. Consumers
/// (notifications, sync, reporting) subscribe through the receiver half.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    VehicleRegistered { chassis: String },
    VehicleRemoved { chassis: String },
    OwnerCreated { id: i32 },
    SaleRegistered { id: i32, vehicle_id: String },
    StockAdjusted { part_id: i32, new_stock: i32, low_stock: bool },
    PartOrderCreated { id: i32 },
    PartOrderStatusChanged { id: i32, old: String, new: String },
}

/// Sending half of the event pipeline.
///
/// Events are emitted after the mutation is committed, so a delivery
/// failure is logged and never turned into a business error.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    pub async fn send(&self, event: Event) {
        if let Err(e) = self.sender.send(event).await {
            warn!("event receiver dropped, discarding event: {}", e);
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(buffer: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(buffer);
    (EventSender::new(tx), rx)
}
