pub mod owner;
pub mod part;
pub mod part_order;
pub mod part_order_item;
pub mod sale;
pub mod salesperson;
pub mod vehicle;

pub use part_order::PartOrderStatus;
