//! Deliveries domain module: one batch's hand-off from distributor to retailer.

pub mod delivery;

pub use delivery::{Delivery, DeliveryStatus, NewDelivery};
