pub mod models;
pub mod wire;

pub use models::{AlertCategory, AlertRecord, AlertStatus, GeoPoint, Identity, Role};
pub use wire::{ClientCommand, ServerEvent};
