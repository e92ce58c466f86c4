//! Real-time alert synchronization client.
//!
//! Keeps a local collection of emergency alert records consistent with a
//! remote dispatch service over one persistent WebSocket. The client owns
//! the connection lifecycle (including fixed-delay reconnects), binds the
//! active identity to the link, keeps a geocell-derived subscription set in
//! sync as the device moves, and folds pushed events into an ordered,
//! id-keyed collection. UI layers observe changes through named event
//! channels on the bus.

pub mod bus;
pub mod config;
mod connection;
pub mod notify;
pub mod reconcile;
pub mod subscription;

pub use bus::{Channel, EventBus, ObserverId, SyncEvent};
pub use config::ClientConfig;
pub use connection::{ConnectionState, SyncClient};
pub use notify::Notification;
pub use reconcile::AlertCollection;
