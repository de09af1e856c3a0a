//! Pinboard record events.
//!
//! - [`Record`]: a collection row as the store returns it.
//! - [`RecordEvent`]: one create, update or delete on a collection.
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, used by the in-memory store to feed
//!   subscriptions.

pub mod bus;
pub mod record;

pub use bus::{EventBus, StoreEvent};
pub use record::{Record, RecordAction, RecordEvent};
