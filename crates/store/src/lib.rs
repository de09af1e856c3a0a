//! Record store clients for Pinboard.
//!
//! - [`RecordStore`]: the async, object-safe store contract.
//! - [`PocketBaseStore`]: REST + server-sent-events client for a
//!   PocketBase server, with automatic realtime reconnection.
//! - [`MemoryStore`]: in-process implementation for tests and offline use.
//! - [`collections`]: the `dashboards` and `widgets` column layouts.

pub mod collections;
pub mod error;
pub mod memory;
pub mod pocketbase;
pub mod realtime;
pub mod reconnect;
pub mod store;
pub mod subscription;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use pocketbase::PocketBaseStore;
pub use reconnect::ReconnectConfig;
pub use store::{Filter, ListQuery, RecordStore};
pub use subscription::Subscription;
