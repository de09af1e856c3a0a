//! Dashboard state management for Pinboard.
//!
//! - [`DashboardController`]: optimistic local widget list with
//!   background persistence and remote change reconciliation.
//! - [`DashboardView`]: a controller kept live by one realtime
//!   subscription.
//! - [`DashboardDirectory`]: list, create, rename and delete a user's
//!   dashboards.

pub mod controller;
pub mod directory;
pub mod error;
pub mod view;

pub use controller::{DashboardController, PersistOutcome};
pub use directory::DashboardDirectory;
pub use error::DashboardError;
pub use view::{DashboardView, PersistKind, ViewChange};
