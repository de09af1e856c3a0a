//! Pinboard domain core.
//!
//! Pure, synchronous building blocks shared by the store client, the
//! dashboard controller and the application shell: the grid layout
//! engine, the collision resolver, widget and dashboard models, the
//! pointer gesture state machines, and the per-type content editors.
//!
//! Nothing in this crate performs I/O.

pub mod collision;
pub mod content;
pub mod dashboard;
pub mod error;
pub mod geometry;
pub mod gesture;
pub mod grid;
pub mod types;
pub mod widget;
