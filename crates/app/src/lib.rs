//! Pinboard application shell: configuration, user-facing messages, and
//! the loop that keeps an opened dashboard live.

pub mod config;
pub mod messages;
pub mod shell;
