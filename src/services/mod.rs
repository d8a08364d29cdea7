//! Account, task and statistics operations.
//!
//! Handlers in `routes` stay thin: they extract the caller and the payload and
//! call into here. Everything below talks to storage only through `AppState`.

pub mod accounts;
pub mod stats;
pub mod tasks;
