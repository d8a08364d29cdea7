#![doc = "The `taskboard` library crate."]
#![doc = ""]
#![doc = "Accounts with salted password hashes and signed session tokens, owner-scoped"]
#![doc = "task CRUD with filtering, sorting and pagination, and per-user task statistics."]
#![doc = "The binary (`main.rs`) wires these into an actix-web server via `routes::config`."]

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

pub use crate::config::Config;
pub use crate::error::AppError;
pub use crate::state::AppState;
