//! Timewarp Backend Library
//!
//! Accounts, destinations catalogue, feedback mail and health probes behind
//! an axum router. The binary in `main.rs` wires these to the environment;
//! integration tests build the same router against an in-memory database.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod destinations;
pub mod error;
pub mod feedback;
pub mod middleware;
pub mod seeder;
pub mod server;
pub mod timewarp;

pub use config::AppConfig;
pub use error::ApiError;
pub use server::{build_router, AppState};
