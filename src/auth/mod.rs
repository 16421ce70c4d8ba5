//! Authentication Module
//! Mission: Registration, login and route protection with bcrypt + JWT

pub mod api;
pub mod hasher;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod service;
pub mod user_store;

pub use hasher::CredentialHasher;
pub use jwt::TokenIssuer;
pub use middleware::{auth_middleware, AuthGuard, AuthGuardMode};
pub use service::AuthService;
pub use user_store::{InMemoryUserStore, SqliteUserStore, UserStore};
