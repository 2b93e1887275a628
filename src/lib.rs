pub mod auth;
pub mod error;
pub mod models;
pub mod notify; // booking emails
pub mod openapi;
pub mod rate_limit; // in-memory rate limiting
pub mod repo;
pub mod routes;
pub mod search;
pub mod security;
pub mod storage;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
