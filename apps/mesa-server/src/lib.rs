//! # Mesa Server
//!
//! HTTP server for the table-service account lifecycle.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Mesa Server                                    │
//! │                                                                         │
//! │  Tablet / cashier / kitchen ──► axum (/api) ──► AccountService          │
//! │                                                   │                     │
//! │                                       ┌───────────┴───────────┐         │
//! │                                       ▼                       ▼         │
//! │                                   mesa-core               mesa-db       │
//! │                                 (pure rules)            (SQLite)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config`]):
//! - `MESA_BIND_ADDR` - listen address (default: 0.0.0.0:8080)
//! - `MESA_DB_PATH` - SQLite database file
//! - `MESA_DB_MAX_CONNECTIONS` - pool size
//! - `MESA_CURRENCY_SYMBOL` - currency symbol reported on `/health`
//! - `MESA_MAX_SPLIT_SHARES` - venue cap on equal-split shares
//! - `RUST_LOG` - log filter (default: `info,mesa_server=debug,mesa_db=debug,mesa_core=debug,sqlx=warn`)

pub mod api;
pub mod config;
pub mod error;
pub mod scope;
pub mod services;
pub mod state;

// Re-exports
pub use api::router;
pub use config::{ConfigError, ServerConfig, DEFAULT_LOG_FILTER};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use scope::AccessScope;
pub use state::AppState;

