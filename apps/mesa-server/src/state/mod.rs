//! # State Module
//!
//! Shared state handed to every handler.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────────────┐  ┌──────────────────┐  │
//! │  │   Database   │  │     AccountService       │  │  ServerConfig    │  │
//! │  │              │  │                          │  │                  │  │
//! │  │  SQLite pool │  │  AccountLocks (per id)   │  │  bind address    │  │
//! │  │  (health)    │  │  Catalog                 │  │  currency        │  │
//! │  └──────────────┘  └──────────────────────────┘  └──────────────────┘  │
//! │                                                                         │
//! │  THREAD SAFETY:                                                        │
//! │  • Database: internal connection pool                                  │
//! │  • AccountService: per-account tokio mutexes, no global lock           │
//! │  • ServerConfig: read-only after startup                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod locks;

pub use locks::{AccountGuard, AccountLocks};

use std::sync::Arc;

use mesa_db::Database;

use crate::config::ServerConfig;
use crate::services::{AccountService, Catalog, DbCatalog};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<ServerConfig>,
    pub accounts: AccountService,
}

impl AppState {
    /// State backed by the database's own catalog read model.
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let catalog = Arc::new(DbCatalog::new(db.catalog()));
        AppState::with_catalog(db, config, catalog)
    }

    pub fn with_catalog(db: Database, config: ServerConfig, catalog: Arc<dyn Catalog>) -> Self {
        let accounts = AccountService::new(db.clone(), catalog, config.max_split_shares);
        AppState {
            db,
            config: Arc::new(config),
            accounts,
        }
    }
}
