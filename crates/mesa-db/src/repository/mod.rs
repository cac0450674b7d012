//! # Repository Module
//!
//! Database repository implementations for Mesa POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AccountService                                                        │
//! │       │                                                                 │
//! │       │  db.accounts().save(&mut account, &[settlement])               │
//! │       ▼                                                                 │
//! │  AccountRepository                                                     │
//! │  ├── insert(&self, account)          (claims the tables)               │
//! │  ├── get(&self, id)                                                    │
//! │  ├── list_active(&self, tenant)                                        │
//! │  └── save(&self, account, new settlements)                             │
//! │       │   one transaction: version check + document + tables + ledger  │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`account::AccountRepository`] - Account documents and table occupancy
//! - [`settlement::SettlementRepository`] - Append-only payment ledger
//! - [`catalog::CatalogRepository`] - Read model of the product catalog

pub mod account;
pub mod catalog;
pub mod settlement;
