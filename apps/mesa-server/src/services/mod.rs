//! # Services
//!
//! The account lifecycle controller and its collaborators.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AccountService                                                         │
//! │    ├── AccountLocks     one writer per account                          │
//! │    ├── Catalog          product lookup at order-add time                │
//! │    └── Database         documents + settlement ledger                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `ServiceError` keeps the two failure sources apart: business-rule
//! rejections pass through to the client as they are, storage failures are
//! logged and reported generically by the API layer.

pub mod account;
pub mod catalog;

pub use account::{
    AccountService, OpenAccountInput, OrderLineInput, PaymentReceipt, StatsQuery,
};
pub use catalog::{Catalog, DbCatalog};

use mesa_core::{CoreError, ErrorKind, ValidationError};
use mesa_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Business-rule rejection from mesa-core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Storage failure from mesa-db.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl ServiceError {
    /// Error class of a business-rule rejection; `None` for storage errors.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Core(e) => Some(e.kind()),
            ServiceError::Db(_) => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::Core(err.into())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
