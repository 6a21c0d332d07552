pub mod account_service;
pub mod balance_service;
pub mod history_service;
pub mod import_service;
pub mod transaction_service;

pub use account_service::AccountService;
pub use balance_service::BalanceService;
pub use history_service::HistoryService;
pub use import_service::{ImportReport, ImportRow, ImportService, RowError};
pub use transaction_service::TransactionService;

use crate::errors::LedgerError;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failures a mutation can be rejected with. Nothing here is fatal: every
/// variant is returned to the caller with prior ledger state intact.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Consistency violation: {0}")]
    Consistency(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    Permission(String),
}
