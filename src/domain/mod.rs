pub mod account;
pub mod common;
pub mod transaction;

pub use account::{Account, AccountKind, BalanceSnapshot};
pub use common::Displayable;
pub use transaction::{
    CostType, ExpenseCategory, ExpenseSource, IncomeCategory, NaturalKey, Transaction,
    TransactionDetail, TransactionKind,
};
