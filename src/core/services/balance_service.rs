//! Recomputes account balances from the full transaction set.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::services::{HistoryService, ServiceError, ServiceResult};
use crate::domain::account::AccountKind;
use crate::domain::transaction::{round_amount, TransactionKind};
use crate::ledger::Ledger;

/// The balance aggregator: a pure function of the current transaction set,
/// persisted into the account and recorded in the audit trail.
pub struct BalanceService;

impl BalanceService {
    /// Recomputes `account_id`'s balance from scratch, stores it, and asks
    /// the history recorder to snapshot it if it changed.
    pub fn recompute(ledger: &mut Ledger, account_id: Uuid) -> ServiceResult<Decimal> {
        let kind = ledger
            .account(account_id)
            .map(|account| account.kind)
            .ok_or_else(|| ServiceError::NotFound(format!("Account {account_id}")))?;

        let balance = round_amount(Self::aggregate(ledger, account_id, kind));
        if let Some(account) = ledger.account_mut(account_id) {
            account.balance = balance;
        }
        ledger.touch();
        HistoryService::record(ledger, account_id)?;
        tracing::debug!(account = %account_id, %balance, "balance recomputed");
        Ok(balance)
    }

    fn aggregate(ledger: &Ledger, account_id: Uuid, kind: AccountKind) -> Decimal {
        let mut incoming = Decimal::ZERO;
        let mut outgoing = Decimal::ZERO;
        let mut internal_in = Decimal::ZERO;
        let mut internal_out = Decimal::ZERO;
        let mut tax_in = Decimal::ZERO;
        let mut tax_out = Decimal::ZERO;

        for txn in ledger.transactions_for(account_id) {
            let to_here = txn.destination == Some(account_id);
            let from_here = txn.origin == Some(account_id);
            match txn.kind {
                TransactionKind::Income if to_here => incoming += txn.amount,
                TransactionKind::Expense if from_here => outgoing += txn.amount,
                TransactionKind::Internal => {
                    if to_here {
                        internal_in += txn.amount;
                    }
                    if from_here {
                        internal_out += txn.amount;
                    }
                }
                TransactionKind::Tax => {
                    if to_here {
                        tax_in += txn.amount;
                    }
                    if from_here {
                        tax_out += txn.amount;
                    }
                }
                TransactionKind::Income | TransactionKind::Expense => {}
            }
        }

        match kind {
            // Tax flows never touch normal/investment balances; they exist
            // only on the virtual-tax account.
            AccountKind::VirtualTax => tax_in - tax_out,
            AccountKind::Normal | AccountKind::Investment => {
                incoming - outgoing + internal_in - internal_out
            }
        }
    }
}
