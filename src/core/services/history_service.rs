//! Append-only balance audit trail.

use chrono::Utc;
use uuid::Uuid;

use crate::core::services::{ServiceError, ServiceResult};
use crate::domain::account::BalanceSnapshot;
use crate::ledger::Ledger;

pub struct HistoryService;

impl HistoryService {
    /// Appends a snapshot of the account's current balance, but only when
    /// it differs from the most recently recorded one. The single writer
    /// per recomputation keeps `(account, recorded_at)` unique.
    pub fn record(ledger: &mut Ledger, account_id: Uuid) -> ServiceResult<()> {
        let balance = ledger
            .account(account_id)
            .map(|account| account.balance)
            .ok_or_else(|| ServiceError::NotFound(format!("Account {account_id}")))?;

        if ledger
            .latest_snapshot(account_id)
            .is_some_and(|snapshot| snapshot.balance == balance)
        {
            return Ok(());
        }

        ledger.push_snapshot(BalanceSnapshot {
            account: account_id,
            balance,
            recorded_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{Account, AccountKind};
    use rust_decimal_macros::dec;

    #[test]
    fn unchanged_balance_appends_nothing() {
        let mut ledger = Ledger::new("History");
        let account_id =
            ledger.add_account(Account::new(Uuid::new_v4(), "Checking", AccountKind::Normal));

        HistoryService::record(&mut ledger, account_id).unwrap();
        HistoryService::record(&mut ledger, account_id).unwrap();
        assert_eq!(ledger.history_for(account_id).len(), 1);
    }

    #[test]
    fn changed_balance_appends_a_row() {
        let mut ledger = Ledger::new("History");
        let account_id =
            ledger.add_account(Account::new(Uuid::new_v4(), "Checking", AccountKind::Normal));

        HistoryService::record(&mut ledger, account_id).unwrap();
        ledger.account_mut(account_id).unwrap().balance = dec!(10);
        HistoryService::record(&mut ledger, account_id).unwrap();

        let rows = ledger.history_for(account_id);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].balance, dec!(10));
    }
}
