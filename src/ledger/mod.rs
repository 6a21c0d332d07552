use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::account::{Account, AccountKind, BalanceSnapshot};
use crate::domain::transaction::Transaction;

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// In-memory store the services mutate: accounts, transactions, and the
/// append-only balance history, plus a per-account secondary index so
/// recomputing one balance never scans the whole transaction set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ledger {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    accounts: BTreeMap<Uuid, Account>,
    #[serde(default)]
    transactions: BTreeMap<Uuid, Transaction>,
    #[serde(default)]
    history: BTreeMap<Uuid, Vec<BalanceSnapshot>>,
    /// Account id -> ids of transactions referencing it as origin or
    /// destination. Maintained by insert/replace/remove, rebuilt after
    /// deserialization, never serialized.
    #[serde(skip)]
    by_account: HashMap<Uuid, BTreeSet<Uuid>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Ledger::schema_version_default")]
    pub schema_version: u8,
}

impl Ledger {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            accounts: BTreeMap::new(),
            transactions: BTreeMap::new(),
            history: BTreeMap::new(),
            by_account: HashMap::new(),
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn add_account(&mut self, account: Account) -> Uuid {
        let id = account.id;
        self.accounts.insert(id, account);
        self.touch();
        id
    }

    pub fn account(&self, id: Uuid) -> Option<&Account> {
        self.accounts.get(&id)
    }

    pub fn account_mut(&mut self, id: Uuid) -> Option<&mut Account> {
        self.accounts.get_mut(&id)
    }

    pub fn remove_account(&mut self, id: Uuid) -> Option<Account> {
        let removed = self.accounts.remove(&id);
        if removed.is_some() {
            self.touch();
        }
        removed
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    /// Case-insensitive account lookup by display name, scoped to an owner.
    pub fn account_by_name(&self, owner: Uuid, name: &str) -> Option<&Account> {
        let normalized = name.trim().to_ascii_lowercase();
        self.accounts.values().find(|account| {
            account.owner == owner && account.name.trim().to_ascii_lowercase() == normalized
        })
    }

    /// The owner's virtual-tax account, if one has been created.
    pub fn virtual_tax_account(&self, owner: Uuid) -> Option<&Account> {
        self.accounts
            .values()
            .find(|account| account.owner == owner && account.kind == AccountKind::VirtualTax)
    }

    pub fn insert_transaction(&mut self, transaction: Transaction) -> Uuid {
        let id = transaction.id;
        self.index_endpoints(&transaction);
        self.transactions.insert(id, transaction);
        self.touch();
        id
    }

    /// Swaps in an updated copy of an existing transaction, keeping the
    /// per-account index in step with any endpoint change.
    pub fn replace_transaction(&mut self, updated: Transaction) -> Option<Transaction> {
        let previous = self.transactions.remove(&updated.id)?;
        self.deindex_endpoints(&previous);
        self.index_endpoints(&updated);
        self.transactions.insert(updated.id, updated);
        self.touch();
        Some(previous)
    }

    pub fn remove_transaction(&mut self, id: Uuid) -> Option<Transaction> {
        let removed = self.transactions.remove(&id)?;
        self.deindex_endpoints(&removed);
        self.touch();
        Some(removed)
    }

    pub fn transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.get(&id)
    }

    pub fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.transactions.values()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    /// Transactions referencing `account` as origin or destination.
    pub fn transactions_for(&self, account: Uuid) -> impl Iterator<Item = &Transaction> {
        self.by_account
            .get(&account)
            .into_iter()
            .flatten()
            .filter_map(|id| self.transactions.get(id))
    }

    /// Transactions spawned as fee/tax side-effects of `parent`.
    pub fn children_of(&self, parent: Uuid) -> Vec<Uuid> {
        self.transactions
            .values()
            .filter(|txn| txn.spawned_by == Some(parent))
            .map(|txn| txn.id)
            .collect()
    }

    pub fn history_for(&self, account: Uuid) -> &[BalanceSnapshot] {
        self.history.get(&account).map_or(&[], Vec::as_slice)
    }

    pub fn latest_snapshot(&self, account: Uuid) -> Option<&BalanceSnapshot> {
        self.history.get(&account).and_then(|rows| rows.last())
    }

    pub fn push_snapshot(&mut self, snapshot: BalanceSnapshot) {
        self.history.entry(snapshot.account).or_default().push(snapshot);
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    /// Reconstructs the per-account index from the transaction set; must be
    /// called after deserializing a ledger snapshot.
    pub fn rebuild_index(&mut self) {
        self.by_account.clear();
        let entries: Vec<(Uuid, Uuid)> = self
            .transactions
            .values()
            .flat_map(|txn| {
                txn.origin
                    .into_iter()
                    .chain(txn.destination)
                    .map(move |account| (account, txn.id))
            })
            .collect();
        for (account, txn) in entries {
            self.by_account.entry(account).or_default().insert(txn);
        }
    }

    fn index_endpoints(&mut self, transaction: &Transaction) {
        for account in transaction.origin.into_iter().chain(transaction.destination) {
            self.by_account
                .entry(account)
                .or_default()
                .insert(transaction.id);
        }
    }

    fn deindex_endpoints(&mut self, transaction: &Transaction) {
        for account in transaction.origin.into_iter().chain(transaction.destination) {
            if let Some(ids) = self.by_account.get_mut(&account) {
                ids.remove(&transaction.id);
                if ids.is_empty() {
                    self.by_account.remove(&account);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transaction::TransactionKind;
    use rust_decimal_macros::dec;

    fn sample(origin: Option<Uuid>, destination: Option<Uuid>) -> Transaction {
        let mut txn = Transaction::new(
            Uuid::new_v4(),
            TransactionKind::Internal,
            dec!(10),
            "move",
            Utc::now(),
        );
        txn.origin = origin;
        txn.destination = destination;
        txn
    }

    #[test]
    fn index_follows_insert_and_remove() {
        let mut ledger = Ledger::new("Index");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let id = ledger.insert_transaction(sample(Some(a), Some(b)));

        assert_eq!(ledger.transactions_for(a).count(), 1);
        assert_eq!(ledger.transactions_for(b).count(), 1);

        ledger.remove_transaction(id);
        assert_eq!(ledger.transactions_for(a).count(), 0);
        assert_eq!(ledger.transactions_for(b).count(), 0);
    }

    #[test]
    fn replace_moves_index_to_new_endpoints() {
        let mut ledger = Ledger::new("Index");
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let id = ledger.insert_transaction(sample(Some(a), None));

        let mut updated = ledger.transaction(id).unwrap().clone();
        updated.origin = Some(b);
        ledger.replace_transaction(updated);

        assert_eq!(ledger.transactions_for(a).count(), 0);
        assert_eq!(ledger.transactions_for(b).count(), 1);
    }

    #[test]
    fn rebuild_index_restores_lookups() {
        let mut ledger = Ledger::new("Index");
        let a = Uuid::new_v4();
        ledger.insert_transaction(sample(Some(a), None));

        ledger.by_account.clear();
        assert_eq!(ledger.transactions_for(a).count(), 0);

        ledger.rebuild_index();
        assert_eq!(ledger.transactions_for(a).count(), 1);
    }
}
