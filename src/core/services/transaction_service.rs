//! Create / update / delete orchestration for transactions.
//!
//! Every mutation flows through here: validation happens before any write,
//! affected accounts are recomputed from the full transaction set rather
//! than by hand-adjusted deltas, and fee/tax side-effects are spawned (and
//! later reconciled) as ordinary transactions tied back to their parent.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::services::{BalanceService, ServiceError, ServiceResult};
use crate::domain::common::Displayable;
use crate::domain::transaction::{
    round_amount, CostType, ExpenseCategory, ExpenseSource, Transaction, TransactionDetail,
    TransactionKind,
};
use crate::ledger::Ledger;

pub struct TransactionService;

impl TransactionService {
    /// Persists a validated transaction, recomputes the accounts it
    /// touches, and spawns any fee/tax side-effect transactions.
    pub fn create(ledger: &mut Ledger, transaction: Transaction) -> ServiceResult<Uuid> {
        let label = transaction.display_label();
        let id = Self::create_inner(ledger, transaction, true)?;
        tracing::info!(transaction = %id, %label, "transaction created");
        Ok(id)
    }

    /// Updates the transaction identified by `id` via the provided mutator.
    ///
    /// The mutator runs against a copy; if the result fails validation the
    /// ledger is left untouched. Balances are recomputed for the union of
    /// the accounts affected before and after the change, and previously
    /// spawned fee/tax transactions are reconciled in place.
    pub fn update<F>(ledger: &mut Ledger, id: Uuid, mutator: F) -> ServiceResult<()>
    where
        F: FnOnce(&mut Transaction),
    {
        let existing = ledger
            .transaction(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {id}")))?;
        let old_affected = existing.affected_accounts();

        let mut updated = existing.clone();
        mutator(&mut updated);
        // Identity is not mutable through this path.
        updated.id = existing.id;
        updated.owner = existing.owner;
        updated.spawned_by = existing.spawned_by;
        updated.amount = round_amount(updated.amount);
        updated
            .validate()
            .map_err(ServiceError::Validation)?;
        Self::ensure_endpoints_exist(ledger, &updated)?;
        if updated.spawned_by.is_none() && updated.tax_due().is_some() {
            Self::virtual_tax_destination(ledger, updated.owner)?;
        }

        ledger.replace_transaction(updated.clone());

        let mut affected = old_affected;
        for account in updated.affected_accounts() {
            if !affected.contains(&account) {
                affected.push(account);
            }
        }
        for account in affected {
            BalanceService::recompute(ledger, account)?;
        }

        if updated.spawned_by.is_none() {
            Self::reconcile_side_effects(ledger, id)?;
        }
        tracing::info!(transaction = %id, "transaction updated");
        Ok(())
    }

    /// Deletes the transaction and every fee/tax transaction it spawned,
    /// then recomputes all previously affected accounts.
    pub fn delete(
        ledger: &mut Ledger,
        id: Uuid,
        requester: Uuid,
    ) -> ServiceResult<Transaction> {
        let transaction = ledger
            .transaction(id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {id}")))?;
        if transaction.owner != requester {
            return Err(ServiceError::Permission(
                "Only the owner may delete a transaction".into(),
            ));
        }

        let mut affected = transaction.affected_accounts();
        let mut to_remove = vec![id];
        for child in ledger.children_of(id) {
            if let Some(spawned) = ledger.transaction(child) {
                for account in spawned.affected_accounts() {
                    if !affected.contains(&account) {
                        affected.push(account);
                    }
                }
            }
            to_remove.push(child);
        }

        for txn_id in to_remove {
            ledger.remove_transaction(txn_id);
        }
        for account in affected {
            BalanceService::recompute(ledger, account)?;
        }
        tracing::info!(transaction = %id, label = %transaction.display_label(), "transaction deleted");
        Ok(transaction)
    }

    pub fn get(ledger: &Ledger, id: Uuid) -> ServiceResult<&Transaction> {
        ledger
            .transaction(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {id}")))
    }

    /// The owner's transactions, most recent first.
    pub fn list(ledger: &Ledger, owner: Uuid) -> Vec<&Transaction> {
        let mut transactions: Vec<&Transaction> = ledger
            .transactions()
            .filter(|txn| txn.owner == owner)
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));
        transactions
    }

    fn create_inner(
        ledger: &mut Ledger,
        transaction: Transaction,
        spawn_side_effects: bool,
    ) -> ServiceResult<Uuid> {
        transaction
            .validate()
            .map_err(ServiceError::Validation)?;
        Self::ensure_endpoints_exist(ledger, &transaction)?;

        // Resolve the virtual-tax destination before any write so a missing
        // account leaves nothing half-applied.
        let tax_destination = if spawn_side_effects && transaction.tax_due().is_some() {
            Some(Self::virtual_tax_destination(ledger, transaction.owner)?)
        } else {
            None
        };

        let id = ledger.insert_transaction(transaction.clone());
        for account in transaction.affected_accounts() {
            BalanceService::recompute(ledger, account)?;
        }

        if spawn_side_effects {
            if let (Some(tax_amount), Some(destination)) = (transaction.tax_due(), tax_destination)
            {
                let withholding = Self::spawned_tax(&transaction, tax_amount, destination);
                Self::create_inner(ledger, withholding, false)?;
                tracing::debug!(parent = %id, amount = %tax_amount, "tax withholding spawned");
            }
            if let Some(fee_amount) = transaction.fee_due() {
                let fee = Self::spawned_fee(&transaction, fee_amount)?;
                Self::create_inner(ledger, fee, false)?;
                tracing::debug!(parent = %id, amount = %fee_amount, "fee expense spawned");
            }
        }
        Ok(id)
    }

    /// Brings previously spawned fee/tax transactions in line with the
    /// parent's current fee and tax settings: updated in place, spawned
    /// when newly owed, deleted when no longer owed. Never duplicated.
    fn reconcile_side_effects(ledger: &mut Ledger, parent_id: Uuid) -> ServiceResult<()> {
        let parent = ledger
            .transaction(parent_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("Transaction {parent_id}")))?;

        let mut fee_child = None;
        let mut tax_child = None;
        for child in ledger.children_of(parent_id) {
            match ledger.transaction(child).map(|txn| txn.kind) {
                Some(TransactionKind::Expense) => fee_child = Some(child),
                Some(TransactionKind::Tax) => tax_child = Some(child),
                _ => {}
            }
        }

        match (parent.fee_due(), fee_child) {
            (Some(amount), Some(child)) => {
                let origin = parent.origin;
                let date = parent.date;
                let description = Self::fee_description(&parent);
                Self::update(ledger, child, |txn| {
                    txn.amount = amount;
                    txn.origin = origin;
                    txn.date = date;
                    txn.description = description;
                })?;
            }
            (Some(amount), None) => {
                let fee = Self::spawned_fee(&parent, amount)?;
                Self::create_inner(ledger, fee, false)?;
            }
            (None, Some(child)) => {
                Self::remove_spawned(ledger, child)?;
            }
            (None, None) => {}
        }

        match (parent.tax_due(), tax_child) {
            (Some(amount), Some(child)) => {
                let date = parent.date;
                let description = Self::tax_description(&parent);
                let year = parent.year();
                Self::update(ledger, child, |txn| {
                    txn.amount = amount;
                    txn.date = date;
                    txn.description = description;
                    txn.detail = Some(TransactionDetail::Tax { year });
                })?;
            }
            (Some(amount), None) => {
                let destination = Self::virtual_tax_destination(ledger, parent.owner)?;
                let withholding = Self::spawned_tax(&parent, amount, destination);
                Self::create_inner(ledger, withholding, false)?;
            }
            (None, Some(child)) => {
                Self::remove_spawned(ledger, child)?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    fn remove_spawned(ledger: &mut Ledger, id: Uuid) -> ServiceResult<()> {
        if let Some(removed) = ledger.remove_transaction(id) {
            for account in removed.affected_accounts() {
                BalanceService::recompute(ledger, account)?;
            }
        }
        Ok(())
    }

    fn spawned_fee(parent: &Transaction, amount: Decimal) -> ServiceResult<Transaction> {
        let origin = parent.origin.ok_or_else(|| {
            ServiceError::Validation("Fee requires an origin account".into())
        })?;
        let mut fee = Transaction::new(
            parent.owner,
            TransactionKind::Expense,
            amount,
            Self::fee_description(parent),
            parent.date,
        )
        .with_origin(origin)
        .with_detail(TransactionDetail::Expense {
            category: ExpenseCategory::Fees,
            source: ExpenseSource::Personal,
            cost: CostType::Variable,
        });
        fee.spawned_by = Some(parent.id);
        Ok(fee)
    }

    fn spawned_tax(
        parent: &Transaction,
        amount: Decimal,
        destination: Uuid,
    ) -> Transaction {
        let mut withholding = Transaction::new(
            parent.owner,
            TransactionKind::Tax,
            amount,
            Self::tax_description(parent),
            parent.date,
        )
        .with_destination(destination)
        .with_detail(TransactionDetail::Tax {
            year: parent.year(),
        });
        withholding.spawned_by = Some(parent.id);
        withholding
    }

    fn fee_description(parent: &Transaction) -> String {
        format!("Fee for {}", parent.description)
    }

    fn tax_description(parent: &Transaction) -> String {
        format!("Tax withheld on {}", parent.description)
    }

    fn virtual_tax_destination(ledger: &Ledger, owner: Uuid) -> ServiceResult<Uuid> {
        ledger
            .virtual_tax_account(owner)
            .map(|account| account.id)
            .ok_or_else(|| {
                ServiceError::NotFound("No virtual tax account exists for this owner".into())
            })
    }

    fn ensure_endpoints_exist(ledger: &Ledger, transaction: &Transaction) -> ServiceResult<()> {
        for account in transaction.origin.into_iter().chain(transaction.destination) {
            if ledger.account(account).is_none() {
                return Err(ServiceError::NotFound(format!("Account {account}")));
            }
        }
        Ok(())
    }
}
