use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::account::{Account, AccountKind};
use crate::domain::common::Displayable;
use crate::ledger::Ledger;

use super::{ServiceError, ServiceResult};

pub struct AccountService;

impl AccountService {
    /// Registers a new account. Names are unique per owner, and an owner
    /// may hold at most one virtual-tax account.
    pub fn add(ledger: &mut Ledger, account: Account) -> ServiceResult<Uuid> {
        Self::validate_name(ledger, account.owner, &account.name)?;
        if account.kind == AccountKind::VirtualTax
            && ledger.virtual_tax_account(account.owner).is_some()
        {
            return Err(ServiceError::Validation(
                "Owner already has a virtual tax account".into(),
            ));
        }
        tracing::info!(label = %account.display_label(), "account created");
        Ok(ledger.add_account(account))
    }

    pub fn get(ledger: &Ledger, id: Uuid) -> ServiceResult<&Account> {
        ledger
            .account(id)
            .ok_or_else(|| ServiceError::NotFound(format!("Account {id}")))
    }

    /// Current derived balance of the account.
    pub fn balance(ledger: &Ledger, id: Uuid) -> ServiceResult<Decimal> {
        Self::get(ledger, id).map(|account| account.balance)
    }

    pub fn list(ledger: &Ledger, owner: Uuid) -> Vec<&Account> {
        ledger
            .accounts()
            .filter(|account| account.owner == owner)
            .collect()
    }

    pub fn remove(ledger: &mut Ledger, id: Uuid) -> ServiceResult<()> {
        if ledger.transactions_for(id).next().is_some() {
            return Err(ServiceError::Validation(
                "Account has linked transactions".into(),
            ));
        }
        ledger
            .remove_account(id)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("Account {id}")))
    }

    fn validate_name(ledger: &Ledger, owner: Uuid, candidate: &str) -> ServiceResult<()> {
        if ledger.account_by_name(owner, candidate).is_some() {
            Err(ServiceError::Validation(format!(
                "Account `{candidate}` already exists"
            )))
        } else {
            Ok(())
        }
    }
}
