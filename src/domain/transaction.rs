use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Displayable;

/// Number of fractional digits every persisted amount is held at.
pub const AMOUNT_SCALE: u32 = 2;

/// Rounds a raw amount to the ledger's fixed-point scale.
///
/// Half-even keeps repeated recomputation from drifting.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Enumerates the supported transaction classifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Expense,
    Internal,
    Tax,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
            TransactionKind::Internal => "internal",
            TransactionKind::Tax => "tax",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            "internal" => Ok(TransactionKind::Internal),
            "tax" => Ok(TransactionKind::Tax),
            other => Err(format!("Unknown transaction kind `{other}`")),
        }
    }
}

/// Categories an income can be filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncomeCategory {
    Salary,
    Interest,
    Parents,
    Birthday,
    IvaReimbursement,
}

impl FromStr for IncomeCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize(raw).as_str() {
            "salary" => Ok(IncomeCategory::Salary),
            "interest" => Ok(IncomeCategory::Interest),
            "parents" => Ok(IncomeCategory::Parents),
            "birthday" => Ok(IncomeCategory::Birthday),
            "iva reimbursement" => Ok(IncomeCategory::IvaReimbursement),
            other => Err(format!("Unknown income category `{other}`")),
        }
    }
}

/// Categories an expense can be filed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseCategory {
    Accessories,
    Books,
    Car,
    Cash,
    Clothing,
    CoffeesAndSnacks,
    DiningOut,
    Entertainment,
    Fees,
    Gifts,
    Groceries,
    Gym,
    Haircut,
    Housing,
    Insurance,
    Healthcare,
    Miscellaneous,
    Office,
    PersonalDevelopment,
    Petrol,
    Pharmacy,
    Phone,
    Rent,
    Sports,
    Supplements,
    Tattoo,
    Taxes,
    Tech,
    Transportation,
    Utilities,
    Vacation,
}

impl FromStr for ExpenseCategory {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize(raw).as_str() {
            "accessories" => Ok(ExpenseCategory::Accessories),
            "books" => Ok(ExpenseCategory::Books),
            "car" => Ok(ExpenseCategory::Car),
            "cash" => Ok(ExpenseCategory::Cash),
            "clothing" => Ok(ExpenseCategory::Clothing),
            "coffees & snacks" => Ok(ExpenseCategory::CoffeesAndSnacks),
            "dining out" => Ok(ExpenseCategory::DiningOut),
            "entertainment" => Ok(ExpenseCategory::Entertainment),
            "fees" => Ok(ExpenseCategory::Fees),
            "gifts" => Ok(ExpenseCategory::Gifts),
            "groceries" => Ok(ExpenseCategory::Groceries),
            "gym" => Ok(ExpenseCategory::Gym),
            "haircut" => Ok(ExpenseCategory::Haircut),
            "housing" => Ok(ExpenseCategory::Housing),
            "insurance" => Ok(ExpenseCategory::Insurance),
            "healthcare" => Ok(ExpenseCategory::Healthcare),
            "miscellaneous" => Ok(ExpenseCategory::Miscellaneous),
            "office" => Ok(ExpenseCategory::Office),
            "personal development" => Ok(ExpenseCategory::PersonalDevelopment),
            "petrol" => Ok(ExpenseCategory::Petrol),
            "pharmacy" => Ok(ExpenseCategory::Pharmacy),
            "phone" => Ok(ExpenseCategory::Phone),
            "rent" => Ok(ExpenseCategory::Rent),
            "sports" => Ok(ExpenseCategory::Sports),
            "supplements" => Ok(ExpenseCategory::Supplements),
            "tattoo" => Ok(ExpenseCategory::Tattoo),
            "taxes" => Ok(ExpenseCategory::Taxes),
            "tech" => Ok(ExpenseCategory::Tech),
            "transportation" => Ok(ExpenseCategory::Transportation),
            "utilities" => Ok(ExpenseCategory::Utilities),
            "vacation" => Ok(ExpenseCategory::Vacation),
            other => Err(format!("Unknown expense category `{other}`")),
        }
    }
}

/// Whether an expense was paid from personal or shared funds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpenseSource {
    Personal,
    Shared,
}

impl FromStr for ExpenseSource {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize(raw).as_str() {
            "personal" => Ok(ExpenseSource::Personal),
            "shared" => Ok(ExpenseSource::Shared),
            other => Err(format!("Unknown expense source `{other}`")),
        }
    }
}

/// Whether an expense recurs at a fixed amount or varies.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CostType {
    Fixed,
    Variable,
}

impl FromStr for CostType {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match normalize(raw).as_str() {
            "fixed" => Ok(CostType::Fixed),
            "variable" => Ok(CostType::Variable),
            other => Err(format!("Unknown cost type `{other}`")),
        }
    }
}

fn normalize(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace('_', " ")
}

/// Kind-specific satellite data attached one-to-one to a transaction.
///
/// Income and Expense details are mandatory for transactions of those
/// kinds; a Tax detail is optional, and Internal transactions carry none.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum TransactionDetail {
    Income {
        category: IncomeCategory,
    },
    Expense {
        category: ExpenseCategory,
        source: ExpenseSource,
        cost: CostType,
    },
    Tax {
        year: i32,
    },
}

impl TransactionDetail {
    pub fn matches_kind(&self, kind: TransactionKind) -> bool {
        matches!(
            (self, kind),
            (TransactionDetail::Income { .. }, TransactionKind::Income)
                | (TransactionDetail::Expense { .. }, TransactionKind::Expense)
                | (TransactionDetail::Tax { .. }, TransactionKind::Tax)
        )
    }
}

/// The tuple that identifies a transaction across import runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey {
    pub date: DateTime<Utc>,
    pub kind: TransactionKind,
    pub description: String,
    pub amount: Decimal,
    pub origin: Option<Uuid>,
    pub destination: Option<Uuid>,
}

/// A single movement of money, owned by a user and referencing at most an
/// origin and a destination account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub owner: Uuid,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub description: String,
    pub date: DateTime<Utc>,
    pub origin: Option<Uuid>,
    pub destination: Option<Uuid>,
    pub detail: Option<TransactionDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_percentage: Option<Decimal>,
    /// Back-reference to the transaction whose fee/tax side-effect spawned
    /// this one. Spawned transactions are cascade-deleted with their parent
    /// and never spawn side-effects of their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spawned_by: Option<Uuid>,
}

impl Transaction {
    pub fn new(
        owner: Uuid,
        kind: TransactionKind,
        amount: Decimal,
        description: impl Into<String>,
        date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            kind,
            amount: round_amount(amount),
            description: description.into(),
            date,
            origin: None,
            destination: None,
            detail: None,
            fee: None,
            tax_percentage: None,
            spawned_by: None,
        }
    }

    pub fn with_origin(mut self, account: Uuid) -> Self {
        self.origin = Some(account);
        self
    }

    pub fn with_destination(mut self, account: Uuid) -> Self {
        self.destination = Some(account);
        self
    }

    pub fn with_detail(mut self, detail: TransactionDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_fee(mut self, fee: Decimal) -> Self {
        self.fee = Some(round_amount(fee));
        self
    }

    pub fn with_tax_percentage(mut self, percentage: Decimal) -> Self {
        self.tax_percentage = Some(percentage);
        self
    }

    /// Checks every entity-level invariant, returning the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.amount <= Decimal::ZERO {
            return Err("Amount must be a positive number".into());
        }
        match self.kind {
            TransactionKind::Income => {
                if self.destination.is_none() || self.origin.is_some() {
                    return Err("Income requires a destination account and no origin".into());
                }
            }
            TransactionKind::Expense => {
                if self.origin.is_none() || self.destination.is_some() {
                    return Err("Expense requires an origin account and no destination".into());
                }
            }
            TransactionKind::Internal | TransactionKind::Tax => {
                if self.origin.is_none() && self.destination.is_none() {
                    return Err(format!(
                        "{} requires at least one of origin or destination",
                        self.kind.as_str()
                    ));
                }
            }
        }
        match (&self.detail, self.kind) {
            (Some(detail), kind) if !detail.matches_kind(kind) => {
                return Err(format!(
                    "Detail record does not match transaction kind `{}`",
                    kind.as_str()
                ));
            }
            (None, TransactionKind::Income) => {
                return Err("Income requires an income detail record".into());
            }
            (None, TransactionKind::Expense) => {
                return Err("Expense requires an expense detail record".into());
            }
            _ => {}
        }
        if let Some(fee) = self.fee {
            if fee < Decimal::ZERO {
                return Err("Fee cannot be negative".into());
            }
            if fee > Decimal::ZERO && self.origin.is_none() {
                return Err("Fee requires an origin account".into());
            }
        }
        if let Some(pct) = self.tax_percentage {
            if self.kind != TransactionKind::Income {
                return Err("Tax percentage only applies to income transactions".into());
            }
            if pct < Decimal::ZERO || pct > Decimal::from(100) {
                return Err("Tax percentage must be between 0 and 100".into());
            }
        }
        if self.spawned_by.is_some() && (self.fee.is_some() || self.tax_percentage.is_some()) {
            return Err("Spawned transactions cannot carry fee or tax side-effects".into());
        }
        Ok(())
    }

    /// Accounts whose balance this transaction contributes to, per kind.
    pub fn affected_accounts(&self) -> Vec<Uuid> {
        let mut accounts = Vec::with_capacity(2);
        let (origin, destination) = match self.kind {
            TransactionKind::Income => (None, self.destination),
            TransactionKind::Expense => (self.origin, None),
            TransactionKind::Internal | TransactionKind::Tax => (self.origin, self.destination),
        };
        if let Some(account) = origin {
            accounts.push(account);
        }
        if let Some(account) = destination {
            if !accounts.contains(&account) {
                accounts.push(account);
            }
        }
        accounts
    }

    /// The fee amount still owed as a spawned expense, if any.
    pub fn fee_due(&self) -> Option<Decimal> {
        self.fee.filter(|fee| *fee > Decimal::ZERO)
    }

    /// The tax amount to credit the virtual-tax account, if any.
    pub fn tax_due(&self) -> Option<Decimal> {
        if self.kind != TransactionKind::Income {
            return None;
        }
        self.tax_percentage
            .filter(|pct| *pct > Decimal::ZERO)
            .map(|pct| round_amount(self.amount * pct / Decimal::from(100)))
    }

    /// Calendar year the transaction falls in, used for spawned tax details.
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey {
            date: self.date,
            kind: self.kind,
            description: self.description.clone(),
            amount: self.amount,
            origin: self.origin,
            destination: self.destination,
        }
    }
}

impl Displayable for Transaction {
    fn display_label(&self) -> String {
        format!("{} - {} on {}", self.kind.as_str(), self.amount, self.date)
    }
}
