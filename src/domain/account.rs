use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::Displayable;

/// Represents a financial account whose balance is derived from the
/// transactions that reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: Uuid,
    pub owner: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub balance: Decimal,
}

impl Account {
    /// Creates a new account with a zero balance.
    pub fn new(owner: Uuid, name: impl Into<String>, kind: AccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            name: name.into(),
            kind,
            balance: Decimal::ZERO,
        }
    }
}

impl Displayable for Account {
    fn display_label(&self) -> String {
        format!("{} ({:?})", self.name, self.kind)
    }
}

/// Enumerates the supported account classifications.
///
/// `VirtualTax` is a synthetic account that accumulates only tax-kind
/// flows; at most one may exist per owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Normal,
    Investment,
    VirtualTax,
}

/// One row of the append-only balance audit trail.
///
/// A snapshot is written only when a freshly recomputed balance differs
/// from the most recent prior snapshot for the same account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceSnapshot {
    pub account: Uuid,
    pub balance: Decimal,
    pub recorded_at: DateTime<Utc>,
}
