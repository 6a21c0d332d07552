//! Batch import of externally-sourced transaction rows.
//!
//! Rows are validated in a dry-run pass first; nothing is persisted unless
//! the whole batch parses cleanly. Committed rows replay through
//! [`TransactionService::create`], so balances and fee/tax side-effects
//! behave exactly as for interactively entered transactions.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::services::{ServiceResult, TransactionService};
use crate::domain::transaction::{
    NaturalKey, Transaction, TransactionDetail, TransactionKind,
};
use crate::ledger::Ledger;

/// Date format the import rows carry, e.g. `24-10-2024`.
const DATE_FORMAT: &str = "%d-%m-%Y";

/// One externally-sourced row, column-for-column as exported.
#[derive(Debug, Clone, Default)]
pub struct ImportRow {
    pub date: String,
    pub kind: String,
    pub description: String,
    pub amount: String,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub income_category: Option<String>,
    pub expense_category: Option<String>,
    pub source: Option<String>,
    pub fixed_or_variable: Option<String>,
}

/// Errors collected per row during the dry run (or, for `Rejected`, the
/// single commit-phase failure that aborted the batch).
#[derive(Debug, thiserror::Error)]
pub enum RowError {
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Lookup error: {0}")]
    Lookup(String),
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Outcome of an import batch.
#[derive(Debug, Default)]
pub struct ImportReport {
    pub created: usize,
    pub skipped_duplicates: usize,
    pub errors: Vec<(usize, RowError)>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct ImportService;

impl ImportService {
    /// Two-phase import: dry-run every row, then commit only if the whole
    /// batch validated. Duplicates of existing transactions (by natural
    /// key) are skipped without error.
    pub fn import(
        ledger: &mut Ledger,
        owner: Uuid,
        rows: &[ImportRow],
    ) -> ServiceResult<ImportReport> {
        let mut report = ImportReport::default();

        let mut parsed = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match Self::parse_row(ledger, owner, row) {
                Ok(transaction) => parsed.push((index, transaction)),
                Err(error) => report.errors.push((index, error)),
            }
        }
        if !report.errors.is_empty() {
            tracing::info!(
                rows = rows.len(),
                errors = report.errors.len(),
                "import aborted in dry run"
            );
            return Ok(report);
        }

        let mut seen: HashSet<NaturalKey> = ledger
            .transactions()
            .filter(|txn| txn.owner == owner)
            .map(Transaction::natural_key)
            .collect();

        for (index, transaction) in parsed {
            let key = transaction.natural_key();
            if seen.contains(&key) {
                report.skipped_duplicates += 1;
                continue;
            }
            match TransactionService::create(ledger, transaction) {
                Ok(_) => {
                    seen.insert(key);
                    report.created += 1;
                }
                Err(error) => {
                    // One persistence failure aborts the rest of the batch.
                    report.errors.push((index, RowError::Rejected(error.to_string())));
                    break;
                }
            }
        }
        tracing::info!(
            created = report.created,
            skipped = report.skipped_duplicates,
            "import committed"
        );
        Ok(report)
    }

    fn parse_row(ledger: &Ledger, owner: Uuid, row: &ImportRow) -> Result<Transaction, RowError> {
        let date = Self::parse_date(&row.date)?;
        let kind = TransactionKind::from_str(&row.kind).map_err(RowError::Parse)?;
        let amount = Self::parse_amount(&row.amount)?;

        let origin = Self::resolve_account(ledger, owner, row.origin.as_deref())?;
        let destination = Self::resolve_account(ledger, owner, row.destination.as_deref())?;

        let mut transaction =
            Transaction::new(owner, kind, amount, row.description.clone(), date);
        transaction.origin = origin;
        transaction.destination = destination;
        transaction.detail = Self::parse_detail(kind, row)?;
        transaction.validate().map_err(RowError::Parse)?;
        Ok(transaction)
    }

    fn parse_date(raw: &str) -> Result<DateTime<Utc>, RowError> {
        NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .map_err(|_| RowError::Parse(format!("Invalid date `{raw}` (expected dd-mm-yyyy)")))
    }

    /// Accepts amounts as exported: optional currency symbol, thousands
    /// separators, surrounding whitespace.
    fn parse_amount(raw: &str) -> Result<Decimal, RowError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != ',' && *c != '€')
            .collect();
        Decimal::from_str(&cleaned)
            .map_err(|_| RowError::Parse(format!("Invalid amount `{raw}`")))
    }

    fn resolve_account(
        ledger: &Ledger,
        owner: Uuid,
        name: Option<&str>,
    ) -> Result<Option<Uuid>, RowError> {
        match name.map(str::trim).filter(|name| !name.is_empty()) {
            None => Ok(None),
            Some(name) => ledger
                .account_by_name(owner, name)
                .map(|account| Some(account.id))
                .ok_or_else(|| RowError::Lookup(format!("Unknown account `{name}`"))),
        }
    }

    fn parse_detail(
        kind: TransactionKind,
        row: &ImportRow,
    ) -> Result<Option<TransactionDetail>, RowError> {
        match kind {
            TransactionKind::Income => {
                let category = row
                    .income_category
                    .as_deref()
                    .ok_or_else(|| RowError::Parse("Missing income category".into()))?
                    .parse()
                    .map_err(RowError::Parse)?;
                Ok(Some(TransactionDetail::Income { category }))
            }
            TransactionKind::Expense => {
                let category = row
                    .expense_category
                    .as_deref()
                    .ok_or_else(|| RowError::Parse("Missing expense category".into()))?
                    .parse()
                    .map_err(RowError::Parse)?;
                let source = row
                    .source
                    .as_deref()
                    .ok_or_else(|| RowError::Parse("Missing expense source".into()))?
                    .parse()
                    .map_err(RowError::Parse)?;
                let cost = row
                    .fixed_or_variable
                    .as_deref()
                    .ok_or_else(|| RowError::Parse("Missing fixed/variable flag".into()))?
                    .parse()
                    .map_err(RowError::Parse)?;
                Ok(Some(TransactionDetail::Expense {
                    category,
                    source,
                    cost,
                }))
            }
            TransactionKind::Internal | TransactionKind::Tax => Ok(None),
        }
    }
}
