use chrono::Utc;
use rust_decimal_macros::dec;
use uuid::Uuid;

use tracker_core::{
    core::services::{AccountService, BalanceService, TransactionService},
    domain::{
        account::{Account, AccountKind},
        transaction::{
            CostType, ExpenseCategory, ExpenseSource, IncomeCategory, Transaction,
            TransactionDetail, TransactionKind,
        },
    },
    ledger::Ledger,
};

fn prepared_ledger() -> (Ledger, Uuid, Uuid) {
    let mut ledger = Ledger::new("Services");
    let owner = Uuid::new_v4();
    let checking = AccountService::add(
        &mut ledger,
        Account::new(owner, "Checking", AccountKind::Normal),
    )
    .unwrap();
    (ledger, owner, checking)
}

fn income(owner: Uuid, destination: Uuid, amount: rust_decimal::Decimal) -> Transaction {
    Transaction::new(owner, TransactionKind::Income, amount, "salary", Utc::now())
        .with_destination(destination)
        .with_detail(TransactionDetail::Income {
            category: IncomeCategory::Salary,
        })
}

fn expense(owner: Uuid, origin: Uuid, amount: rust_decimal::Decimal) -> Transaction {
    Transaction::new(
        owner,
        TransactionKind::Expense,
        amount,
        "groceries",
        Utc::now(),
    )
    .with_origin(origin)
    .with_detail(TransactionDetail::Expense {
        category: ExpenseCategory::Groceries,
        source: ExpenseSource::Personal,
        cost: CostType::Variable,
    })
}

#[test]
fn balance_matches_recompute_after_every_mutation() {
    let (mut ledger, owner, checking) = prepared_ledger();

    let id = TransactionService::create(&mut ledger, income(owner, checking, dec!(200))).unwrap();
    let stored = AccountService::balance(&ledger, checking).unwrap();
    assert_eq!(
        BalanceService::recompute(&mut ledger, checking).unwrap(),
        stored
    );

    TransactionService::update(&mut ledger, id, |txn| txn.amount = dec!(120)).unwrap();
    let stored = AccountService::balance(&ledger, checking).unwrap();
    assert_eq!(
        BalanceService::recompute(&mut ledger, checking).unwrap(),
        stored
    );

    TransactionService::delete(&mut ledger, id, owner).unwrap();
    let stored = AccountService::balance(&ledger, checking).unwrap();
    assert_eq!(stored, dec!(0));
    assert_eq!(
        BalanceService::recompute(&mut ledger, checking).unwrap(),
        stored
    );
}

#[test]
fn recompute_is_idempotent_on_history() {
    let (mut ledger, owner, checking) = prepared_ledger();
    TransactionService::create(&mut ledger, income(owner, checking, dec!(50))).unwrap();

    let rows_before = ledger.history_for(checking).len();
    BalanceService::recompute(&mut ledger, checking).unwrap();
    assert_eq!(ledger.history_for(checking).len(), rows_before);
}

#[test]
fn history_has_no_consecutive_equal_balances() {
    let (mut ledger, owner, checking) = prepared_ledger();
    TransactionService::create(&mut ledger, income(owner, checking, dec!(200))).unwrap();
    let spent = TransactionService::create(&mut ledger, expense(owner, checking, dec!(50))).unwrap();
    TransactionService::delete(&mut ledger, spent, owner).unwrap();

    let rows = ledger.history_for(checking);
    let balances: Vec<_> = rows.iter().map(|row| row.balance).collect();
    assert_eq!(balances, vec![dec!(200), dec!(150), dec!(200)]);
    for pair in rows.windows(2) {
        assert_ne!(pair[0].balance, pair[1].balance);
    }
}

#[test]
fn updating_an_amount_reverses_the_old_effect() {
    let (mut ledger, owner, checking) = prepared_ledger();
    TransactionService::create(&mut ledger, income(owner, checking, dec!(500))).unwrap();
    let spent =
        TransactionService::create(&mut ledger, expense(owner, checking, dec!(100))).unwrap();
    let before = AccountService::balance(&ledger, checking).unwrap();

    TransactionService::update(&mut ledger, spent, |txn| txn.amount = dec!(40)).unwrap();
    let after = AccountService::balance(&ledger, checking).unwrap();
    assert_eq!(after - before, dec!(60));
}

#[test]
fn kind_change_recomputes_lost_and_gained_accounts() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let savings = AccountService::add(
        &mut ledger,
        Account::new(owner, "Savings", AccountKind::Normal),
    )
    .unwrap();
    let id = TransactionService::create(&mut ledger, income(owner, checking, dec!(100))).unwrap();
    assert_eq!(AccountService::balance(&ledger, checking).unwrap(), dec!(100));

    TransactionService::update(&mut ledger, id, |txn| {
        txn.kind = TransactionKind::Expense;
        txn.destination = None;
        txn.origin = Some(savings);
        txn.detail = Some(TransactionDetail::Expense {
            category: ExpenseCategory::Miscellaneous,
            source: ExpenseSource::Personal,
            cost: CostType::Variable,
        });
    })
    .unwrap();

    assert_eq!(AccountService::balance(&ledger, checking).unwrap(), dec!(0));
    assert_eq!(
        AccountService::balance(&ledger, savings).unwrap(),
        dec!(-100)
    );
}

#[test]
fn fee_spawns_exactly_one_expense() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let parent = Transaction::new(
        owner,
        TransactionKind::Internal,
        dec!(100),
        "broker transfer",
        Utc::now(),
    )
    .with_origin(checking)
    .with_fee(dec!(5));
    let id = TransactionService::create(&mut ledger, parent).unwrap();

    let children = ledger.children_of(id);
    assert_eq!(children.len(), 1);
    let fee = ledger.transaction(children[0]).unwrap();
    assert_eq!(fee.kind, TransactionKind::Expense);
    assert_eq!(fee.amount, dec!(5));
    // The spawned fee must not cascade into further fees.
    assert!(ledger.children_of(fee.id).is_empty());
    assert_eq!(ledger.transaction_count(), 2);
    assert_eq!(
        AccountService::balance(&ledger, checking).unwrap(),
        dec!(-105)
    );
}

#[test]
fn tax_percentage_credits_the_virtual_tax_account() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let vault = AccountService::add(
        &mut ledger,
        Account::new(owner, "Tax Vault", AccountKind::VirtualTax),
    )
    .unwrap();

    let txn = income(owner, checking, dec!(1000)).with_tax_percentage(dec!(20));
    TransactionService::create(&mut ledger, txn).unwrap();

    // The withholding lands on the virtual account only; the income account
    // keeps the full gross amount.
    assert_eq!(AccountService::balance(&ledger, vault).unwrap(), dec!(200));
    assert_eq!(
        AccountService::balance(&ledger, checking).unwrap(),
        dec!(1000)
    );
}

#[test]
fn deleting_a_parent_cascades_to_spawned_transactions() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let vault = AccountService::add(
        &mut ledger,
        Account::new(owner, "Tax Vault", AccountKind::VirtualTax),
    )
    .unwrap();

    let txn = income(owner, checking, dec!(1000))
        .with_tax_percentage(dec!(20));
    let id = TransactionService::create(&mut ledger, txn).unwrap();
    assert_eq!(ledger.transaction_count(), 2);

    TransactionService::delete(&mut ledger, id, owner).unwrap();
    assert_eq!(ledger.transaction_count(), 0);
    assert_eq!(AccountService::balance(&ledger, vault).unwrap(), dec!(0));
    assert_eq!(AccountService::balance(&ledger, checking).unwrap(), dec!(0));
}

#[test]
fn changing_the_tax_percentage_updates_the_spawned_withholding_in_place() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let vault = AccountService::add(
        &mut ledger,
        Account::new(owner, "Tax Vault", AccountKind::VirtualTax),
    )
    .unwrap();
    let id = TransactionService::create(
        &mut ledger,
        income(owner, checking, dec!(1000)).with_tax_percentage(dec!(20)),
    )
    .unwrap();

    TransactionService::update(&mut ledger, id, |txn| {
        txn.tax_percentage = Some(dec!(10));
    })
    .unwrap();

    assert_eq!(ledger.children_of(id).len(), 1);
    assert_eq!(AccountService::balance(&ledger, vault).unwrap(), dec!(100));

    TransactionService::update(&mut ledger, id, |txn| {
        txn.tax_percentage = None;
    })
    .unwrap();
    assert!(ledger.children_of(id).is_empty());
    assert_eq!(AccountService::balance(&ledger, vault).unwrap(), dec!(0));
}

#[test]
fn internal_transfer_moves_money_between_accounts() {
    let (mut ledger, owner, checking) = prepared_ledger();
    let savings = AccountService::add(
        &mut ledger,
        Account::new(owner, "Savings", AccountKind::Investment),
    )
    .unwrap();
    TransactionService::create(&mut ledger, income(owner, checking, dec!(300))).unwrap();

    let transfer = Transaction::new(
        owner,
        TransactionKind::Internal,
        dec!(120),
        "to savings",
        Utc::now(),
    )
    .with_origin(checking)
    .with_destination(savings);
    TransactionService::create(&mut ledger, transfer).unwrap();

    assert_eq!(AccountService::balance(&ledger, checking).unwrap(), dec!(180));
    assert_eq!(AccountService::balance(&ledger, savings).unwrap(), dec!(120));
}
