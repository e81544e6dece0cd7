use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, BudgetPeriod, CategoryKind, Engine, EngineError, NewAccountCmd, NewBudgetCmd,
    NewCategoryCmd, NotificationDraft, NotificationKind, Notifier, PostTransactionCmd,
    TransactionKind, TransactionListFilter, TransferCmd,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = connect_memory_db().await;
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn connect_memory_db() -> DatabaseConnection {
    // A single pooled connection keeps the in-memory database shared and
    // serializes concurrent write transactions at the pool.
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    Database::connect(options).await.unwrap()
}

async fn bank_account(engine: &Engine, name: &str, balance_minor: i64) -> Uuid {
    engine
        .new_account(
            NewAccountCmd::new("alice", name, AccountKind::Bank)
                .opening_balance_minor(balance_minor),
        )
        .await
        .unwrap()
        .id
}

async fn expense_category(engine: &Engine, name: &str) -> Uuid {
    engine
        .new_category(NewCategoryCmd::new("alice", name, CategoryKind::Expense))
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn income_increases_balance_and_leaves_budgets_alone() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let now = Utc::now();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            20_000,
            BudgetPeriod::Monthly,
            now - Duration::days(1),
            now + Duration::days(29),
        ))
        .await
        .unwrap();

    let tx = engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Income,
            5_000,
            now,
        ))
        .await
        .unwrap();
    assert_eq!(tx.amount_minor, 5_000);

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 15_000);

    let txs = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);

    // Income never counts against a budget.
    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 0);
}

#[tokio::test]
async fn expense_decreases_balance() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            2_500,
            Utc::now(),
        ))
        .await
        .unwrap();

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 7_500);
}

#[tokio::test]
async fn overdraft_is_refused_and_rolled_back() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let err = engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            15_000,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("Checking".to_string()));

    // The transaction row inserted before the balance check must be gone.
    let txs = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(txs.is_empty());

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 10_000);
}

#[tokio::test]
async fn credit_card_may_go_negative() {
    let (engine, _db) = engine_with_db().await;
    let account_id = engine
        .new_account(NewAccountCmd::new("alice", "Visa", AccountKind::CreditCard))
        .await
        .unwrap()
        .id;
    let category_id = expense_category(&engine, "Food").await;

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            5_000,
            Utc::now(),
        ))
        .await
        .unwrap();

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, -5_000);
}

#[tokio::test]
async fn unknown_account_fails_with_not_found() {
    let (engine, _db) = engine_with_db().await;
    let category_id = expense_category(&engine, "Food").await;

    let err = engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            Uuid::new_v4(),
            category_id,
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test]
async fn unknown_category_fails_with_not_found() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;

    let err = engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            Uuid::new_v4(),
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("category not exists".to_string())
    );

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 10_000);
}

#[tokio::test]
async fn soft_deleted_account_rejects_postings() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await
        .unwrap();

    // Referenced by a transaction, so the delete only deactivates it.
    engine.delete_account(account_id, "alice").await.unwrap();
    let account = engine.account(account_id, "alice").await.unwrap();
    assert!(!account.active);

    let err = engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("account not exists".to_string()));
}

#[tokio::test]
async fn overspending_a_budget_records_one_alert() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 100_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let now = Utc::now();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            20_000,
            BudgetPeriod::Monthly,
            now - Duration::days(1),
            now + Duration::days(29),
        ))
        .await
        .unwrap();

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            18_000,
            now,
        ))
        .await
        .unwrap();

    // Still within the cap: charged, no alert.
    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 18_000);
    assert_eq!(engine.unread_count("alice").await.unwrap(), 0);

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            3_000,
            now,
        ))
        .await
        .unwrap();

    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 21_000);

    let notes = engine.list_notifications("alice", false, 10).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::BudgetExceeded);
    let payload = notes[0].payload.as_ref().unwrap();
    assert_eq!(payload["overspent_minor"], 1_000);
}

#[tokio::test]
async fn expense_outside_budget_window_does_not_charge_it() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 100_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let now = Utc::now();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            10_000,
            BudgetPeriod::Weekly,
            now - Duration::days(10),
            now - Duration::days(5),
        ))
        .await
        .unwrap();

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            30_000,
            now,
        ))
        .await
        .unwrap();

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 70_000);

    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 0);
    assert_eq!(engine.unread_count("alice").await.unwrap(), 0);
}

#[tokio::test]
async fn budget_window_endpoints_both_count() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 100_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let start = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            50_000,
            BudgetPeriod::Monthly,
            start,
            end,
        ))
        .await
        .unwrap();

    for (amount, at) in [
        (100, start),
        (200, end),
        (400, end + Duration::seconds(1)),
    ] {
        engine
            .post_transaction(PostTransactionCmd::new(
                "alice",
                account_id,
                category_id,
                TransactionKind::Expense,
                amount,
                at,
            ))
            .await
            .unwrap();
    }

    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 300);
}

#[tokio::test]
async fn posting_twice_is_not_idempotent() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let cmd = PostTransactionCmd::new(
        "alice",
        account_id,
        category_id,
        TransactionKind::Expense,
        1_000,
        Utc::now(),
    );
    let first = engine.post_transaction(cmd.clone()).await.unwrap();
    let second = engine.post_transaction(cmd).await.unwrap();
    assert_ne!(first.id, second.id);

    let txs = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(txs.len(), 2);

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 8_000);
}

#[tokio::test]
async fn concurrent_posts_do_not_lose_updates() {
    let (engine, _db) = engine_with_db().await;
    let account_id = bank_account(&engine, "Checking", 10_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let engine = Arc::new(engine);
    let income = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .post_transaction(PostTransactionCmd::new(
                    "alice",
                    account_id,
                    category_id,
                    TransactionKind::Income,
                    1_000,
                    Utc::now(),
                ))
                .await
        })
    };
    let expense = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .post_transaction(PostTransactionCmd::new(
                    "alice",
                    account_id,
                    category_id,
                    TransactionKind::Expense,
                    500,
                    Utc::now(),
                ))
                .await
        })
    };

    income.await.unwrap().unwrap();
    expense.await.unwrap().unwrap();

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 10_500);
}

struct FailingNotifier;

#[async_trait::async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _draft: NotificationDraft) -> Result<(), EngineError> {
        Err(EngineError::InvalidInput(
            "delivery channel down".to_string(),
        ))
    }
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_posting() {
    let db = connect_memory_db().await;
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (username, password) VALUES (?, ?)",
        vec!["alice".into(), "password".into()],
    ))
    .await
    .unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .notifier(Arc::new(FailingNotifier))
        .build()
        .await
        .unwrap();

    let account_id = bank_account(&engine, "Checking", 100_000).await;
    let category_id = expense_category(&engine, "Food").await;

    let now = Utc::now();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            1_000,
            BudgetPeriod::Monthly,
            now - Duration::days(1),
            now + Duration::days(29),
        ))
        .await
        .unwrap();

    // Overspends immediately; the alert delivery blows up but the posting
    // must still commit.
    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            category_id,
            TransactionKind::Expense,
            5_000,
            now,
        ))
        .await
        .unwrap();

    let account = engine.account(account_id, "alice").await.unwrap();
    assert_eq!(account.balance_minor, 95_000);
    let budgets = engine.list_budgets("alice").await.unwrap();
    assert_eq!(budgets[0].spent_minor, 5_000);
}

#[tokio::test]
async fn transfer_moves_funds_and_records_both_sides() {
    let (engine, _db) = engine_with_db().await;
    let from_id = bank_account(&engine, "Checking", 10_000).await;
    let to_id = bank_account(&engine, "Savings", 0).await;
    let category_id = expense_category(&engine, "Transfers").await;

    let (from, to) = engine
        .transfer(TransferCmd::new(
            "alice",
            from_id,
            to_id,
            category_id,
            2_500,
            Utc::now(),
        ))
        .await
        .unwrap();
    assert_eq!(from.balance_minor, 7_500);
    assert_eq!(to.balance_minor, 2_500);

    let out_side = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                account_id: Some(from_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(out_side.len(), 1);
    assert_eq!(out_side[0].kind, TransactionKind::Expense);
    assert_eq!(out_side[0].description.as_deref(), Some("Transfer to Savings"));

    let in_side = engine
        .list_transactions(
            "alice",
            &TransactionListFilter {
                account_id: Some(to_id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(in_side.len(), 1);
    assert_eq!(in_side[0].kind, TransactionKind::Income);
}

#[tokio::test]
async fn transfer_with_insufficient_funds_leaves_no_trace() {
    let (engine, _db) = engine_with_db().await;
    let from_id = bank_account(&engine, "Checking", 1_000).await;
    let to_id = bank_account(&engine, "Savings", 0).await;
    let category_id = expense_category(&engine, "Transfers").await;

    let err = engine
        .transfer(TransferCmd::new(
            "alice",
            from_id,
            to_id,
            category_id,
            2_500,
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::InsufficientFunds("Checking".to_string()));

    let txs = engine
        .list_transactions("alice", &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(txs.is_empty());
    assert_eq!(
        engine.account(from_id, "alice").await.unwrap().balance_minor,
        1_000
    );
    assert_eq!(
        engine.account(to_id, "alice").await.unwrap().balance_minor,
        0
    );
}
