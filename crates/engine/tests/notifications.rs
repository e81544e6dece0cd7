use chrono::{Duration, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, BudgetPeriod, CategoryKind, Engine, EngineError, NewAccountCmd, NewBudgetCmd,
    NewCategoryCmd, PostTransactionCmd, TransactionKind,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.unwrap();
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

/// Overspends a fresh one-category budget `times` times, leaving one stored
/// alert per overspending post.
async fn overspend(engine: &Engine, times: usize) {
    let account_id = engine
        .new_account(
            NewAccountCmd::new("alice", "Checking", AccountKind::Bank)
                .opening_balance_minor(1_000_000),
        )
        .await
        .unwrap()
        .id;
    let category_id = engine
        .new_category(NewCategoryCmd::new("alice", "Food", CategoryKind::Expense))
        .await
        .unwrap()
        .id;

    let now = Utc::now();
    engine
        .new_budget(NewBudgetCmd::new(
            "alice",
            category_id,
            100,
            BudgetPeriod::Monthly,
            now - Duration::days(1),
            now + Duration::days(29),
        ))
        .await
        .unwrap();

    for _ in 0..times {
        engine
            .post_transaction(PostTransactionCmd::new(
                "alice",
                account_id,
                category_id,
                TransactionKind::Expense,
                500,
                now,
            ))
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn mark_read_flips_a_single_notification() {
    let (engine, _db) = engine_with_db().await;
    overspend(&engine, 2).await;

    assert_eq!(engine.unread_count("alice").await.unwrap(), 2);

    let notes = engine.list_notifications("alice", true, 10).await.unwrap();
    let marked = engine
        .mark_notification_read(notes[0].id, "alice")
        .await
        .unwrap();
    assert!(marked.read);

    assert_eq!(engine.unread_count("alice").await.unwrap(), 1);
    let unread = engine.list_notifications("alice", true, 10).await.unwrap();
    assert_eq!(unread.len(), 1);
    let all = engine.list_notifications("alice", false, 10).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn mark_all_clears_the_unread_set() {
    let (engine, _db) = engine_with_db().await;
    overspend(&engine, 3).await;

    let flipped = engine.mark_all_notifications_read("alice").await.unwrap();
    assert_eq!(flipped, 3);
    assert_eq!(engine.unread_count("alice").await.unwrap(), 0);

    // A second pass has nothing left to flip.
    let flipped = engine.mark_all_notifications_read("alice").await.unwrap();
    assert_eq!(flipped, 0);
}

#[tokio::test]
async fn marking_an_unknown_notification_fails() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .mark_notification_read(Uuid::new_v4(), "alice")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("notification not exists".to_string())
    );
}
