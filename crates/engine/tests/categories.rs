use chrono::Utc;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    AccountKind, CategoryKind, Engine, EngineError, NewAccountCmd, NewCategoryCmd,
    PostTransactionCmd, TransactionKind, UpdateCategoryCmd,
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

async fn category(engine: &Engine, name: &str, parent_id: Option<Uuid>) -> Uuid {
    let mut cmd = NewCategoryCmd::new("alice", name, CategoryKind::Expense);
    if let Some(parent_id) = parent_id {
        cmd = cmd.parent_id(parent_id);
    }
    engine.new_category(cmd).await.unwrap().id
}

#[tokio::test]
async fn duplicate_name_at_same_level_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    category(&engine, "Food", None).await;

    let err = engine
        .new_category(NewCategoryCmd::new("alice", "Food", CategoryKind::Expense))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("Food".to_string()));
}

#[tokio::test]
async fn same_name_under_different_parents_is_fine() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "Food", None).await;
    let travel = category(&engine, "Travel", None).await;

    category(&engine, "Misc", Some(food)).await;
    category(&engine, "Misc", Some(travel)).await;

    let forest = engine.list_categories("alice").await.unwrap();
    assert_eq!(forest.len(), 2);
    assert!(forest.iter().all(|node| node.children.len() == 1));
}

#[tokio::test]
async fn unknown_parent_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_category(
            NewCategoryCmd::new("alice", "Food", CategoryKind::Expense)
                .parent_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("category not exists".to_string())
    );
}

#[tokio::test]
async fn reparenting_onto_a_descendant_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let a = category(&engine, "A", None).await;
    let b = category(&engine, "B", Some(a)).await;
    let c = category(&engine, "C", Some(b)).await;

    let err = engine
        .update_category(UpdateCategoryCmd::new("alice", a).parent_id(c))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryCycle(_)));

    let err = engine
        .update_category(UpdateCategoryCmd::new("alice", a).parent_id(a))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryCycle(_)));
}

#[tokio::test]
async fn reparenting_to_a_valid_parent_moves_the_subtree() {
    let (engine, _db) = engine_with_db().await;
    let a = category(&engine, "A", None).await;
    let b = category(&engine, "B", None).await;
    let child = category(&engine, "Child", Some(a)).await;

    let updated = engine
        .update_category(UpdateCategoryCmd::new("alice", child).parent_id(b))
        .await
        .unwrap();
    assert_eq!(updated.parent_id, Some(b));

    let forest = engine.list_categories("alice").await.unwrap();
    let b_node = forest
        .iter()
        .find(|node| node.category.id == b)
        .unwrap();
    assert_eq!(b_node.children.len(), 1);
    assert_eq!(b_node.children[0].category.id, child);
}

#[tokio::test]
async fn delete_is_blocked_while_subcategories_exist() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "Food", None).await;
    category(&engine, "Groceries", Some(food)).await;

    let err = engine.delete_category(food, "alice").await.unwrap_err();
    assert!(matches!(err, EngineError::HasDependents(_)));
}

#[tokio::test]
async fn referenced_category_is_soft_deleted() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "Food", None).await;
    let account_id = engine
        .new_account(
            NewAccountCmd::new("alice", "Checking", AccountKind::Bank)
                .opening_balance_minor(10_000),
        )
        .await
        .unwrap()
        .id;

    engine
        .post_transaction(PostTransactionCmd::new(
            "alice",
            account_id,
            food,
            TransactionKind::Expense,
            100,
            Utc::now(),
        ))
        .await
        .unwrap();

    engine.delete_category(food, "alice").await.unwrap();

    let still_there = engine.category(food, "alice").await.unwrap();
    assert!(!still_there.active);
}

#[tokio::test]
async fn unreferenced_category_is_hard_deleted() {
    let (engine, _db) = engine_with_db().await;
    let food = category(&engine, "Food", None).await;

    engine.delete_category(food, "alice").await.unwrap();

    let err = engine.category(food, "alice").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("category not exists".to_string())
    );
}
