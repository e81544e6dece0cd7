use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{accounts, budgets, categories, notifications, transactions, user};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(auth_header) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route(
            "/transactions",
            post(transactions::post_new).get(transactions::list),
        )
        .route("/transactions/summary", get(transactions::summary))
        .route("/accounts", post(accounts::create).get(accounts::list))
        .route(
            "/accounts/{id}",
            get(accounts::get_one)
                .patch(accounts::update)
                .delete(accounts::delete),
        )
        .route("/accounts/{id}/balance", get(accounts::balance))
        .route("/accounts/transfer", post(accounts::transfer))
        .route("/categories", post(categories::create).get(categories::list))
        .route(
            "/categories/{id}",
            axum::routing::patch(categories::update).delete(categories::delete),
        )
        .route("/budgets", post(budgets::create).get(budgets::list))
        .route(
            "/budgets/{id}",
            axum::routing::patch(budgets::update).delete(budgets::delete),
        )
        .route("/budgets/sweep", post(budgets::sweep))
        .route("/notifications", get(notifications::list))
        .route(
            "/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route(
            "/notifications/{id}/read",
            post(notifications::mark_read),
        )
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, Statement};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    async fn test_state() -> ServerState {
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

        let engine = Engine::builder().database(db.clone()).build().await.unwrap();
        ServerState {
            engine: Arc::new(engine),
            db,
        }
    }

    fn basic_auth() -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode("alice:password");
        format!("Basic {encoded}")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, basic_auth())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn create_account(router: &Router, balance_minor: i64) -> Value {
        let response = router
            .clone()
            .oneshot(post_json(
                "/accounts",
                json!({
                    "name": "Checking",
                    "kind": "bank",
                    "opening_balance_minor": balance_minor,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn create_category(router: &Router, name: &str) -> Value {
        let response = router
            .clone()
            .oneshot(post_json(
                "/categories",
                json!({ "name": name, "kind": "expense" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    #[tokio::test]
    async fn missing_credentials_is_unauthorized() {
        let router = router(test_state().await);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/accounts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn posting_a_transaction_returns_201_and_the_transaction() {
        let router = router(test_state().await);
        let account = create_account(&router, 10_000).await;
        let category = create_category(&router, "Food").await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/transactions",
                json!({
                    "account_id": account["id"],
                    "category_id": category["id"],
                    "kind": "expense",
                    "amount_minor": 2_500,
                    "description": "Lunch",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["kind"], "expense");
        assert_eq!(body["amount_minor"], 2_500);

        let response = router
            .oneshot(
                Request::builder()
                    .uri(format!("/accounts/{}", account["id"].as_str().unwrap()))
                    .header(header::AUTHORIZATION, basic_auth())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["balance_minor"], 7_500);
    }

    #[tokio::test]
    async fn unknown_account_is_404() {
        let router = router(test_state().await);
        let category = create_category(&router, "Food").await;

        let response = router
            .oneshot(post_json(
                "/transactions",
                json!({
                    "account_id": uuid::Uuid::new_v4(),
                    "category_id": category["id"],
                    "kind": "expense",
                    "amount_minor": 100,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_positive_amount_is_400() {
        let router = router(test_state().await);
        let account = create_account(&router, 10_000).await;
        let category = create_category(&router, "Food").await;

        let response = router
            .oneshot(post_json(
                "/transactions",
                json!({
                    "account_id": account["id"],
                    "category_id": category["id"],
                    "kind": "expense",
                    "amount_minor": 0,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overdrawing_a_bank_account_is_409() {
        let router = router(test_state().await);
        let account = create_account(&router, 10_000).await;
        let category = create_category(&router, "Food").await;

        let response = router
            .clone()
            .oneshot(post_json(
                "/transactions",
                json!({
                    "account_id": account["id"],
                    "category_id": category["id"],
                    "kind": "expense",
                    "amount_minor": 15_000,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        // The refused posting left no trace in the ledger.
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/transactions")
                    .header(header::AUTHORIZATION, basic_auth())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["transactions"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn duplicate_account_name_is_409() {
        let router = router(test_state().await);
        create_account(&router, 0).await;

        let response = router
            .oneshot(post_json(
                "/accounts",
                json!({ "name": "Checking", "kind": "bank" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
