//! Transactions API endpoints

use api_types::transaction::{
    CategorySummaryView, SummaryParams, SummaryResponse, TransactionKind as ApiKind,
    TransactionListParams, TransactionListResponse, TransactionNew, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::TransactionKind) -> ApiKind {
    match kind {
        engine::TransactionKind::Income => ApiKind::Income,
        engine::TransactionKind::Expense => ApiKind::Expense,
    }
}

fn map_kind_in(kind: ApiKind) -> engine::TransactionKind {
    match kind {
        ApiKind::Income => engine::TransactionKind::Income,
        ApiKind::Expense => engine::TransactionKind::Expense,
    }
}

fn view(tx: engine::Transaction) -> TransactionView {
    TransactionView {
        id: tx.id,
        account_id: tx.account_id,
        category_id: tx.category_id,
        subcategory_id: tx.subcategory_id,
        kind: map_kind(tx.kind),
        amount_minor: tx.amount_minor,
        description: tx.description,
        occurred_at: tx.occurred_at.fixed_offset(),
        tags: tx.tags,
    }
}

pub async fn post_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let occurred_at = payload
        .occurred_at
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut cmd = engine::PostTransactionCmd::new(
        user.username.clone(),
        payload.account_id,
        payload.category_id,
        map_kind_in(payload.kind),
        payload.amount_minor,
        occurred_at,
    );
    if let Some(subcategory_id) = payload.subcategory_id {
        cmd = cmd.subcategory_id(subcategory_id);
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(tags) = payload.tags {
        cmd = cmd.tags(tags);
    }

    let tx = state.engine.post_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(tx))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(params): Query<TransactionListParams>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let filter = engine::TransactionListFilter {
        account_id: params.account_id,
        category_id: params.category_id,
        kind: params.kind.map(map_kind_in),
        from: params.from.map(|dt| dt.with_timezone(&Utc)),
        to: params.to.map(|dt| dt.with_timezone(&Utc)),
        limit: params.limit,
    };

    let transactions = state
        .engine
        .list_transactions(&user.username, &filter)
        .await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions.into_iter().map(view).collect(),
    }))
}

pub async fn summary(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, ServerError> {
    let totals = state
        .engine
        .transaction_summary(
            &user.username,
            params.from.with_timezone(&Utc),
            params.to.with_timezone(&Utc),
        )
        .await?;

    Ok(Json(SummaryResponse {
        totals: totals
            .into_iter()
            .map(|row| CategorySummaryView {
                category_id: row.category_id,
                kind: map_kind(row.kind),
                total_minor: row.total_minor,
            })
            .collect(),
    }))
}
