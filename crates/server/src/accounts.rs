//! Accounts API endpoints

use api_types::account::{
    AccountBalanceView, AccountKind as ApiKind, AccountNew, AccountUpdate, AccountView,
    TransferNew, TransferResult,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::AccountKind) -> ApiKind {
    match kind {
        engine::AccountKind::Bank => ApiKind::Bank,
        engine::AccountKind::MobileMoney => ApiKind::MobileMoney,
        engine::AccountKind::Cash => ApiKind::Cash,
        engine::AccountKind::CreditCard => ApiKind::CreditCard,
        engine::AccountKind::Other => ApiKind::Other,
    }
}

fn map_kind_in(kind: ApiKind) -> engine::AccountKind {
    match kind {
        ApiKind::Bank => engine::AccountKind::Bank,
        ApiKind::MobileMoney => engine::AccountKind::MobileMoney,
        ApiKind::Cash => engine::AccountKind::Cash,
        ApiKind::CreditCard => engine::AccountKind::CreditCard,
        ApiKind::Other => engine::AccountKind::Other,
    }
}

fn map_currency(currency: engine::Currency) -> api_types::Currency {
    match currency {
        engine::Currency::Usd => api_types::Currency::Usd,
        engine::Currency::Eur => api_types::Currency::Eur,
        engine::Currency::Gbp => api_types::Currency::Gbp,
    }
}

fn map_currency_in(currency: api_types::Currency) -> engine::Currency {
    match currency {
        api_types::Currency::Usd => engine::Currency::Usd,
        api_types::Currency::Eur => engine::Currency::Eur,
        api_types::Currency::Gbp => engine::Currency::Gbp,
    }
}

fn view(account: engine::Account) -> AccountView {
    AccountView {
        id: account.id,
        name: account.name,
        kind: map_kind(account.kind),
        balance_minor: account.balance_minor,
        currency: map_currency(account.currency),
        description: account.description,
        active: account.active,
        created_at: account.created_at.fixed_offset(),
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<AccountNew>,
) -> Result<(StatusCode, Json<AccountView>), ServerError> {
    let mut cmd = engine::NewAccountCmd::new(
        user.username.clone(),
        payload.name,
        map_kind_in(payload.kind),
    );
    if let Some(balance_minor) = payload.opening_balance_minor {
        cmd = cmd.opening_balance_minor(balance_minor);
    }
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(map_currency_in(currency));
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let account = state.engine.new_account(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(account))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<AccountView>>, ServerError> {
    let accounts = state.engine.list_accounts(&user.username).await?;
    Ok(Json(accounts.into_iter().map(view).collect()))
}

pub async fn get_one(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountView>, ServerError> {
    let account = state.engine.account(id, &user.username).await?;
    Ok(Json(view(account)))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<AccountView>, ServerError> {
    let mut cmd = engine::UpdateAccountCmd::new(user.username.clone(), id);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(kind) = payload.kind {
        cmd = cmd.kind(map_kind_in(kind));
    }
    if let Some(currency) = payload.currency {
        cmd = cmd.currency(map_currency_in(currency));
    }
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }
    if let Some(active) = payload.active {
        cmd = cmd.active(active);
    }

    let account = state.engine.update_account(cmd).await?;
    Ok(Json(view(account)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_account(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn balance(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AccountBalanceView>, ServerError> {
    let balance = state.engine.account_balance(id, &user.username).await?;
    Ok(Json(AccountBalanceView {
        account: view(balance.account),
        computed_minor: balance.computed_minor,
        total_income_minor: balance.total_income_minor,
        total_expenses_minor: balance.total_expenses_minor,
    }))
}

pub async fn transfer(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TransferNew>,
) -> Result<(StatusCode, Json<TransferResult>), ServerError> {
    let occurred_at = payload
        .occurred_at
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut cmd = engine::TransferCmd::new(
        user.username.clone(),
        payload.from_account_id,
        payload.to_account_id,
        payload.category_id,
        payload.amount_minor,
        occurred_at,
    );
    if let Some(description) = payload.description {
        cmd = cmd.description(description);
    }

    let (from_account, to_account) = state.engine.transfer(cmd).await?;
    Ok((
        StatusCode::CREATED,
        Json(TransferResult {
            from_account: view(from_account),
            to_account: view(to_account),
        }),
    ))
}
