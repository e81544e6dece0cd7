//! Budgets API endpoints

use api_types::budget::{
    BudgetNew, BudgetPeriod as ApiPeriod, BudgetSweepResult, BudgetUpdate, BudgetView,
};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_period(period: engine::BudgetPeriod) -> ApiPeriod {
    match period {
        engine::BudgetPeriod::Daily => ApiPeriod::Daily,
        engine::BudgetPeriod::Weekly => ApiPeriod::Weekly,
        engine::BudgetPeriod::Monthly => ApiPeriod::Monthly,
        engine::BudgetPeriod::Yearly => ApiPeriod::Yearly,
    }
}

fn map_period_in(period: ApiPeriod) -> engine::BudgetPeriod {
    match period {
        ApiPeriod::Daily => engine::BudgetPeriod::Daily,
        ApiPeriod::Weekly => engine::BudgetPeriod::Weekly,
        ApiPeriod::Monthly => engine::BudgetPeriod::Monthly,
        ApiPeriod::Yearly => engine::BudgetPeriod::Yearly,
    }
}

fn view(budget: engine::Budget) -> BudgetView {
    BudgetView {
        id: budget.id,
        category_id: budget.category_id,
        amount_minor: budget.amount_minor,
        spent_minor: budget.spent_minor,
        period: map_period(budget.period),
        start_date: budget.start_date.fixed_offset(),
        end_date: budget.end_date.fixed_offset(),
        notifications: budget.notifications,
    }
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<BudgetNew>,
) -> Result<(StatusCode, Json<BudgetView>), ServerError> {
    let mut cmd = engine::NewBudgetCmd::new(
        user.username.clone(),
        payload.category_id,
        payload.amount_minor,
        map_period_in(payload.period),
        payload.start_date.with_timezone(&Utc),
        payload.end_date.with_timezone(&Utc),
    );
    if let Some(notifications) = payload.notifications {
        cmd = cmd.notifications(notifications);
    }

    let budget = state.engine.new_budget(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(budget))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<BudgetView>>, ServerError> {
    let budgets = state.engine.list_budgets(&user.username).await?;
    Ok(Json(budgets.into_iter().map(view).collect()))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BudgetUpdate>,
) -> Result<Json<BudgetView>, ServerError> {
    let mut cmd = engine::UpdateBudgetCmd::new(user.username.clone(), id);
    if let Some(amount_minor) = payload.amount_minor {
        cmd = cmd.amount_minor(amount_minor);
    }
    if let Some(start_date) = payload.start_date {
        cmd = cmd.start_date(start_date.with_timezone(&Utc));
    }
    if let Some(end_date) = payload.end_date {
        cmd = cmd.end_date(end_date.with_timezone(&Utc));
    }
    if let Some(notifications) = payload.notifications {
        cmd = cmd.notifications(notifications);
    }

    let budget = state.engine.update_budget(cmd).await?;
    Ok(Json(view(budget)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_budget(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sweep(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<BudgetSweepResult>, ServerError> {
    let alerts_sent = state
        .engine
        .sweep_budgets(&user.username, Utc::now())
        .await?;
    Ok(Json(BudgetSweepResult { alerts_sent }))
}
