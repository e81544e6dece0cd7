//! Categories API endpoints

use api_types::category::{CategoryKind as ApiKind, CategoryNew, CategoryUpdate, CategoryView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

fn map_kind(kind: engine::CategoryKind) -> ApiKind {
    match kind {
        engine::CategoryKind::Expense => ApiKind::Expense,
        engine::CategoryKind::Income => ApiKind::Income,
    }
}

fn map_kind_in(kind: ApiKind) -> engine::CategoryKind {
    match kind {
        ApiKind::Expense => engine::CategoryKind::Expense,
        ApiKind::Income => engine::CategoryKind::Income,
    }
}

fn leaf_view(category: engine::Category) -> CategoryView {
    CategoryView {
        id: category.id,
        name: category.name,
        kind: map_kind(category.kind),
        parent_id: category.parent_id,
        active: category.active,
        children: Vec::new(),
    }
}

fn node_view(node: engine::CategoryNode) -> CategoryView {
    let mut view = leaf_view(node.category);
    view.children = node.children.into_iter().map(node_view).collect();
    view
}

pub async fn create(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<CategoryView>), ServerError> {
    let mut cmd = engine::NewCategoryCmd::new(
        user.username.clone(),
        payload.name,
        map_kind_in(payload.kind),
    );
    if let Some(parent_id) = payload.parent_id {
        cmd = cmd.parent_id(parent_id);
    }

    let category = state.engine.new_category(cmd).await?;
    Ok((StatusCode::CREATED, Json(leaf_view(category))))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let forest = state.engine.list_categories(&user.username).await?;
    Ok(Json(forest.into_iter().map(node_view).collect()))
}

pub async fn update(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryUpdate>,
) -> Result<Json<CategoryView>, ServerError> {
    let mut cmd = engine::UpdateCategoryCmd::new(user.username.clone(), id);
    if let Some(name) = payload.name {
        cmd = cmd.name(name);
    }
    if let Some(parent_id) = payload.parent_id {
        cmd = cmd.parent_id(parent_id);
    }

    let category = state.engine.update_category(cmd).await?;
    Ok(Json(leaf_view(category)))
}

pub async fn delete(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    state.engine.delete_category(id, &user.username).await?;
    Ok(StatusCode::NO_CONTENT)
}
