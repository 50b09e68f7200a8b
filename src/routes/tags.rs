use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use super::{CurrentUser, JsonBody, path_id};
use crate::{
    AppState,
    entities::tag,
    error::AppResult,
    tags::{NewTag, TagChanges},
};

pub async fn list(State(state): State<Arc<AppState>>, CurrentUser(user_id): CurrentUser) -> AppResult<Json<Vec<tag::Model>>> {
    state.store.list_tags(user_id).await.map(Json)
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(new): JsonBody<NewTag>,
) -> AppResult<(StatusCode, Json<tag::Model>)> {
    let tag = state.store.create_tag(user_id, new).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<TagChanges>,
) -> AppResult<Json<tag::Model>> {
    state.store.update_tag(user_id, path_id("id", &id)?, changes).await.map(Json)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.remove_tag(user_id, path_id("id", &id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}
