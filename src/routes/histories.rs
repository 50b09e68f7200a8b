use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::{CurrentUser, JsonBody, ListQuery, path_id};
use crate::{
    AppState,
    entities::tag,
    error::AppResult,
    histories::{DEFAULT_HISTORY_SORT, HISTORY_SORTS, HistoryChanges, HistoryFilter, HistoryItem, HistoryRecord, NewHistory},
    models::Paginated,
    params::{current_year, parse_id, parse_page, parse_sort_by, parse_year},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagIds {
    pub tag_ids: Vec<i32>,
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<HistoryItem>>> {
    let page = parse_page(q.page.as_deref())?;
    let sort_by = parse_sort_by(q.sort_by.as_deref(), &HISTORY_SORTS, DEFAULT_HISTORY_SORT)?;
    let now = current_year();
    let filter = HistoryFilter {
        genre_id: parse_id("genre_id", q.genre_id.as_deref())?,
        person_id: parse_id("person_id", q.person_id.as_deref())?,
        company_id: parse_id("company_id", q.company_id.as_deref())?,
        release_year: parse_year("release_year", q.release_year.as_deref(), now)?,
        watched_year: parse_year("watched_year", q.watched_year.as_deref(), now)?,
        query: q.text(),
    };

    let histories =
        state.store.list_histories(user_id, &filter, page, sort_by, state.config.default_rating_source).await?;
    Ok(Json(histories))
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(new): JsonBody<NewHistory>,
) -> AppResult<(StatusCode, Json<HistoryRecord>)> {
    let created = state.store.create_history(user_id, new).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    JsonBody(changes): JsonBody<HistoryChanges>,
) -> AppResult<Json<HistoryRecord>> {
    state.store.update_history(user_id, path_id("id", &id)?, changes).await.map(Json)
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.store.remove_history(user_id, path_id("id", &id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn sync_tags(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<TagIds>,
) -> AppResult<Json<Vec<tag::Model>>> {
    state.store.sync_history_tags(user_id, path_id("id", &id)?, body.tag_ids).await.map(Json)
}
