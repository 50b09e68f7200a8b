use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;

use super::{CurrentUser, JsonBody, path_id};
use crate::{
    AppState,
    catalog::{MovieDetails, MoviePayload, RatingPayload},
    error::AppResult,
};

#[derive(Debug, Deserialize)]
pub struct RatingsBody {
    pub ratings: Vec<RatingPayload>,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    JsonBody(payload): JsonBody<MoviePayload>,
) -> AppResult<(StatusCode, Json<MovieDetails>)> {
    let movie = state.store.ingest_movie(payload).await?;
    Ok((StatusCode::CREATED, Json(movie)))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<MovieDetails>> {
    state.store.get_movie(path_id("id", &id)?).await.map(Json)
}

pub async fn update_ratings(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    Path(tmdb_id): Path<String>,
    JsonBody(body): JsonBody<RatingsBody>,
) -> AppResult<Json<MovieDetails>> {
    state.store.update_ratings(path_id("tmdb_id", &tmdb_id)?, body.ratings).await.map(Json)
}
