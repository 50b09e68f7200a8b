use std::sync::Arc;

use axum::{Json, extract::State};

use super::{CurrentUser, JsonBody};
use crate::{
    AppState,
    error::AppResult,
    users::{Profile, ProfileChanges},
};

pub async fn profile(State(state): State<Arc<AppState>>, CurrentUser(user_id): CurrentUser) -> AppResult<Json<Profile>> {
    state.store.profile(user_id).await.map(Json)
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    JsonBody(changes): JsonBody<ProfileChanges>,
) -> AppResult<Json<Profile>> {
    state.store.update_profile(user_id, changes).await.map(Json)
}
