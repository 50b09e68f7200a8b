mod histories;
mod insights;
mod movies;
mod tags;
mod users;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts},
    http::request::Parts,
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState,
    error::{AppError, AppResult},
    params::{ResolvedParams, parse_id, parse_page, parse_rating_source, parse_sort_by, resolve_for_user},
};

/// Set by the auth gateway in front of this service.
pub const USER_HEADER: &str = "x-user-id";

/// The authenticated caller.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub i32);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i32>().ok())
            .filter(|id| *id > 0)
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// `Json` whose rejection renders like every other error.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Every query parameter the list endpoints understand. Each endpoint reads
/// the ones that apply to it and validates them itself.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub sort_by: Option<String>,
    pub selected_rating: Option<String>,
    pub id: Option<String>,
    pub tmdb_id: Option<String>,
    pub query: Option<String>,
    pub gender: Option<String>,
    pub role: Option<String>,
    pub year: Option<String>,
    pub genre_id: Option<String>,
    pub person_id: Option<String>,
    pub company_id: Option<String>,
    pub release_year: Option<String>,
    pub watched_year: Option<String>,
}

impl ListQuery {
    pub fn text(&self) -> Option<String> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty()).map(str::to_string)
    }

    /// Page, sort and rating source for the stats endpoints.
    pub async fn resolve(
        &self,
        state: &AppState,
        user_id: i32,
        allowed_sorts: &[&str],
        default_sort: &str,
    ) -> AppResult<ResolvedParams> {
        let page = parse_page(self.page.as_deref())?;
        let sort_by = parse_sort_by(self.sort_by.as_deref(), allowed_sorts, default_sort)?;
        let selected = parse_rating_source(self.selected_rating.as_deref())?;
        resolve_for_user(&state.store, user_id, page, sort_by, selected, state.config.default_rating_source).await
    }
}

pub fn path_id(field: &'static str, raw: &str) -> AppResult<i32> {
    parse_id(field, Some(raw))?.ok_or_else(|| AppError::validation(field, "missing"))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let insight_routes = Router::new()
        .route("/", get(insights::summary))
        .route("/people", get(insights::people))
        .route("/people/rankings", get(insights::rankings))
        .route("/people/{id}", get(insights::person))
        .route("/genres", get(insights::genres))
        .route("/genres/{id}", get(insights::genre))
        .route("/companies", get(insights::companies))
        .route("/companies/{id}", get(insights::company))
        .route("/release-years", get(insights::release_years))
        .route("/release-years/{year}", get(insights::release_year))
        .route("/watched-years", get(insights::watched_years))
        .route("/watched-years/{year}", get(insights::watched_year))
        .route("/retrospective/{year}", get(insights::retrospective));

    let report_routes = Router::new()
        .route("/person", get(insights::report_people))
        .route("/genres", get(insights::report_genres))
        .route("/companies", get(insights::report_companies))
        .route("/release-year", get(insights::report_release_years))
        .route("/watched-year", get(insights::report_watched_years));

    let me = Router::new()
        .route("/", get(users::profile).patch(users::update_profile))
        .route("/histories", get(histories::list).post(histories::create))
        .route("/histories/{id}", patch(histories::update).delete(histories::remove))
        .route("/histories/{id}/tags", put(histories::sync_tags))
        .route("/tags", get(tags::list).post(tags::create))
        .route("/tags/{id}", patch(tags::update).delete(tags::remove))
        .nest("/insights", insight_routes)
        .nest("/reports", report_routes);

    Router::new()
        .route("/health", get(health))
        .route("/movies", post(movies::ingest))
        .route("/movies/{id}", get(movies::get))
        .route("/movies/tmdb/{tmdb_id}/ratings", put(movies::update_ratings))
        .nest("/me", me)
        .with_state(state)
}
