use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::{CurrentUser, ListQuery, path_id};
use crate::{
    AppState,
    error::{AppError, AppResult},
    insights::{
        detail::{CompanyDetail, GenreDetail, PersonDetail, YearDetail, YearKind},
        ranking::{self, RankedPerson, RankingFilter},
        retrospective::Retrospective,
        stats::{
            CompanyStats, EntityFilter, GenreStats, PersonFilter, PersonStats, StatsVariant, YearFilter, YearStats,
        },
        summary::HistorySummary,
    },
    models::Paginated,
    params::{current_year, parse_id, parse_page, parse_role, parse_year},
};

const PEOPLE_SORTS: [&str; 4] = ["average.desc", "average.asc", "count.asc", "count.desc"];
const ENTITY_SORTS: [&str; 5] = ["average.desc", "average.asc", "count.asc", "count.desc", "name.asc"];
const YEAR_SORTS: [&str; 6] = ["average.desc", "average.asc", "count.asc", "count.desc", "year.asc", "year.desc"];

fn entity_filter(q: &ListQuery) -> AppResult<EntityFilter> {
    Ok(EntityFilter {
        query: q.text(),
        id: parse_id("id", q.id.as_deref())?,
        tmdb_id: parse_id("tmdb_id", q.tmdb_id.as_deref())?,
    })
}

fn year_filter(q: &ListQuery) -> AppResult<YearFilter> {
    let now = current_year();
    Ok(YearFilter {
        year: parse_year("year", q.year.as_deref(), now)?,
        query: parse_year("query", q.query.as_deref(), now)?,
    })
}

fn path_year(raw: &str) -> AppResult<i16> {
    parse_year("year", Some(raw), current_year())?.ok_or_else(|| AppError::validation("year", "missing"))
}

pub async fn summary(State(state): State<Arc<AppState>>, CurrentUser(user_id): CurrentUser) -> AppResult<Json<HistorySummary>> {
    Ok(Json(state.store.history_summary(user_id).await?))
}

async fn person_stats(
    state: &AppState,
    user_id: i32,
    q: &ListQuery,
    variant: StatsVariant,
) -> AppResult<Paginated<PersonStats>> {
    let params = q.resolve(state, user_id, &PEOPLE_SORTS, "count.desc").await?;
    let filter = PersonFilter {
        entity: entity_filter(q)?,
        role: parse_role(q.role.as_deref())?,
        gender: parse_id("gender", q.gender.as_deref())?,
    };
    state.store.person_stats(user_id, &params, &filter, variant).await
}

async fn company_stats(
    state: &AppState,
    user_id: i32,
    q: &ListQuery,
    variant: StatsVariant,
) -> AppResult<Paginated<CompanyStats>> {
    let params = q.resolve(state, user_id, &ENTITY_SORTS, "name.asc").await?;
    state.store.company_stats(user_id, &params, &entity_filter(q)?, variant).await
}

async fn genre_stats(state: &AppState, user_id: i32, q: &ListQuery) -> AppResult<Paginated<GenreStats>> {
    let params = q.resolve(state, user_id, &ENTITY_SORTS, "name.asc").await?;
    state.store.genre_stats(user_id, &params, &entity_filter(q)?).await
}

async fn release_year_stats(state: &AppState, user_id: i32, q: &ListQuery) -> AppResult<Paginated<YearStats>> {
    let params = q.resolve(state, user_id, &YEAR_SORTS, "year.desc").await?;
    state.store.release_year_stats(user_id, &params, &year_filter(q)?).await
}

async fn watched_year_stats(state: &AppState, user_id: i32, q: &ListQuery) -> AppResult<Paginated<YearStats>> {
    let params = q.resolve(state, user_id, &YEAR_SORTS, "year.desc").await?;
    state.store.watched_year_stats(user_id, &params, &year_filter(q)?).await
}

pub async fn people(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<PersonStats>>> {
    person_stats(&state, user_id, &q, StatsVariant::Insights).await.map(Json)
}

pub async fn rankings(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<RankedPerson>>> {
    let page = parse_page(q.page.as_deref())?;
    let filter = RankingFilter { role: parse_role(q.role.as_deref())?, gender: parse_id("gender", q.gender.as_deref())? };
    ranking::rank(&state.store, user_id, filter, page).await.map(Json)
}

pub async fn person(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<PersonDetail>> {
    state.store.person_detail(user_id, path_id("id", &id)?).await.map(Json)
}

pub async fn genres(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<GenreStats>>> {
    genre_stats(&state, user_id, &q).await.map(Json)
}

pub async fn genre(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<GenreDetail>> {
    state.store.genre_detail(user_id, path_id("id", &id)?).await.map(Json)
}

pub async fn companies(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<CompanyStats>>> {
    company_stats(&state, user_id, &q, StatsVariant::Insights).await.map(Json)
}

pub async fn company(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<CompanyDetail>> {
    state.store.company_detail(user_id, path_id("id", &id)?).await.map(Json)
}

pub async fn release_years(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<YearStats>>> {
    release_year_stats(&state, user_id, &q).await.map(Json)
}

pub async fn release_year(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(year): Path<String>,
) -> AppResult<Json<YearDetail>> {
    state.store.year_detail(user_id, YearKind::Release, path_year(&year)?).await.map(Json)
}

pub async fn watched_years(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<YearStats>>> {
    watched_year_stats(&state, user_id, &q).await.map(Json)
}

pub async fn watched_year(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(year): Path<String>,
) -> AppResult<Json<YearDetail>> {
    state.store.year_detail(user_id, YearKind::Watched, path_year(&year)?).await.map(Json)
}

pub async fn retrospective(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(year): Path<String>,
) -> AppResult<Json<Retrospective>> {
    state.store.retrospective(user_id, path_year(&year)?).await.map(Json)
}

pub async fn report_people(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<PersonStats>>> {
    person_stats(&state, user_id, &q, StatsVariant::Reports).await.map(Json)
}

pub async fn report_genres(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<GenreStats>>> {
    genre_stats(&state, user_id, &q).await.map(Json)
}

pub async fn report_companies(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<CompanyStats>>> {
    company_stats(&state, user_id, &q, StatsVariant::Reports).await.map(Json)
}

pub async fn report_release_years(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<YearStats>>> {
    release_year_stats(&state, user_id, &q).await.map(Json)
}

pub async fn report_watched_years(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Query(q): Query<ListQuery>,
) -> AppResult<Json<Paginated<YearStats>>> {
    watched_year_stats(&state, user_id, &q).await.map(Json)
}
