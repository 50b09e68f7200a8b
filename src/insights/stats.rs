use sea_orm::FromQueryResult;
use serde::Serialize;
use tracing::debug;

use super::query::{Dimension, Predicate, SortKey, StatsQuery, YearWindow, fetch_all, fetch_count};
use crate::{
    error::AppResult,
    models::{Paginated, RoleFilter},
    params::ResolvedParams,
    rating::round_to,
    store::Store,
};

/// Reports apply sample-size floors and a billing cutoff for cast.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatsVariant {
    Insights,
    Reports,
}

const REPORT_PERSON_MIN_APPEARANCES: u32 = 5;
const REPORT_COMPANY_MIN_APPEARANCES: u32 = 3;
const REPORT_CAST_MAX_BILLING: i32 = 20;

#[derive(Clone, Debug, Default)]
pub struct EntityFilter {
    pub query: Option<String>,
    pub id: Option<i32>,
    pub tmdb_id: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct PersonFilter {
    pub entity: EntityFilter,
    pub role: Option<RoleFilter>,
    pub gender: Option<i32>,
}

#[derive(Clone, Debug, Default)]
pub struct YearFilter {
    pub year: Option<i16>,
    pub query: Option<i16>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct PersonStats {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub appearances: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct GenreStats {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
    pub appearances: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct CompanyStats {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
    pub logo_path: Option<String>,
    pub appearances: i64,
    pub avg_rating: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct YearStats {
    pub year: i32,
    #[serde(rename = "count")]
    pub appearances: i64,
    pub avg_rating: Option<f64>,
}

trait StatsRow {
    fn avg_rating_mut(&mut self) -> &mut Option<f64>;
}

macro_rules! stats_row {
    ($($ty:ty),*) => {
        $(impl StatsRow for $ty {
            fn avg_rating_mut(&mut self) -> &mut Option<f64> {
                &mut self.avg_rating
            }
        })*
    };
}

stats_row!(PersonStats, GenreStats, CompanyStats, YearStats);

fn base_query(dimension: Dimension, user_id: i32, params: &ResolvedParams) -> StatsQuery {
    StatsQuery::new(dimension, user_id, params.rating_source, params.average_by)
        .sort(SortKey::from_column(&params.sort.column), params.sort.direction)
}

fn with_entity_filter(query: StatsQuery, filter: &EntityFilter) -> StatsQuery {
    query
        .filter_opt(filter.query.clone(), Predicate::NameContains)
        .filter_opt(filter.id, Predicate::EntityIdIs)
        .filter_opt(filter.tmdb_id, Predicate::TmdbIdIs)
}

fn sorts_by_average(params: &ResolvedParams) -> bool {
    SortKey::from_column(&params.sort.column) == Some(SortKey::Average)
}

impl Store {
    /// Runs the count and the page concurrently. Averages are rounded to one
    /// decimal only after the fetch.
    async fn run_stats<T>(&self, query: StatsQuery, params: &ResolvedParams) -> AppResult<Paginated<T>>
    where
        T: FromQueryResult + StatsRow + Send,
    {
        let count = query.count_statement();
        let page = query.page_statement(params.pagination);

        let (total, mut results) =
            futures::try_join!(fetch_count(self.db(), count), fetch_all::<T, _>(self.db(), page))?;

        for row in &mut results {
            let avg = row.avg_rating_mut();
            *avg = avg.map(|value| round_to(value, 1));
        }

        debug!(dimension = ?query.dimension, total, returned = results.len(), "stats page");
        Ok(Paginated { total, results })
    }

    pub async fn person_stats(
        &self,
        user_id: i32,
        params: &ResolvedParams,
        filter: &PersonFilter,
        variant: StatsVariant,
    ) -> AppResult<Paginated<PersonStats>> {
        let mut query = with_entity_filter(base_query(Dimension::Person, user_id, params), &filter.entity)
            .filter_opt(filter.role.map(RoleFilter::roles), Predicate::RoleIn)
            .filter_opt(filter.gender, Predicate::GenderIs);

        if variant == StatsVariant::Reports {
            if filter.role == Some(RoleFilter::Cast) {
                query = query.filter(Predicate::BillingOrderAtMost(REPORT_CAST_MAX_BILLING));
            }
            if sorts_by_average(params) {
                query = query.min_appearances(REPORT_PERSON_MIN_APPEARANCES);
            }
        }

        self.run_stats(query, params).await
    }

    pub async fn genre_stats(
        &self,
        user_id: i32,
        params: &ResolvedParams,
        filter: &EntityFilter,
    ) -> AppResult<Paginated<GenreStats>> {
        let query = with_entity_filter(base_query(Dimension::Genre, user_id, params), filter);
        self.run_stats(query, params).await
    }

    pub async fn company_stats(
        &self,
        user_id: i32,
        params: &ResolvedParams,
        filter: &EntityFilter,
        variant: StatsVariant,
    ) -> AppResult<Paginated<CompanyStats>> {
        let mut query = with_entity_filter(base_query(Dimension::Company, user_id, params), filter);
        if variant == StatsVariant::Reports && sorts_by_average(params) {
            query = query.min_appearances(REPORT_COMPANY_MIN_APPEARANCES);
        }
        self.run_stats(query, params).await
    }

    pub async fn release_year_stats(
        &self,
        user_id: i32,
        params: &ResolvedParams,
        filter: &YearFilter,
    ) -> AppResult<Paginated<YearStats>> {
        let mut query = base_query(Dimension::ReleaseYear, user_id, params);
        for year in [filter.year, filter.query].into_iter().flatten() {
            query = query.filter(Predicate::ReleasedWithin(YearWindow::new(year)?));
        }
        self.run_stats(query, params).await
    }

    pub async fn watched_year_stats(
        &self,
        user_id: i32,
        params: &ResolvedParams,
        filter: &YearFilter,
    ) -> AppResult<Paginated<YearStats>> {
        let mut query = base_query(Dimension::WatchedYear, user_id, params);
        for year in [filter.year, filter.query].into_iter().flatten() {
            query = query.filter(Predicate::WatchedWithin(YearWindow::new(year)?));
        }
        self.run_stats(query, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{RatingSource, Role},
        params::resolve,
        test_support as seed,
    };

    fn params(page: u64, sort_by: &str) -> ResolvedParams {
        resolve(page, sort_by, None, None, RatingSource::Imdb).unwrap()
    }

    #[tokio::test]
    async fn genre_average_over_three_histories() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let drama = seed::genre(db, 18, "Drama").await;

        for (tmdb, avg) in [(1, 6.0), (2, 8.0), (3, 10.0)] {
            let movie = seed::rated_movie(db, tmdb, "2010-05-01", avg).await;
            seed::link_genre(db, movie, drama).await;
            seed::history(db, user, movie, "2024-02-01", None).await;
        }

        let page = store.genre_stats(user, &params(1, "average.desc"), &EntityFilter::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].name, "Drama");
        assert_eq!(page.results[0].appearances, 3);
        assert_eq!(page.results[0].avg_rating, Some(8.0));
    }

    #[tokio::test]
    async fn total_counts_groups_not_joined_rows() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;

        let mut genres = Vec::new();
        for i in 0..25 {
            genres.push(seed::genre(db, 100 + i, &format!("Genre {i:02}")).await);
        }
        for m in 0..4 {
            let movie = seed::rated_movie(db, 500 + m, "2001-01-01", 7.0).await;
            for genre in &genres {
                seed::link_genre(db, movie, *genre).await;
            }
            seed::history(db, user, movie, "2023-03-03", None).await;
        }

        let first = store.genre_stats(user, &params(1, "name.asc"), &EntityFilter::default()).await.unwrap();
        let second = store.genre_stats(user, &params(2, "name.asc"), &EntityFilter::default()).await.unwrap();

        assert_eq!(first.total, 25);
        assert_eq!(second.total, 25);
        assert_eq!(first.results.len(), 20);
        assert_eq!(second.results.len(), 5);
        assert_eq!(first.results[0].name, "Genre 00");
        assert!(first.results.iter().chain(&second.results).all(|g| g.appearances == 4));
    }

    #[tokio::test]
    async fn stats_are_scoped_to_the_user_and_source() {
        let store = seed::setup_store().await;
        let db = store.db();
        let me = seed::user(db, "me@example.com").await;
        let other = seed::user(db, "other@example.com").await;
        let studio = seed::company(db, 1, "Studio").await;

        let rated = seed::rated_movie(db, 1, "1999-01-01", 8.0).await;
        let unrated = seed::movie(db, 2, "1999-01-01", 0.0, Some(90)).await;
        for movie in [rated, unrated] {
            seed::link_company(db, movie, studio).await;
            seed::history(db, me, movie, "2024-01-01", None).await;
        }
        seed::history(db, other, rated, "2024-01-01", None).await;

        let page = store
            .company_stats(me, &params(1, "count.desc"), &EntityFilter::default(), StatsVariant::Insights)
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].appearances, 1);
    }

    #[tokio::test]
    async fn reports_floor_applies_to_count_and_page() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let regular = seed::person(db, 1, "Regular", Some(2)).await;
        let cameo = seed::person(db, 2, "Cameo", Some(1)).await;

        for m in 0..5 {
            let movie = seed::rated_movie(db, 10 + m, "2015-01-01", 7.0).await;
            seed::credit(db, regular, movie, Role::Actor, Some(1)).await;
            seed::history(db, user, movie, "2024-06-01", None).await;
        }
        let single = seed::rated_movie(db, 99, "2015-01-01", 9.5).await;
        seed::credit(db, cameo, single, Role::Actor, Some(1)).await;
        seed::history(db, user, single, "2024-06-02", None).await;

        let filter = PersonFilter::default();
        let insights =
            store.person_stats(user, &params(1, "average.desc"), &filter, StatsVariant::Insights).await.unwrap();
        assert_eq!(insights.total, 2);
        assert_eq!(insights.results[0].name, "Cameo");

        let reports =
            store.person_stats(user, &params(1, "average.desc"), &filter, StatsVariant::Reports).await.unwrap();
        assert_eq!(reports.total, 1);
        assert_eq!(reports.results.len(), 1);
        assert_eq!(reports.results[0].name, "Regular");
    }

    #[tokio::test]
    async fn person_role_and_name_filters() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let director = seed::person(db, 1, "Greta Gerwig", Some(1)).await;
        let actor = seed::person(db, 2, "Ryan Gosling", Some(2)).await;

        let movie = seed::rated_movie(db, 1, "2023-07-21", 7.0).await;
        seed::credit(db, director, movie, Role::Director, None).await;
        seed::credit(db, actor, movie, Role::Actor, Some(2)).await;
        seed::history(db, user, movie, "2023-08-01", None).await;

        let filter = PersonFilter { role: Some(RoleFilter::Director), ..Default::default() };
        let page = store.person_stats(user, &params(1, "count.desc"), &filter, StatsVariant::Insights).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].id, director);

        let filter = PersonFilter {
            entity: EntityFilter { query: Some("gOsL".into()), ..Default::default() },
            ..Default::default()
        };
        let page = store.person_stats(user, &params(1, "count.desc"), &filter, StatsVariant::Insights).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].id, actor);
    }

    #[tokio::test]
    async fn watched_years_bucket_and_filter() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;

        let dates = ["2022-12-31", "2023-01-01", "2023-06-15", "2024-01-01"];
        for (i, date) in dates.iter().enumerate() {
            let movie = seed::rated_movie(db, i as i32 + 1, "2000-01-01", 6.0).await;
            seed::history(db, user, movie, date, None).await;
        }

        let all =
            store.watched_year_stats(user, &params(1, "year.asc"), &YearFilter::default()).await.unwrap();
        let years: Vec<_> = all.results.iter().map(|y| (y.year, y.appearances)).collect();
        assert_eq!(years, vec![(2022, 1), (2023, 2), (2024, 1)]);

        let only = store
            .watched_year_stats(user, &params(1, "year.desc"), &YearFilter { year: Some(2023), query: None })
            .await
            .unwrap();
        assert_eq!(only.total, 1);
        assert_eq!(only.results[0].appearances, 2);
    }

    #[tokio::test]
    async fn release_years_use_the_release_date() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        for (tmdb, release) in [(1, "1994-09-23"), (2, "1994-10-14"), (3, "2008-07-18")] {
            let movie = seed::rated_movie(db, tmdb, release, 9.0).await;
            seed::history(db, user, movie, "2024-01-10", None).await;
        }

        let page = store.release_year_stats(user, &params(1, "count.desc"), &YearFilter::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!((page.results[0].year, page.results[0].appearances), (1994, 2));
    }

    #[tokio::test]
    async fn name_search_treats_wildcards_literally() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let movie = seed::rated_movie(db, 1, "2001-01-01", 7.0).await;
        for (tmdb, name) in [(1, "Sci_Fi"), (2, "Drama"), (3, "100% Docs")] {
            let genre = seed::genre(db, tmdb, name).await;
            seed::link_genre(db, movie, genre).await;
        }
        seed::history(db, user, movie, "2024-01-01", None).await;

        let search = |q: &str| EntityFilter { query: Some(q.into()), ..Default::default() };
        let names = |page: Paginated<GenreStats>| page.results.into_iter().map(|g| g.name).collect::<Vec<_>>();

        let page = store.genre_stats(user, &params(1, "name.asc"), &search("_")).await.unwrap();
        assert_eq!(names(page), vec!["Sci_Fi"]);

        let page = store.genre_stats(user, &params(1, "name.asc"), &search("%")).await.unwrap();
        assert_eq!(names(page), vec!["100% Docs"]);

        let page = store.genre_stats(user, &params(1, "name.asc"), &search("dRa")).await.unwrap();
        assert_eq!(names(page), vec!["Drama"]);
    }

    #[tokio::test]
    async fn no_history_is_an_empty_page() {
        let store = seed::setup_store().await;
        let user = seed::user(store.db(), "a@example.com").await;
        let page = store.genre_stats(user, &params(1, "name.asc"), &EntityFilter::default()).await.unwrap();
        assert_eq!(page, Paginated::empty());
    }
}
