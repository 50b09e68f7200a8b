//! Year-in-review bundle over the half-open watched-date window of one year.

use sea_orm::{
    FromQueryResult,
    sea_query::{Alias, Expr, JoinType, Order, SelectStatement},
};
use serde::Serialize;
use tracing::debug;

use super::{
    MonthCount, Totals, WeekdayCount,
    query::{DatePart, Scope, YearWindow, count_distinct, fetch_all, fetch_one, select_movie_ref, watched},
    totals, watched_histogram,
};
use crate::{
    entities::{company, genre, history, movie, movie_company, movie_genre, movie_person, person},
    error::AppResult,
    models::{Role, WatchedMovie},
    rating::round_to,
    store::Store,
};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieData {
    pub total_watched: i64,
    pub total_runtime: i64,
    pub average_rating: f64,
}

impl From<Totals> for MovieData {
    fn from(totals: Totals) -> Self {
        Self {
            total_watched: totals.watched,
            total_runtime: totals.runtime.unwrap_or(0),
            average_rating: totals.average.map(|avg| round_to(avg, 2)).unwrap_or(0.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct GenreActivity {
    pub id: i32,
    pub name: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MostWatchedPerson {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MostWatchedCompany {
    pub id: i32,
    pub tmdb_id: i32,
    pub name: String,
    pub logo_path: Option<String>,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Retrospective {
    pub year: i16,
    pub movie_data: MovieData,
    pub activity_by_month: Vec<MonthCount>,
    pub activity_by_day_of_week: Vec<WeekdayCount>,
    pub first_movie: Option<WatchedMovie>,
    pub last_movie: Option<WatchedMovie>,
    pub best_rated: Option<WatchedMovie>,
    pub worst_rated: Option<WatchedMovie>,
    pub activity_by_genre: Vec<GenreActivity>,
    pub most_watched_person: Option<MostWatchedPerson>,
    pub most_watched_company: Option<MostWatchedCompany>,
}

#[derive(Clone, Copy)]
enum Pick {
    First,
    Last,
    Best,
    Worst,
}

fn pick_movie(user_id: i32, scope: Scope, pick: Pick) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select_movie_ref(&mut select).column((history::Entity, history::Column::WatchedDate));

    let watched_date = (history::Entity, history::Column::WatchedDate);
    let history_id = (history::Entity, history::Column::Id);
    let rating = (movie::Entity, movie::Column::AverageRating);
    let movie_id = (movie::Entity, movie::Column::Id);
    match pick {
        Pick::First => select.order_by(watched_date, Order::Asc).order_by(history_id, Order::Asc),
        Pick::Last => select.order_by(watched_date, Order::Desc).order_by(history_id, Order::Desc),
        Pick::Best => select.order_by(rating, Order::Desc).order_by(movie_id, Order::Asc),
        Pick::Worst => select.order_by(rating, Order::Asc).order_by(movie_id, Order::Asc),
    };
    select.limit(1);
    select
}

fn activity_by_genre(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select
        .column((genre::Entity, genre::Column::Id))
        .column((genre::Entity, genre::Column::Name))
        .expr_as(count_distinct(history::Entity, "id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_genre::Entity,
            Expr::col((movie_genre::Entity, movie_genre::Column::MovieId))
                .equals((history::Entity, history::Column::MovieId)),
        )
        .join(
            JoinType::InnerJoin,
            genre::Entity,
            Expr::col((genre::Entity, genre::Column::Id)).equals((movie_genre::Entity, movie_genre::Column::GenreId)),
        )
        .group_by_col((genre::Entity, genre::Column::Id))
        .group_by_col((genre::Entity, genre::Column::Name))
        .order_by((genre::Entity, genre::Column::Name), Order::Asc)
        .order_by((genre::Entity, genre::Column::Id), Order::Asc);
    select
}

/// Acting credits only.
fn most_watched_person(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select
        .column((person::Entity, person::Column::Id))
        .column((person::Entity, person::Column::TmdbId))
        .column((person::Entity, person::Column::Name))
        .column((person::Entity, person::Column::ProfilePath))
        .expr_as(count_distinct(history::Entity, "id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_person::Entity,
            Expr::col((movie_person::Entity, movie_person::Column::MovieId))
                .equals((history::Entity, history::Column::MovieId)),
        )
        .join(
            JoinType::InnerJoin,
            person::Entity,
            Expr::col((person::Entity, person::Column::Id))
                .equals((movie_person::Entity, movie_person::Column::PersonId)),
        )
        .and_where(
            Expr::col((movie_person::Entity, movie_person::Column::Role))
                .is_in([Role::Actor.as_str(), Role::Actress.as_str()]),
        )
        .group_by_col((person::Entity, person::Column::Id))
        .group_by_col((person::Entity, person::Column::TmdbId))
        .group_by_col((person::Entity, person::Column::Name))
        .group_by_col((person::Entity, person::Column::ProfilePath))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((person::Entity, person::Column::Id), Order::Asc)
        .limit(1);
    select
}

fn most_watched_company(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select
        .column((company::Entity, company::Column::Id))
        .column((company::Entity, company::Column::TmdbId))
        .column((company::Entity, company::Column::Name))
        .column((company::Entity, company::Column::LogoPath))
        .expr_as(count_distinct(history::Entity, "id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_company::Entity,
            Expr::col((movie_company::Entity, movie_company::Column::MovieId))
                .equals((history::Entity, history::Column::MovieId)),
        )
        .join(
            JoinType::InnerJoin,
            company::Entity,
            Expr::col((company::Entity, company::Column::Id))
                .equals((movie_company::Entity, movie_company::Column::CompanyId)),
        )
        .group_by_col((company::Entity, company::Column::Id))
        .group_by_col((company::Entity, company::Column::TmdbId))
        .group_by_col((company::Entity, company::Column::Name))
        .group_by_col((company::Entity, company::Column::LogoPath))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((company::Entity, company::Column::Id), Order::Asc)
        .limit(1);
    select
}

impl Store {
    pub async fn retrospective(&self, user_id: i32, year: i16) -> AppResult<Retrospective> {
        let scope = Scope::WatchedIn(YearWindow::new(year)?);
        let db = self.db();

        let (
            totals,
            activity_by_month,
            activity_by_day_of_week,
            first_movie,
            last_movie,
            best_rated,
            worst_rated,
            activity_by_genre,
            most_watched_person,
            most_watched_company,
        ) = futures::try_join!(
            fetch_one::<Totals, _>(db, totals(user_id, scope)),
            fetch_all(db, watched_histogram(user_id, scope, DatePart::Month, "month")),
            fetch_all(db, watched_histogram(user_id, scope, DatePart::Weekday, "weekday")),
            fetch_one(db, pick_movie(user_id, scope, Pick::First)),
            fetch_one(db, pick_movie(user_id, scope, Pick::Last)),
            fetch_one(db, pick_movie(user_id, scope, Pick::Best)),
            fetch_one(db, pick_movie(user_id, scope, Pick::Worst)),
            fetch_all(db, activity_by_genre(user_id, scope)),
            fetch_one(db, most_watched_person(user_id, scope)),
            fetch_one(db, most_watched_company(user_id, scope)),
        )?;

        let movie_data = totals.map(MovieData::from).unwrap_or(MovieData {
            total_watched: 0,
            total_runtime: 0,
            average_rating: 0.0,
        });
        debug!(user_id, year, total_watched = movie_data.total_watched, "retrospective");

        Ok(Retrospective {
            year,
            movie_data,
            activity_by_month,
            activity_by_day_of_week,
            first_movie,
            last_movie,
            best_rated,
            worst_rated,
            activity_by_genre,
            most_watched_person,
            most_watched_company,
        })
    }
}
