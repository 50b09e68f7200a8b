//! Detail bundles for a single person, genre, company or year.
//!
//! Every bundle runs its sub-queries concurrently and fails as a whole if any
//! one of them fails.

use sea_orm::{
    FromQueryResult,
    sea_query::{Alias, Expr, Func, JoinType, Order, SelectStatement},
};
use serde::Serialize;
use tracing::debug;

use super::{
    MonthCount, YearCount,
    query::{DatePart, Scope, YearWindow, count_distinct, fetch_all, fetch_one, select_movie_ref, watched},
    watched_histogram,
};
use crate::{
    entities::{company, genre, history, movie, movie_company, movie_genre, movie_person, person},
    error::AppResult,
    models::MovieRef,
    rating::round_to,
    store::Store,
};

const TOP_PEOPLE: u64 = 3;

/// Figures derived from the distinct movies a user watched within a scope.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieListStats {
    pub movie_count: u64,
    pub average_rating: f64,
    pub total_runtime: i64,
    pub highest_rated: Option<MovieRef>,
    pub lowest_rated: Option<MovieRef>,
}

impl MovieListStats {
    /// `movies` must be ordered by average rating ascending.
    pub fn from_movies(movies: Vec<MovieRef>) -> Self {
        let movie_count = movies.len() as u64;
        let total_runtime = movies.iter().filter_map(|m| m.runtime).map(i64::from).sum();
        let average_rating = if movies.is_empty() {
            0.0
        } else {
            round_to(movies.iter().map(|m| m.average_rating).sum::<f64>() / movies.len() as f64, 2)
        };

        Self {
            movie_count,
            average_rating,
            total_runtime,
            lowest_rated: movies.first().cloned(),
            highest_rated: movies.last().cloned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteGenre {
    pub id: i32,
    pub name: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteCompany {
    pub id: i32,
    pub name: String,
    pub logo_path: Option<String>,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct Collaborator {
    pub id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct FrequentPerson {
    pub id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub role: String,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDetail {
    pub person: person::Model,
    #[serde(flatten)]
    pub movies: MovieListStats,
    pub movies_count_by_role: Vec<RoleCount>,
    pub favorite_genre: Option<FavoriteGenre>,
    pub favorite_company: Option<FavoriteCompany>,
    pub frequent_collaborators: Vec<Collaborator>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenreDetail {
    pub genre: genre::Model,
    #[serde(flatten)]
    pub movies: MovieListStats,
    pub frequent_people: Vec<FrequentPerson>,
    pub count_by_watched_year: Vec<YearCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetail {
    pub company: company::Model,
    #[serde(flatten)]
    pub movies: MovieListStats,
    pub frequent_people: Vec<FrequentPerson>,
    pub count_by_watched_year: Vec<YearCount>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YearKind {
    Release,
    Watched,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearDetail {
    pub year: i16,
    pub kind: YearKind,
    #[serde(flatten)]
    pub movies: MovieListStats,
    pub frequent_people: Vec<FrequentPerson>,
    pub movie_count_by_month: Vec<MonthCount>,
}

fn movie_list(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select_movie_ref(&mut select)
        .distinct()
        .order_by((movie::Entity, movie::Column::AverageRating), Order::Asc)
        .order_by((movie::Entity, movie::Column::Id), Order::Asc);
    select
}

fn frequent_people(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select
        .column((person::Entity, person::Column::Id))
        .column((person::Entity, person::Column::Name))
        .column((person::Entity, person::Column::ProfilePath))
        .column((movie_person::Entity, movie_person::Column::Role))
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
        .group_by_col((person::Entity, person::Column::Id))
        .group_by_col((person::Entity, person::Column::Name))
        .group_by_col((person::Entity, person::Column::ProfilePath))
        .group_by_col((movie_person::Entity, movie_person::Column::Role))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((person::Entity, person::Column::Id), Order::Asc)
        .order_by((movie_person::Entity, movie_person::Column::Role), Order::Asc)
        .limit(TOP_PEOPLE);
    select
}

fn count_by_watched_year(user_id: i32, scope: Scope) -> SelectStatement {
    watched_histogram(user_id, scope, DatePart::Year, "year")
}

fn movies_count_by_role(user_id: i32, person_id: i32) -> SelectStatement {
    let mut select = watched(user_id, Scope::All);
    select
        .column((movie_person::Entity, movie_person::Column::Role))
        .expr_as(Func::count(Expr::col((movie::Entity, movie::Column::Id))), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_person::Entity,
            Expr::col((movie_person::Entity, movie_person::Column::MovieId))
                .equals((movie::Entity, movie::Column::Id)),
        )
        .and_where(Expr::col((movie_person::Entity, movie_person::Column::PersonId)).eq(person_id))
        .group_by_col((movie_person::Entity, movie_person::Column::Role))
        .order_by((movie_person::Entity, movie_person::Column::Role), Order::Asc);
    select
}

fn favorite_genre(user_id: i32, person_id: i32) -> SelectStatement {
    let mut select = watched(user_id, Scope::Person(person_id));
    select
        .column((genre::Entity, genre::Column::Id))
        .column((genre::Entity, genre::Column::Name))
        .expr_as(count_distinct(movie::Entity, "id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_genre::Entity,
            Expr::col((movie_genre::Entity, movie_genre::Column::MovieId)).equals((movie::Entity, movie::Column::Id)),
        )
        .join(
            JoinType::InnerJoin,
            genre::Entity,
            Expr::col((genre::Entity, genre::Column::Id)).equals((movie_genre::Entity, movie_genre::Column::GenreId)),
        )
        .group_by_col((genre::Entity, genre::Column::Id))
        .group_by_col((genre::Entity, genre::Column::Name))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((genre::Entity, genre::Column::Id), Order::Asc)
        .limit(1);
    select
}

fn favorite_company(user_id: i32, person_id: i32) -> SelectStatement {
    let mut select = watched(user_id, Scope::Person(person_id));
    select
        .column((company::Entity, company::Column::Id))
        .column((company::Entity, company::Column::Name))
        .column((company::Entity, company::Column::LogoPath))
        .expr_as(count_distinct(movie::Entity, "id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_company::Entity,
            Expr::col((movie_company::Entity, movie_company::Column::MovieId))
                .equals((movie::Entity, movie::Column::Id)),
        )
        .join(
            JoinType::InnerJoin,
            company::Entity,
            Expr::col((company::Entity, company::Column::Id))
                .equals((movie_company::Entity, movie_company::Column::CompanyId)),
        )
        .group_by_col((company::Entity, company::Column::Id))
        .group_by_col((company::Entity, company::Column::Name))
        .group_by_col((company::Entity, company::Column::LogoPath))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((company::Entity, company::Column::Id), Order::Asc)
        .limit(1);
    select
}

/// Other people credited on the person's movies that the user watched,
/// counted once per shared movie.
fn frequent_collaborators(user_id: i32, person_id: i32) -> SelectStatement {
    let mut select = watched(user_id, Scope::Person(person_id));
    select
        .column((person::Entity, person::Column::Id))
        .column((person::Entity, person::Column::Name))
        .column((person::Entity, person::Column::ProfilePath))
        .expr_as(count_distinct(history::Entity, "movie_id"), Alias::new("count"))
        .join(
            JoinType::InnerJoin,
            movie_person::Entity,
            Expr::col((movie_person::Entity, movie_person::Column::MovieId))
                .equals((history::Entity, history::Column::MovieId))
                .and(Expr::col((movie_person::Entity, movie_person::Column::PersonId)).ne(person_id)),
        )
        .join(
            JoinType::InnerJoin,
            person::Entity,
            Expr::col((person::Entity, person::Column::Id))
                .equals((movie_person::Entity, movie_person::Column::PersonId)),
        )
        .group_by_col((person::Entity, person::Column::Id))
        .group_by_col((person::Entity, person::Column::Name))
        .group_by_col((person::Entity, person::Column::ProfilePath))
        .order_by(Alias::new("count"), Order::Desc)
        .order_by((person::Entity, person::Column::Id), Order::Asc)
        .limit(TOP_PEOPLE);
    select
}

impl Store {
    async fn movie_list_stats(&self, user_id: i32, scope: Scope) -> AppResult<MovieListStats> {
        let movies: Vec<MovieRef> = fetch_all(self.db(), movie_list(user_id, scope)).await?;
        Ok(MovieListStats::from_movies(movies))
    }

    pub async fn person_detail(&self, user_id: i32, person_id: i32) -> AppResult<PersonDetail> {
        let scope = Scope::Person(person_id);

        let (person, movies, movies_count_by_role, favorite_genre, favorite_company, frequent_collaborators) =
            futures::try_join!(
                self.find_or_not_found::<person::Entity>(person_id, "person"),
                self.movie_list_stats(user_id, scope),
                fetch_all(self.db(), movies_count_by_role(user_id, person_id)),
                fetch_one(self.db(), favorite_genre(user_id, person_id)),
                fetch_one(self.db(), favorite_company(user_id, person_id)),
                fetch_all(self.db(), frequent_collaborators(user_id, person_id)),
            )?;

        debug!(user_id, person_id, movie_count = movies.movie_count, "person detail");
        Ok(PersonDetail {
            person,
            movies,
            movies_count_by_role,
            favorite_genre,
            favorite_company,
            frequent_collaborators,
        })
    }

    pub async fn genre_detail(&self, user_id: i32, genre_id: i32) -> AppResult<GenreDetail> {
        let scope = Scope::Genre(genre_id);

        let (genre, movies, frequent_people, count_by_watched_year) = futures::try_join!(
            self.find_or_not_found::<genre::Entity>(genre_id, "genre"),
            self.movie_list_stats(user_id, scope),
            fetch_all(self.db(), frequent_people(user_id, scope)),
            fetch_all(self.db(), count_by_watched_year(user_id, scope)),
        )?;

        debug!(user_id, genre_id, movie_count = movies.movie_count, "genre detail");
        Ok(GenreDetail { genre, movies, frequent_people, count_by_watched_year })
    }

    pub async fn company_detail(&self, user_id: i32, company_id: i32) -> AppResult<CompanyDetail> {
        let scope = Scope::Company(company_id);

        let (company, movies, frequent_people, count_by_watched_year) = futures::try_join!(
            self.find_or_not_found::<company::Entity>(company_id, "company"),
            self.movie_list_stats(user_id, scope),
            fetch_all(self.db(), frequent_people(user_id, scope)),
            fetch_all(self.db(), count_by_watched_year(user_id, scope)),
        )?;

        debug!(user_id, company_id, movie_count = movies.movie_count, "company detail");
        Ok(CompanyDetail { company, movies, frequent_people, count_by_watched_year })
    }

    pub async fn year_detail(&self, user_id: i32, kind: YearKind, year: i16) -> AppResult<YearDetail> {
        let window = YearWindow::new(year)?;
        let scope = match kind {
            YearKind::Release => Scope::ReleasedIn(window),
            YearKind::Watched => Scope::WatchedIn(window),
        };

        let (movies, frequent_people, movie_count_by_month) = futures::try_join!(
            self.movie_list_stats(user_id, scope),
            fetch_all(self.db(), frequent_people(user_id, scope)),
            fetch_all(self.db(), watched_histogram(user_id, scope, DatePart::Month, "month")),
        )?;

        debug!(user_id, year, ?kind, movie_count = movies.movie_count, "year detail");
        Ok(YearDetail { year, kind, movies, frequent_people, movie_count_by_month })
    }
}
