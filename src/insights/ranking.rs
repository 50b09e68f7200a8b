//! Cast and crew ranking by Bayesian shrinkage.
//!
//! Pass one fetches every credited appearance in the user's history and takes
//! the global prior over all of them; pass two scores each person. The prior
//! needs every row, so grouping happens here rather than in SQL.

use std::collections::BTreeMap;

use async_trait::async_trait;
use sea_orm::{
    FromQueryResult,
    sea_query::{Alias, Expr, JoinType},
};
use serde::Serialize;
use tracing::debug;

use super::query::{Scope, fetch_all, watched};
use crate::{
    entities::{history, movie, movie_person, person},
    error::AppResult,
    models::{Paginated, RoleFilter},
    params::Pagination,
    rating::round_to,
    store::Store,
};

/// Shrinkage constant: the number of "virtual" appearances at the prior.
pub const SHRINKAGE_M: f64 = 5.0;

/// One (movie, person, role) credit the user has watched.
#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub struct Appearance {
    pub movie_id: i32,
    pub average_rating: f64,
    pub person_id: i32,
    pub person_name: String,
    pub profile_path: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RankingFilter {
    pub role: Option<RoleFilter>,
    pub gender: Option<i32>,
}

#[async_trait]
pub trait AppearanceSource: Send + Sync {
    async fn appearances(&self, user_id: i32, filter: RankingFilter) -> AppResult<Vec<Appearance>>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedPerson {
    pub id: i32,
    pub name: String,
    pub profile_path: Option<String>,
    pub score: f64,
    pub appearances: u64,
    pub avg_rating: f64,
}

/// `(v / (v + m)) * r + (m / (v + m)) * c`
pub fn shrunk_score(appearances: u64, raw_mean: f64, prior: f64) -> f64 {
    let v = appearances as f64;
    (v / (v + SHRINKAGE_M)) * raw_mean + (SHRINKAGE_M / (v + SHRINKAGE_M)) * prior
}

struct Accumulated {
    name: String,
    profile_path: Option<String>,
    ratings: Vec<f64>,
}

struct Scored {
    id: i32,
    name: String,
    profile_path: Option<String>,
    score: f64,
    appearances: u64,
    raw_mean: f64,
}

/// Ranks people by shrunk score (rounded to two decimals), highest first.
/// Ties go to more appearances, then to the lower person id.
pub fn rank_appearances(rows: Vec<Appearance>, page: u64) -> Paginated<RankedPerson> {
    if rows.is_empty() {
        return Paginated::empty();
    }

    // The prior is flattened across appearances, not deduplicated by movie.
    let prior = rows.iter().map(|r| r.average_rating).sum::<f64>() / rows.len() as f64;

    let mut people: BTreeMap<i32, Accumulated> = BTreeMap::new();
    for row in rows {
        people
            .entry(row.person_id)
            .or_insert_with(|| Accumulated { name: row.person_name, profile_path: row.profile_path, ratings: Vec::new() })
            .ratings
            .push(row.average_rating);
    }

    let mut scored: Vec<Scored> = people
        .into_iter()
        .map(|(id, acc)| {
            let appearances = acc.ratings.len() as u64;
            let raw_mean = acc.ratings.iter().sum::<f64>() / acc.ratings.len() as f64;
            Scored {
                id,
                name: acc.name,
                profile_path: acc.profile_path,
                score: shrunk_score(appearances, raw_mean, prior),
                appearances,
                raw_mean,
            }
        })
        .collect();

    for person in &mut scored {
        person.score = round_to(person.score, 2);
    }
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.appearances.cmp(&a.appearances))
            .then_with(|| a.id.cmp(&b.id))
    });

    let total = scored.len() as u64;
    let Pagination { offset, limit } = Pagination::for_page(page);
    let results = scored
        .into_iter()
        .skip(offset as usize)
        .take(limit as usize)
        .map(|s| RankedPerson {
            id: s.id,
            name: s.name,
            profile_path: s.profile_path,
            score: s.score,
            appearances: s.appearances,
            avg_rating: round_to(s.raw_mean, 2),
        })
        .collect();

    Paginated { total, results }
}

pub async fn rank<S>(source: &S, user_id: i32, filter: RankingFilter, page: u64) -> AppResult<Paginated<RankedPerson>>
where
    S: AppearanceSource + ?Sized,
{
    let rows = source.appearances(user_id, filter).await?;
    let fetched = rows.len();
    let ranked = rank_appearances(rows, page);
    debug!(user_id, fetched, total = ranked.total, "ranked people");
    Ok(ranked)
}

#[async_trait]
impl AppearanceSource for Store {
    async fn appearances(&self, user_id: i32, filter: RankingFilter) -> AppResult<Vec<Appearance>> {
        let mut select = watched(user_id, Scope::All);
        select
            .expr_as(Expr::col((movie::Entity, movie::Column::Id)), Alias::new("movie_id"))
            .expr_as(Expr::col((movie::Entity, movie::Column::AverageRating)), Alias::new("average_rating"))
            .expr_as(Expr::col((person::Entity, person::Column::Id)), Alias::new("person_id"))
            .expr_as(Expr::col((person::Entity, person::Column::Name)), Alias::new("person_name"))
            .expr_as(Expr::col((person::Entity, person::Column::ProfilePath)), Alias::new("profile_path"))
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
            );

        if let Some(role) = filter.role {
            select.and_where(
                Expr::col((movie_person::Entity, movie_person::Column::Role))
                    .is_in(role.roles().iter().map(|r| r.as_str())),
            );
        }
        if let Some(gender) = filter.gender {
            select.and_where(Expr::col((person::Entity, person::Column::Gender)).eq(gender));
        }

        fetch_all(self.db(), select).await
    }
}
