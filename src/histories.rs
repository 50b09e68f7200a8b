//! Watch-history commands and the filtered history listing.

use std::collections::HashMap;

use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DbErr, EntityTrait, FromQueryResult, QueryFilter, Set,
    SqlErr, TransactionTrait,
    sea_query::{Alias, Expr, Func, IntoColumnRef, IntoTableRef, JoinType, Order, Query, SelectStatement, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    entities::{history, history_tag, movie, movie_company, movie_genre, movie_person, movie_rating, tag},
    error::{AppError, AppResult},
    insights::query::{YearWindow, contains_pattern, fetch_all, fetch_count},
    models::{MovieRef, Paginated, RatingSource},
    params::{ResolvedParams, SortSpec, resolve_for_user},
    store::Store,
};

pub const HISTORY_SORTS: [&str; 14] = [
    "release_date.asc",
    "release_date.desc",
    "watched_date.asc",
    "watched_date.desc",
    "rating_imdb.asc",
    "rating_imdb.desc",
    "rating_tmdb.asc",
    "rating_tmdb.desc",
    "rating_rotten.asc",
    "rating_rotten.desc",
    "rating_metacritic.asc",
    "rating_metacritic.desc",
    "rating_user.asc",
    "rating_user.desc",
];

pub const DEFAULT_HISTORY_SORT: &str = "watched_date.desc";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum HistorySort {
    ReleaseDate,
    WatchedDate,
    Source(RatingSource),
    UserRating,
}

impl HistorySort {
    fn from_column(column: &str) -> AppResult<Self> {
        Ok(match column {
            "release_date" => HistorySort::ReleaseDate,
            "watched_date" => HistorySort::WatchedDate,
            "rating_imdb" => HistorySort::Source(RatingSource::Imdb),
            "rating_tmdb" => HistorySort::Source(RatingSource::Tmdb),
            "rating_rotten" => HistorySort::Source(RatingSource::RottenTomatoes),
            "rating_metacritic" => HistorySort::Source(RatingSource::Metacritic),
            "rating_user" => HistorySort::UserRating,
            other => return Err(AppError::validation("sort_by", format!("cannot sort histories by `{other}`"))),
        })
    }

    fn source(self) -> Option<RatingSource> {
        match self {
            HistorySort::Source(source) => Some(source),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct HistoryFilter {
    pub genre_id: Option<i32>,
    pub person_id: Option<i32>,
    pub company_id: Option<i32>,
    pub release_year: Option<i16>,
    pub watched_year: Option<i16>,
    pub query: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    pub id: i32,
    pub movie_id: i32,
    pub watched_date: String,
    pub review: Option<String>,
    pub rating: Option<f64>,
}

impl From<history::Model> for HistoryRecord {
    fn from(h: history::Model) -> Self {
        Self { id: h.id, movie_id: h.movie_id, watched_date: h.watched_date, review: h.review, rating: h.rating }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SourceValue {
    pub source: String,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: i32,
    pub watched_date: String,
    pub review: Option<String>,
    pub rating: Option<f64>,
    pub movie: MovieRef,
    /// The sorted-by source, or the user's preferred one.
    pub source_rating: Option<SourceValue>,
    pub tags: Vec<tag::Model>,
}

#[derive(Debug, FromQueryResult)]
struct HistoryRow {
    id: i32,
    watched_date: String,
    review: Option<String>,
    rating: Option<f64>,
    movie_id: i32,
    tmdb_id: i32,
    title: String,
    poster_path: Option<String>,
    release_date: String,
    runtime: Option<i32>,
    average_rating: f64,
    rating_source: Option<String>,
    rating_value: Option<f64>,
}

#[derive(Debug, FromQueryResult)]
struct TagLink {
    history_id: i32,
    id: i32,
    user_id: i32,
    name: String,
    color: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHistory {
    pub movie_id: i32,
    pub watched_date: Date,
    pub review: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HistoryChanges {
    pub watched_date: Option<Date>,
    pub review: Option<String>,
    pub rating: Option<f64>,
}

fn validate_rating(rating: Option<f64>) -> AppResult<Option<f64>> {
    match rating {
        Some(r) if !(0.0..=10.0).contains(&r) => Err(AppError::validation("rating", "must be between 0 and 10")),
        other => Ok(other),
    }
}

fn in_movies_of(select: SelectStatement) -> SimpleExpr {
    Expr::col((history::Entity, history::Column::MovieId)).in_subquery(select)
}

/// `SELECT movie_id FROM <bridge> WHERE <key> = id`
fn bridge_subquery<E, C>(entity: E, movie_col: C, key_col: C, id: i32) -> SelectStatement
where
    E: IntoTableRef,
    C: IntoColumnRef,
{
    Query::select().column(movie_col).from(entity).and_where(Expr::col(key_col).eq(id)).to_owned()
}

/// `histories ⋈ movies`, rating-joined on one source, with every filter applied.
fn filtered(user_id: i32, source: RatingSource, filter: &HistoryFilter) -> AppResult<SelectStatement> {
    let mut select = Query::select();
    select
        .from(history::Entity)
        .join(
            JoinType::InnerJoin,
            movie::Entity,
            Expr::col((movie::Entity, movie::Column::Id)).equals((history::Entity, history::Column::MovieId)),
        )
        .join(
            JoinType::LeftJoin,
            movie_rating::Entity,
            Expr::col((movie_rating::Entity, movie_rating::Column::MovieId))
                .equals((history::Entity, history::Column::MovieId))
                .and(Expr::col((movie_rating::Entity, movie_rating::Column::RatingSource)).eq(source.as_str())),
        )
        .and_where(Expr::col((history::Entity, history::Column::UserId)).eq(user_id));

    if let Some(id) = filter.genre_id {
        select.and_where(in_movies_of(bridge_subquery(
            movie_genre::Entity,
            movie_genre::Column::MovieId,
            movie_genre::Column::GenreId,
            id,
        )));
    }
    if let Some(id) = filter.person_id {
        select.and_where(in_movies_of(bridge_subquery(
            movie_person::Entity,
            movie_person::Column::MovieId,
            movie_person::Column::PersonId,
            id,
        )));
    }
    if let Some(id) = filter.company_id {
        select.and_where(in_movies_of(bridge_subquery(
            movie_company::Entity,
            movie_company::Column::MovieId,
            movie_company::Column::CompanyId,
            id,
        )));
    }
    if let Some(year) = filter.release_year {
        select.and_where(YearWindow::new(year)?.condition(Expr::col((movie::Entity, movie::Column::ReleaseDate)).into()));
    }
    if let Some(year) = filter.watched_year {
        select
            .and_where(YearWindow::new(year)?.condition(Expr::col((history::Entity, history::Column::WatchedDate)).into()));
    }
    if let Some(query) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        select.and_where(
            Expr::expr(Func::lower(Expr::col((movie::Entity, movie::Column::Title))))
                .like(contains_pattern(query)),
        );
    }

    Ok(select)
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl Store {
    /// One page of the user's histories plus the count of every match.
    pub async fn list_histories(
        &self,
        user_id: i32,
        filter: &HistoryFilter,
        page: u64,
        sort_by: &str,
        fallback: RatingSource,
    ) -> AppResult<Paginated<HistoryItem>> {
        let sort = HistorySort::from_column(&SortSpec::parse(sort_by)?.column)?;
        let ResolvedParams { pagination, sort: requested, rating_source, .. } =
            resolve_for_user(self, user_id, page, sort_by, sort.source(), fallback).await?;

        let base = filtered(user_id, rating_source, filter)?;

        let mut count = base.clone();
        count.expr_as(Func::count(Expr::col((history::Entity, history::Column::Id))), Alias::new("total"));

        let mut rows = base;
        rows.expr_as(Expr::col((history::Entity, history::Column::Id)), Alias::new("id"))
            .expr_as(Expr::col((history::Entity, history::Column::WatchedDate)), Alias::new("watched_date"))
            .expr_as(Expr::col((history::Entity, history::Column::Review)), Alias::new("review"))
            .expr_as(Expr::col((history::Entity, history::Column::Rating)), Alias::new("rating"))
            .expr_as(Expr::col((movie::Entity, movie::Column::Id)), Alias::new("movie_id"))
            .expr_as(Expr::col((movie::Entity, movie::Column::TmdbId)), Alias::new("tmdb_id"))
            .expr_as(Expr::col((movie::Entity, movie::Column::Title)), Alias::new("title"))
            .expr_as(Expr::col((movie::Entity, movie::Column::PosterPath)), Alias::new("poster_path"))
            .expr_as(Expr::col((movie::Entity, movie::Column::ReleaseDate)), Alias::new("release_date"))
            .expr_as(Expr::col((movie::Entity, movie::Column::Runtime)), Alias::new("runtime"))
            .expr_as(Expr::col((movie::Entity, movie::Column::AverageRating)), Alias::new("average_rating"))
            .expr_as(Expr::col((movie_rating::Entity, movie_rating::Column::RatingSource)), Alias::new("rating_source"))
            .expr_as(Expr::col((movie_rating::Entity, movie_rating::Column::Value)), Alias::new("rating_value"));

        let order = requested.direction.order();
        match sort {
            HistorySort::ReleaseDate => rows.order_by((movie::Entity, movie::Column::ReleaseDate), order),
            HistorySort::WatchedDate => rows.order_by((history::Entity, history::Column::WatchedDate), order),
            HistorySort::Source(_) => rows.order_by((movie_rating::Entity, movie_rating::Column::Value), order),
            HistorySort::UserRating => rows.order_by((history::Entity, history::Column::Rating), order),
        };
        rows.order_by((history::Entity, history::Column::Id), Order::Asc)
            .limit(pagination.limit)
            .offset(pagination.offset);

        let (total, rows) =
            futures::try_join!(fetch_count(self.db(), count), fetch_all::<HistoryRow, _>(self.db(), rows))?;

        let mut tags = self.tags_for(rows.iter().map(|r| r.id).collect()).await?;
        let results = rows
            .into_iter()
            .map(|row| HistoryItem {
                id: row.id,
                watched_date: row.watched_date,
                review: row.review,
                rating: row.rating,
                source_rating: row
                    .rating_source
                    .zip(row.rating_value)
                    .map(|(source, value)| SourceValue { source, value }),
                tags: tags.remove(&row.id).unwrap_or_default(),
                movie: MovieRef {
                    id: row.movie_id,
                    tmdb_id: row.tmdb_id,
                    title: row.title,
                    poster_path: row.poster_path,
                    release_date: row.release_date,
                    runtime: row.runtime,
                    average_rating: row.average_rating,
                },
            })
            .collect();

        debug!(user_id, total, page, "histories listed");
        Ok(Paginated { total, results })
    }

    async fn tags_for(&self, history_ids: Vec<i32>) -> AppResult<HashMap<i32, Vec<tag::Model>>> {
        if history_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let select = Query::select()
            .column((history_tag::Entity, history_tag::Column::HistoryId))
            .columns([
                (tag::Entity, tag::Column::Id),
                (tag::Entity, tag::Column::UserId),
                (tag::Entity, tag::Column::Name),
                (tag::Entity, tag::Column::Color),
            ])
            .from(history_tag::Entity)
            .join(
                JoinType::InnerJoin,
                tag::Entity,
                Expr::col((tag::Entity, tag::Column::Id)).equals((history_tag::Entity, history_tag::Column::TagId)),
            )
            .and_where(Expr::col((history_tag::Entity, history_tag::Column::HistoryId)).is_in(history_ids))
            .order_by((tag::Entity, tag::Column::Name), Order::Asc)
            .to_owned();

        let mut by_history: HashMap<i32, Vec<tag::Model>> = HashMap::new();
        for link in fetch_all::<TagLink, _>(self.db(), select).await? {
            by_history.entry(link.history_id).or_default().push(tag::Model {
                id: link.id,
                user_id: link.user_id,
                name: link.name,
                color: link.color,
            });
        }
        Ok(by_history)
    }

    /// Logs a movie once per user. A second entry for the same movie is a `Conflict`.
    pub async fn create_history(&self, user_id: i32, new: NewHistory) -> AppResult<HistoryRecord> {
        let rating = validate_rating(new.rating)?;
        let txn = self.db().begin().await?;

        if movie::Entity::find_by_id(new.movie_id).one(&txn).await?.is_none() {
            return Err(AppError::not_found(format!("movie {} not found", new.movie_id)));
        }

        let existing = history::Entity::find()
            .filter(history::Column::UserId.eq(user_id))
            .filter(history::Column::MovieId.eq(new.movie_id))
            .one(&txn)
            .await?;
        if existing.is_some() {
            warn!(user_id, movie_id = new.movie_id, "duplicate history rejected");
            return Err(AppError::Conflict(format!("movie {} is already in your history", new.movie_id)));
        }

        let model = history::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            movie_id: Set(new.movie_id),
            watched_date: Set(new.watched_date.to_string()),
            review: Set(new.review.filter(|r| !r.trim().is_empty())),
            rating: Set(rating),
        };
        let created = match model.insert(&txn).await {
            Ok(created) => created,
            Err(err) if is_unique_violation(&err) => {
                warn!(user_id, movie_id = new.movie_id, "duplicate history rejected by index");
                return Err(AppError::Conflict(format!("movie {} is already in your history", new.movie_id)));
            },
            Err(err) => return Err(err.into()),
        };
        txn.commit().await?;

        debug!(user_id, history_id = created.id, "history created");
        Ok(created.into())
    }

    /// A history owned by someone else is reported as missing.
    async fn owned_history<C>(&self, db: &C, user_id: i32, history_id: i32) -> AppResult<history::Model>
    where
        C: sea_orm::ConnectionTrait,
    {
        history::Entity::find_by_id(history_id)
            .filter(history::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("history {history_id} not found")))
    }

    pub async fn update_history(
        &self,
        user_id: i32,
        history_id: i32,
        changes: HistoryChanges,
    ) -> AppResult<HistoryRecord> {
        let rating = validate_rating(changes.rating)?;
        let current = self.owned_history(self.db(), user_id, history_id).await?;
        if changes.watched_date.is_none() && changes.review.is_none() && rating.is_none() {
            return Ok(current.into());
        }

        let mut active: history::ActiveModel = current.into();
        if let Some(date) = changes.watched_date {
            active.watched_date = Set(date.to_string());
        }
        if let Some(review) = changes.review {
            active.review = Set(Some(review).filter(|r| !r.trim().is_empty()));
        }
        if let Some(rating) = rating {
            active.rating = Set(Some(rating));
        }
        let updated = active.update(self.db()).await?;
        debug!(user_id, history_id, "history updated");
        Ok(updated.into())
    }

    pub async fn remove_history(&self, user_id: i32, history_id: i32) -> AppResult<()> {
        let txn = self.db().begin().await?;
        self.owned_history(&txn, user_id, history_id).await?;

        history_tag::Entity::delete_many()
            .filter(history_tag::Column::HistoryId.eq(history_id))
            .exec(&txn)
            .await?;
        history::Entity::delete_by_id(history_id).exec(&txn).await?;
        txn.commit().await?;

        debug!(user_id, history_id, "history removed");
        Ok(())
    }

    /// Replaces the history's tags. Ids of tags the user does not own are ignored.
    pub async fn sync_history_tags(
        &self,
        user_id: i32,
        history_id: i32,
        tag_ids: Vec<i32>,
    ) -> AppResult<Vec<tag::Model>> {
        let txn = self.db().begin().await?;
        self.owned_history(&txn, user_id, history_id).await?;

        let owned = tag::Entity::find()
            .filter(tag::Column::UserId.eq(user_id))
            .filter(tag::Column::Id.is_in(tag_ids.clone()))
            .all(&txn)
            .await?;
        if owned.len() < tag_ids.len() {
            warn!(user_id, history_id, requested = tag_ids.len(), owned = owned.len(), "ignoring foreign tags");
        }

        history_tag::Entity::delete_many()
            .filter(history_tag::Column::HistoryId.eq(history_id))
            .exec(&txn)
            .await?;
        if !owned.is_empty() {
            let links = owned
                .iter()
                .map(|t| history_tag::ActiveModel { history_id: Set(history_id), tag_id: Set(t.id) });
            history_tag::Entity::insert_many(links).exec_without_returning(&txn).await?;
        }
        txn.commit().await?;

        debug!(user_id, history_id, tags = owned.len(), "history tags synced");
        Ok(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support as seed;

    fn new_history(movie_id: i32, date: &str) -> NewHistory {
        NewHistory { movie_id, watched_date: date.parse().unwrap(), review: None, rating: Some(8.0) }
    }

    #[tokio::test]
    async fn duplicate_history_is_a_conflict() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let movie = seed::movie(db, 1, "2000-01-01", 7.0, None).await;

        store.create_history(user, new_history(movie, "2024-01-01")).await.unwrap();
        let err = store.create_history(user, new_history(movie, "2024-02-02")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let rows = history::Entity::find().filter(history::Column::UserId.eq(user)).all(db).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].watched_date, "2024-01-01");
    }

    #[tokio::test]
    async fn unique_index_backs_the_duplicate_check() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let movie = seed::movie(db, 1, "2000-01-01", 7.0, None).await;
        seed::history(db, user, movie, "2024-01-01", None).await;

        let dup = history::ActiveModel {
            id: NotSet,
            user_id: Set(user),
            movie_id: Set(movie),
            watched_date: Set("2024-01-02".into()),
            review: Set(None),
            rating: Set(None),
        };
        let err = dup.insert(db).await.unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn create_validates_movie_and_rating() {
        let store = seed::setup_store().await;
        let user = seed::user(store.db(), "a@example.com").await;
        let movie = seed::movie(store.db(), 1, "2000-01-01", 7.0, None).await;

        let err = store.create_history(user, new_history(999, "2024-01-01")).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let mut bad = new_history(movie, "2024-01-01");
        bad.rating = Some(11.0);
        let err = store.create_history(user, bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "rating", .. }));
    }

    #[tokio::test]
    async fn other_users_histories_are_not_found() {
        let store = seed::setup_store().await;
        let db = store.db();
        let owner = seed::user(db, "owner@example.com").await;
        let other = seed::user(db, "other@example.com").await;
        let movie = seed::movie(db, 1, "2000-01-01", 7.0, None).await;
        let history = seed::history(db, owner, movie, "2024-01-01", None).await;

        let changes = HistoryChanges { rating: Some(3.0), ..Default::default() };
        assert!(matches!(store.update_history(other, history, changes).await, Err(AppError::NotFound(_))));
        assert!(matches!(store.remove_history(other, history).await, Err(AppError::NotFound(_))));

        let changes = HistoryChanges { review: Some("great".into()), ..Default::default() };
        let updated = store.update_history(owner, history, changes).await.unwrap();
        assert_eq!(updated.review.as_deref(), Some("great"));
    }

    #[tokio::test]
    async fn remove_drops_tag_links() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let movie = seed::movie(db, 1, "2000-01-01", 7.0, None).await;
        let history = seed::history(db, user, movie, "2024-01-01", None).await;
        let tag = seed::tag(db, user, "cinema").await;
        seed::tag_history(db, history, tag).await;

        store.remove_history(user, history).await.unwrap();
        assert!(history_tag::Entity::find().all(db).await.unwrap().is_empty());
        assert!(tag::Entity::find_by_id(tag).one(db).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sync_links_only_own_tags() {
        let store = seed::setup_store().await;
        let db = store.db();
        let me = seed::user(db, "me@example.com").await;
        let other = seed::user(db, "other@example.com").await;
        let movie = seed::movie(db, 1, "2000-01-01", 7.0, None).await;
        let history = seed::history(db, me, movie, "2024-01-01", None).await;
        let mine = seed::tag(db, me, "mine").await;
        let old = seed::tag(db, me, "old").await;
        let theirs = seed::tag(db, other, "theirs").await;
        seed::tag_history(db, history, old).await;

        let linked = store.sync_history_tags(me, history, vec![mine, theirs]).await.unwrap();
        assert_eq!(linked.iter().map(|t| t.id).collect::<Vec<_>>(), vec![mine]);

        let links = history_tag::Entity::find().all(db).await.unwrap();
        assert_eq!(links, vec![history_tag::Model { history_id: history, tag_id: mine }]);
    }

    #[tokio::test]
    async fn listing_filters_sorts_and_counts() {
        let store = seed::setup_store().await;
        let db = store.db();
        let user = seed::user(db, "a@example.com").await;
        let drama = seed::genre(db, 18, "Drama").await;

        let mut ids = Vec::new();
        for (tmdb, release, watched, imdb) in [
            (1, "1972-03-24", "2024-01-10", 9.2),
            (2, "1994-09-23", "2023-05-01", 9.3),
            (3, "2008-07-18", "2024-03-15", 9.0),
        ] {
            let movie = seed::movie(db, tmdb, release, imdb, Some(150)).await;
            seed::rating(db, movie, RatingSource::Imdb, imdb).await;
            seed::link_genre(db, movie, drama).await;
            ids.push(seed::history(db, user, movie, watched, Some(tmdb as f64)).await);
        }
        let tag = seed::tag(db, user, "rewatch").await;
        seed::tag_history(db, ids[0], tag).await;

        let page = store
            .list_histories(user, &HistoryFilter::default(), 1, DEFAULT_HISTORY_SORT, RatingSource::Imdb)
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.results.iter().map(|h| h.id).collect::<Vec<_>>(), vec![ids[2], ids[0], ids[1]]);
        assert_eq!(page.results[1].tags.len(), 1);

        let by_imdb = store
            .list_histories(user, &HistoryFilter::default(), 1, "rating_imdb.desc", RatingSource::Tmdb)
            .await
            .unwrap();
        assert_eq!(by_imdb.results[0].movie.tmdb_id, 2);
        assert_eq!(by_imdb.results[0].source_rating, Some(SourceValue { source: "IMDB".into(), value: 9.3 }));

        let filter = HistoryFilter { watched_year: Some(2024), genre_id: Some(drama), ..Default::default() };
        let page = store.list_histories(user, &filter, 1, "release_date.asc", RatingSource::Imdb).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.results[0].movie.tmdb_id, 1);

        let filter = HistoryFilter { query: Some("_".into()), ..Default::default() };
        let page = store.list_histories(user, &filter, 1, DEFAULT_HISTORY_SORT, RatingSource::Imdb).await.unwrap();
        assert_eq!(page.total, 0);

        let filter = HistoryFilter { query: Some("movie 3".into()), ..Default::default() };
        let page = store.list_histories(user, &filter, 1, "rating_user.desc", RatingSource::Imdb).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.results[0].rating, Some(3.0));
    }
}
