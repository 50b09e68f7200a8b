//! Movie catalog ingestion. Everything keyed by a TMDB id is find-or-create.

use anyhow::anyhow;
use jiff::civil::Date;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set, TransactionTrait,
    sea_query::{OnConflict, Query},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    entities::{company, genre, movie, movie_company, movie_genre, movie_person, movie_rating, person},
    error::{AppError, AppResult},
    models::{RatingSource, Role},
    rating::{SourceRating, normalize},
    store::Store,
};

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenrePayload {
    pub tmdb_id: i32,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyPayload {
    pub tmdb_id: i32,
    pub name: String,
    pub logo_path: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditPayload {
    pub tmdb_id: i32,
    pub name: String,
    pub gender: Option<i32>,
    pub profile_path: Option<String>,
    pub role: Role,
    pub character: Option<String>,
    pub billing_order: Option<i32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatingPayload {
    pub source: RatingSource,
    pub value: f64,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoviePayload {
    pub tmdb_id: i32,
    pub title: String,
    pub original_title: Option<String>,
    pub release_date: Date,
    pub runtime: Option<i32>,
    pub imdb_id: Option<String>,
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genres: Vec<GenrePayload>,
    #[serde(default)]
    pub companies: Vec<CompanyPayload>,
    #[serde(default)]
    pub credits: Vec<CreditPayload>,
    #[serde(default)]
    pub ratings: Vec<RatingPayload>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieDetails {
    #[serde(flatten)]
    pub movie: movie::Model,
    pub ratings: Vec<RatingPayload>,
    pub genres: Vec<genre::Model>,
    pub companies: Vec<company::Model>,
}

fn validate_ratings(ratings: &[RatingPayload]) -> AppResult<()> {
    for r in ratings {
        if !r.value.is_finite() || r.value < 0.0 || r.value > r.source.max_score() {
            return Err(AppError::validation(
                "ratings",
                format!("{} must be between 0 and {}", r.source.as_str(), r.source.max_score()),
            ));
        }
    }
    Ok(())
}

/// Inserts unless a row with the same TMDB id exists, then reads the row back.
async fn find_or_create<E, A, C>(db: &C, model: A, tmdb_col: E::Column, tmdb_id: i32) -> AppResult<E::Model>
where
    E: EntityTrait,
    A: ActiveModelTrait<Entity = E>,
    E::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    E::insert(model)
        .on_conflict(OnConflict::column(tmdb_col).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;
    E::find()
        .filter(tmdb_col.eq(tmdb_id))
        .one(db)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow!("row with tmdb id {tmdb_id} vanished after insert")))
}

async fn upsert_ratings<C: ConnectionTrait>(db: &C, movie_id: i32, ratings: &[RatingPayload]) -> AppResult<f64> {
    if !ratings.is_empty() {
        let rows = ratings.iter().map(|r| movie_rating::ActiveModel {
            movie_id: Set(movie_id),
            rating_source: Set(r.source.as_str().to_string()),
            value: Set(r.value),
        });
        movie_rating::Entity::insert_many(rows)
            .on_conflict(
                OnConflict::columns([movie_rating::Column::MovieId, movie_rating::Column::RatingSource])
                    .update_column(movie_rating::Column::Value)
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await?;
    }

    let stored: Vec<SourceRating> = movie_rating::Entity::find()
        .filter(movie_rating::Column::MovieId.eq(movie_id))
        .all(db)
        .await?
        .into_iter()
        .map(|r| SourceRating::new(r.rating_source, r.value))
        .collect();
    let average = normalize(&stored);

    movie::ActiveModel { id: Set(movie_id), average_rating: Set(average), ..Default::default() }
        .update(db)
        .await?;
    Ok(average)
}

impl Store {
    pub async fn ingest_movie(&self, payload: MoviePayload) -> AppResult<MovieDetails> {
        validate_ratings(&payload.ratings)?;
        let txn = self.db().begin().await?;

        let movie = find_or_create(
            &txn,
            movie::ActiveModel {
                id: NotSet,
                title: Set(payload.title.clone()),
                original_title: Set(payload.original_title.clone().unwrap_or_else(|| payload.title.clone())),
                release_date: Set(payload.release_date.to_string()),
                runtime: Set(payload.runtime),
                imdb_id: Set(payload.imdb_id.clone()),
                tmdb_id: Set(payload.tmdb_id),
                poster_path: Set(payload.poster_path.clone()),
                average_rating: Set(0.0),
            },
            movie::Column::TmdbId,
            payload.tmdb_id,
        )
        .await?;

        for g in &payload.genres {
            let genre = find_or_create(
                &txn,
                genre::ActiveModel { id: NotSet, name: Set(g.name.clone()), tmdb_id: Set(g.tmdb_id) },
                genre::Column::TmdbId,
                g.tmdb_id,
            )
            .await?;
            movie_genre::Entity::insert(movie_genre::ActiveModel {
                movie_id: Set(movie.id),
                genre_id: Set(genre.id),
            })
            .on_conflict(
                OnConflict::columns([movie_genre::Column::MovieId, movie_genre::Column::GenreId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        for c in &payload.companies {
            let company = find_or_create(
                &txn,
                company::ActiveModel {
                    id: NotSet,
                    name: Set(c.name.clone()),
                    tmdb_id: Set(c.tmdb_id),
                    logo_path: Set(c.logo_path.clone()),
                },
                company::Column::TmdbId,
                c.tmdb_id,
            )
            .await?;
            movie_company::Entity::insert(movie_company::ActiveModel {
                movie_id: Set(movie.id),
                company_id: Set(company.id),
            })
            .on_conflict(
                OnConflict::columns([movie_company::Column::MovieId, movie_company::Column::CompanyId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        for credit in &payload.credits {
            let person = find_or_create(
                &txn,
                person::ActiveModel {
                    id: NotSet,
                    name: Set(credit.name.clone()),
                    tmdb_id: Set(credit.tmdb_id),
                    gender: Set(credit.gender),
                    profile_path: Set(credit.profile_path.clone()),
                },
                person::Column::TmdbId,
                credit.tmdb_id,
            )
            .await?;
            movie_person::Entity::insert(movie_person::ActiveModel {
                person_id: Set(person.id),
                movie_id: Set(movie.id),
                role: Set(credit.role.as_str().to_string()),
                character: Set(credit.character.clone()),
                billing_order: Set(credit.billing_order),
            })
            .on_conflict(
                OnConflict::columns([
                    movie_person::Column::PersonId,
                    movie_person::Column::MovieId,
                    movie_person::Column::Role,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
        }

        let average = upsert_ratings(&txn, movie.id, &payload.ratings).await?;
        txn.commit().await?;

        info!(
            movie_id = movie.id,
            tmdb_id = payload.tmdb_id,
            genres = payload.genres.len(),
            companies = payload.companies.len(),
            credits = payload.credits.len(),
            average,
            "movie ingested"
        );
        self.get_movie(movie.id).await
    }

    /// Upserts ratings for a known movie and recomputes its average.
    pub async fn update_ratings(&self, tmdb_id: i32, ratings: Vec<RatingPayload>) -> AppResult<MovieDetails> {
        validate_ratings(&ratings)?;
        let txn = self.db().begin().await?;
        let movie = movie::Entity::find()
            .filter(movie::Column::TmdbId.eq(tmdb_id))
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::not_found(format!("movie with tmdb id {tmdb_id} not found")))?;

        let average = upsert_ratings(&txn, movie.id, &ratings).await?;
        txn.commit().await?;

        debug!(movie_id = movie.id, tmdb_id, average, "ratings updated");
        self.get_movie(movie.id).await
    }

    pub async fn get_movie(&self, id: i32) -> AppResult<MovieDetails> {
        let db = self.db();
        let genre_ids = Query::select()
            .column(movie_genre::Column::GenreId)
            .from(movie_genre::Entity)
            .and_where(movie_genre::Column::MovieId.eq(id))
            .to_owned();
        let company_ids = Query::select()
            .column(movie_company::Column::CompanyId)
            .from(movie_company::Entity)
            .and_where(movie_company::Column::MovieId.eq(id))
            .to_owned();

        let (movie, ratings, genres, companies) = futures::try_join!(
            self.find_or_not_found::<movie::Entity>(id, "movie"),
            async {
                movie_rating::Entity::find()
                    .filter(movie_rating::Column::MovieId.eq(id))
                    .order_by_asc(movie_rating::Column::RatingSource)
                    .all(db)
                    .await
                    .map_err(AppError::from)
            },
            async {
                genre::Entity::find()
                    .filter(genre::Column::Id.in_subquery(genre_ids))
                    .order_by_asc(genre::Column::Name)
                    .all(db)
                    .await
                    .map_err(AppError::from)
            },
            async {
                company::Entity::find()
                    .filter(company::Column::Id.in_subquery(company_ids))
                    .order_by_asc(company::Column::Name)
                    .all(db)
                    .await
                    .map_err(AppError::from)
            },
        )?;

        let ratings = ratings
            .into_iter()
            .filter_map(|r| RatingSource::parse(&r.rating_source).map(|source| RatingPayload { source, value: r.value }))
            .collect();
        Ok(MovieDetails { movie, ratings, genres, companies })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::test_support as seed;

    fn payload() -> MoviePayload {
        serde_json::from_value(serde_json::json!({
            "tmdbId": 603,
            "title": "The Matrix",
            "releaseDate": "1999-03-31",
            "runtime": 136,
            "genres": [{ "tmdbId": 28, "name": "Action" }, { "tmdbId": 878, "name": "Science Fiction" }],
            "companies": [{ "tmdbId": 79, "name": "Village Roadshow Pictures", "logoPath": null }],
            "credits": [
                { "tmdbId": 6384, "name": "Keanu Reeves", "gender": 2, "role": "ACTOR", "character": "Neo", "billingOrder": 0 },
                { "tmdbId": 9339, "name": "Lana Wachowski", "gender": 1, "role": "DIRECTOR" },
                { "tmdbId": 9339, "name": "Lana Wachowski", "gender": 1, "role": "WRITER" }
            ],
            "ratings": [{ "source": "IMDB", "value": 8.7 }, { "source": "METACRITIC", "value": 73.0 }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn ingest_is_idempotent() {
        let store = seed::setup_store().await;
        let first = store.ingest_movie(payload()).await.unwrap();
        let second = store.ingest_movie(payload()).await.unwrap();

        assert_eq!(first.movie.id, second.movie.id);
        assert_eq!(first.genres.len(), 2);
        assert_eq!(first.companies.len(), 1);

        let db = store.db();
        assert_eq!(movie::Entity::find().count(db).await.unwrap(), 1);
        assert_eq!(person::Entity::find().count(db).await.unwrap(), 2);
        assert_eq!(movie_person::Entity::find().count(db).await.unwrap(), 3);
        assert_eq!(movie_genre::Entity::find().count(db).await.unwrap(), 2);
        assert_eq!(movie_rating::Entity::find().count(db).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn ingest_recomputes_the_average() {
        let store = seed::setup_store().await;
        let details = store.ingest_movie(payload()).await.unwrap();
        // (8.7 + 7.3) / 2
        assert_eq!(details.movie.average_rating, 8.0);

        let updated = store
            .update_ratings(603, vec![RatingPayload { source: RatingSource::Tmdb, value: 8.2 }])
            .await
            .unwrap();
        assert_eq!(updated.ratings.len(), 3);
        // (8.7 + 7.3 + 8.2) / 3
        assert_eq!(updated.movie.average_rating, 8.1);

        let replaced = store
            .update_ratings(603, vec![RatingPayload { source: RatingSource::Imdb, value: 5.7 }])
            .await
            .unwrap();
        assert_eq!(replaced.ratings.len(), 3);
        assert_eq!(replaced.movie.average_rating, 7.1);
    }

    #[tokio::test]
    async fn unknown_movies_are_not_found() {
        let store = seed::setup_store().await;
        let err = store.get_movie(42).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = store.update_ratings(42, Vec::new()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn out_of_scale_ratings_are_rejected() {
        let store = seed::setup_store().await;
        let mut bad = payload();
        bad.ratings = vec![RatingPayload { source: RatingSource::Imdb, value: 87.0 }];

        let err = store.ingest_movie(bad).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "ratings", .. }));
        assert_eq!(movie::Entity::find().count(store.db()).await.unwrap(), 0);
    }
}
