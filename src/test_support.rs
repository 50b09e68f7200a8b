//! In-memory store and seeding helpers for store-backed tests.

use sea_orm::{ActiveValue::NotSet, DatabaseConnection, EntityTrait, Set};

use crate::{
    db,
    entities::{
        company, genre, history, history_tag, movie, movie_company, movie_genre, movie_person, movie_rating,
        person, tag, user,
    },
    models::{RatingSource, Role},
    store::Store,
};

pub async fn setup_db() -> DatabaseConnection {
    db::connect_in_memory().await.expect("in-memory database")
}

pub async fn setup_store() -> Store {
    Store::new(setup_db().await)
}

pub async fn user(db: &DatabaseConnection, email: &str) -> i32 {
    let model = user::ActiveModel {
        id: NotSet,
        email: Set(email.to_string()),
        name: Set(None),
        username: Set(None),
        avatar_url: Set(None),
        preferred_rating: Set(None),
    };
    user::Entity::insert(model).exec(db).await.expect("insert user").last_insert_id
}

/// Inserts a movie titled `Movie <tmdb_id>`.
pub async fn movie(
    db: &DatabaseConnection,
    tmdb_id: i32,
    release_date: &str,
    average_rating: f64,
    runtime: Option<i32>,
) -> i32 {
    let title = format!("Movie {tmdb_id}");
    let model = movie::ActiveModel {
        id: NotSet,
        title: Set(title.clone()),
        original_title: Set(title),
        release_date: Set(release_date.to_string()),
        runtime: Set(runtime),
        imdb_id: Set(None),
        tmdb_id: Set(tmdb_id),
        poster_path: Set(None),
        average_rating: Set(average_rating),
    };
    movie::Entity::insert(model).exec(db).await.expect("insert movie").last_insert_id
}

pub async fn rating(db: &DatabaseConnection, movie_id: i32, source: RatingSource, value: f64) {
    let model = movie_rating::ActiveModel {
        movie_id: Set(movie_id),
        rating_source: Set(source.as_str().to_string()),
        value: Set(value),
    };
    movie_rating::Entity::insert(model).exec_without_returning(db).await.expect("insert rating");
}

pub async fn person(db: &DatabaseConnection, tmdb_id: i32, name: &str, gender: Option<i32>) -> i32 {
    let model = person::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        tmdb_id: Set(tmdb_id),
        gender: Set(gender),
        profile_path: Set(None),
    };
    person::Entity::insert(model).exec(db).await.expect("insert person").last_insert_id
}

pub async fn credit(db: &DatabaseConnection, person_id: i32, movie_id: i32, role: Role, billing_order: Option<i32>) {
    let model = movie_person::ActiveModel {
        person_id: Set(person_id),
        movie_id: Set(movie_id),
        role: Set(role.as_str().to_string()),
        character: Set(None),
        billing_order: Set(billing_order),
    };
    movie_person::Entity::insert(model).exec_without_returning(db).await.expect("insert credit");
}

pub async fn genre(db: &DatabaseConnection, tmdb_id: i32, name: &str) -> i32 {
    let model = genre::ActiveModel { id: NotSet, name: Set(name.to_string()), tmdb_id: Set(tmdb_id) };
    genre::Entity::insert(model).exec(db).await.expect("insert genre").last_insert_id
}

pub async fn link_genre(db: &DatabaseConnection, movie_id: i32, genre_id: i32) {
    let model = movie_genre::ActiveModel { movie_id: Set(movie_id), genre_id: Set(genre_id) };
    movie_genre::Entity::insert(model).exec_without_returning(db).await.expect("link genre");
}

pub async fn company(db: &DatabaseConnection, tmdb_id: i32, name: &str) -> i32 {
    let model = company::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        tmdb_id: Set(tmdb_id),
        logo_path: Set(None),
    };
    company::Entity::insert(model).exec(db).await.expect("insert company").last_insert_id
}

pub async fn link_company(db: &DatabaseConnection, movie_id: i32, company_id: i32) {
    let model = movie_company::ActiveModel { movie_id: Set(movie_id), company_id: Set(company_id) };
    movie_company::Entity::insert(model).exec_without_returning(db).await.expect("link company");
}

pub async fn history(
    db: &DatabaseConnection,
    user_id: i32,
    movie_id: i32,
    watched_date: &str,
    rating: Option<f64>,
) -> i32 {
    let model = history::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        movie_id: Set(movie_id),
        watched_date: Set(watched_date.to_string()),
        review: Set(None),
        rating: Set(rating),
    };
    history::Entity::insert(model).exec(db).await.expect("insert history").last_insert_id
}

pub async fn tag(db: &DatabaseConnection, user_id: i32, name: &str) -> i32 {
    let model = tag::ActiveModel {
        id: NotSet,
        user_id: Set(user_id),
        name: Set(name.to_string()),
        color: Set("#336699".to_string()),
    };
    tag::Entity::insert(model).exec(db).await.expect("insert tag").last_insert_id
}

pub async fn tag_history(db: &DatabaseConnection, history_id: i32, tag_id: i32) {
    let model = history_tag::ActiveModel { history_id: Set(history_id), tag_id: Set(tag_id) };
    history_tag::Entity::insert(model).exec_without_returning(db).await.expect("tag history");
}

/// A movie rated on every source so that any rating join matches it.
pub async fn rated_movie(db: &DatabaseConnection, tmdb_id: i32, release_date: &str, average_rating: f64) -> i32 {
    let id = movie(db, tmdb_id, release_date, average_rating, Some(100)).await;
    for source in RatingSource::ALL {
        let scaled = average_rating * source.max_score() / 10.0;
        rating(db, id, source, scaled).await;
    }
    id
}
