use sea_orm::FromQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RatingSource {
    Imdb,
    Tmdb,
    RottenTomatoes,
    Metacritic,
}

impl RatingSource {
    pub const ALL: [RatingSource; 4] =
        [RatingSource::Imdb, RatingSource::Tmdb, RatingSource::RottenTomatoes, RatingSource::Metacritic];

    pub fn as_str(self) -> &'static str {
        match self {
            RatingSource::Imdb => "IMDB",
            RatingSource::Tmdb => "TMDB",
            RatingSource::RottenTomatoes => "ROTTEN_TOMATOES",
            RatingSource::Metacritic => "METACRITIC",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|source| source.as_str().eq_ignore_ascii_case(s))
    }

    /// Top of the source's native scale.
    pub fn max_score(self) -> f64 {
        match self {
            RatingSource::Imdb | RatingSource::Tmdb => 10.0,
            RatingSource::RottenTomatoes | RatingSource::Metacritic => 100.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Actor,
    Actress,
    Director,
    Writer,
    Producer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Actor => "ACTOR",
            Role::Actress => "ACTRESS",
            Role::Director => "DIRECTOR",
            Role::Writer => "WRITER",
            Role::Producer => "PRODUCER",
        }
    }
}

/// The `role` query parameter. `Cast` covers both acting roles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoleFilter {
    Cast,
    Director,
    Writer,
    Producer,
}

impl RoleFilter {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "cast" => Some(RoleFilter::Cast),
            "director" => Some(RoleFilter::Director),
            "writer" => Some(RoleFilter::Writer),
            "producer" => Some(RoleFilter::Producer),
            _ => None,
        }
    }

    pub fn roles(self) -> &'static [Role] {
        match self {
            RoleFilter::Cast => &[Role::Actor, Role::Actress],
            RoleFilter::Director => &[Role::Director],
            RoleFilter::Writer => &[Role::Writer],
            RoleFilter::Producer => &[Role::Producer],
        }
    }
}

/// List response shape shared by every paginated endpoint.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub total: u64,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn empty() -> Self {
        Self { total: 0, results: Vec::new() }
    }
}

/// A watched movie as it appears inside insight bundles.
#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct MovieRef {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub runtime: Option<i32>,
    pub average_rating: f64,
}

/// `MovieRef` plus the date the user watched it.
#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
#[serde(rename_all = "camelCase")]
pub struct WatchedMovie {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub runtime: Option<i32>,
    pub average_rating: f64,
    pub watched_date: String,
}
