use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "movies")]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub original_title: String,
    /// ISO `YYYY-MM-DD`.
    pub release_date: String,
    pub runtime: Option<i32>,
    pub imdb_id: Option<String>,
    #[sea_orm(unique)]
    pub tmdb_id: i32,
    pub poster_path: Option<String>,
    pub average_rating: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
