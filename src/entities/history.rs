use sea_orm::entity::prelude::*;

/// One watch event. Unique per (user_id, movie_id).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "histories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub movie_id: i32,
    /// ISO `YYYY-MM-DD`.
    pub watched_date: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub review: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
