use sea_orm::{DatabaseConnection, EntityTrait, PrimaryKeyTrait};

use crate::error::{AppError, AppResult};

/// Shared handle to the relational store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: DatabaseConnection,
}

impl Store {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Global lookup by primary key; absent rows are `NotFound`.
    pub async fn find_or_not_found<E>(&self, id: i32, what: &'static str) -> AppResult<E::Model>
    where
        E: EntityTrait,
        i32: Into<<E::PrimaryKey as PrimaryKeyTrait>::ValueType>,
    {
        E::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{what} {id} not found")))
    }
}
