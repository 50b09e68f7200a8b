use sea_orm_migration::{prelude::*, schema::*};

use crate::m20250301_000001_create_catalog::Movies;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_auto(Users::Id))
                    .col(string(Users::Email).unique_key())
                    .col(string_null(Users::Name))
                    .col(string_null(Users::Username))
                    .col(string_null(Users::AvatarUrl))
                    .col(string_null(Users::PreferredRating))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Histories::Table)
                    .if_not_exists()
                    .col(pk_auto(Histories::Id))
                    .col(integer(Histories::UserId))
                    .col(integer(Histories::MovieId))
                    .col(string(Histories::WatchedDate))
                    .col(text_null(Histories::Review))
                    .col(double_null(Histories::Rating))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_histories_user")
                            .from(Histories::Table, Histories::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_histories_movie")
                            .from(Histories::Table, Histories::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_histories_user_movie_unique")
                    .table(Histories::Table)
                    .col(Histories::UserId)
                    .col(Histories::MovieId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_histories_user_watched_date")
                    .table(Histories::Table)
                    .col(Histories::UserId)
                    .col(Histories::WatchedDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tags::Table)
                    .if_not_exists()
                    .col(pk_auto(Tags::Id))
                    .col(integer(Tags::UserId))
                    .col(string(Tags::Name))
                    .col(string(Tags::Color))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_tags_user")
                            .from(Tags::Table, Tags::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(HistoryTags::Table)
                    .if_not_exists()
                    .col(integer(HistoryTags::HistoryId))
                    .col(integer(HistoryTags::TagId))
                    .primary_key(Index::create().col(HistoryTags::HistoryId).col(HistoryTags::TagId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_history_tags_history")
                            .from(HistoryTags::Table, HistoryTags::HistoryId)
                            .to(Histories::Table, Histories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_history_tags_tag")
                            .from(HistoryTags::Table, HistoryTags::TagId)
                            .to(Tags::Table, Tags::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(HistoryTags::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Tags::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Histories::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Email,
    Name,
    Username,
    AvatarUrl,
    PreferredRating,
}

#[derive(DeriveIden)]
enum Histories {
    Table,
    Id,
    UserId,
    MovieId,
    WatchedDate,
    Review,
    Rating,
}

#[derive(DeriveIden)]
enum Tags {
    Table,
    Id,
    UserId,
    Name,
    Color,
}

#[derive(DeriveIden)]
enum HistoryTags {
    Table,
    HistoryId,
    TagId,
}
