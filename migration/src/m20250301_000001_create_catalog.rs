use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Movies::Table)
                    .if_not_exists()
                    .col(pk_auto(Movies::Id))
                    .col(string(Movies::Title))
                    .col(string(Movies::OriginalTitle))
                    .col(string(Movies::ReleaseDate))
                    .col(integer_null(Movies::Runtime))
                    .col(string_null(Movies::ImdbId))
                    .col(integer(Movies::TmdbId).unique_key())
                    .col(string_null(Movies::PosterPath))
                    .col(double(Movies::AverageRating).default(0.0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieRatings::Table)
                    .if_not_exists()
                    .col(integer(MovieRatings::MovieId))
                    .col(string(MovieRatings::RatingSource))
                    .col(double(MovieRatings::Value))
                    .primary_key(
                        Index::create().col(MovieRatings::MovieId).col(MovieRatings::RatingSource),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_ratings_movie")
                            .from(MovieRatings::Table, MovieRatings::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(People::Table)
                    .if_not_exists()
                    .col(pk_auto(People::Id))
                    .col(string(People::Name))
                    .col(integer(People::TmdbId).unique_key())
                    .col(integer_null(People::Gender))
                    .col(string_null(People::ProfilePath))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MoviePerson::Table)
                    .if_not_exists()
                    .col(integer(MoviePerson::PersonId))
                    .col(integer(MoviePerson::MovieId))
                    .col(string(MoviePerson::Role))
                    .col(string_null(MoviePerson::Character))
                    .col(integer_null(MoviePerson::BillingOrder))
                    .primary_key(
                        Index::create()
                            .col(MoviePerson::PersonId)
                            .col(MoviePerson::MovieId)
                            .col(MoviePerson::Role),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_person_person")
                            .from(MoviePerson::Table, MoviePerson::PersonId)
                            .to(People::Table, People::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_person_movie")
                            .from(MoviePerson::Table, MoviePerson::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_movie_person_movie")
                    .table(MoviePerson::Table)
                    .col(MoviePerson::MovieId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Genres::Table)
                    .if_not_exists()
                    .col(pk_auto(Genres::Id))
                    .col(string(Genres::Name))
                    .col(integer(Genres::TmdbId).unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieGenres::Table)
                    .if_not_exists()
                    .col(integer(MovieGenres::MovieId))
                    .col(integer(MovieGenres::GenreId))
                    .primary_key(Index::create().col(MovieGenres::MovieId).col(MovieGenres::GenreId))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genres_movie")
                            .from(MovieGenres::Table, MovieGenres::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_genres_genre")
                            .from(MovieGenres::Table, MovieGenres::GenreId)
                            .to(Genres::Table, Genres::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Companies::Table)
                    .if_not_exists()
                    .col(pk_auto(Companies::Id))
                    .col(string(Companies::Name))
                    .col(integer(Companies::TmdbId).unique_key())
                    .col(string_null(Companies::LogoPath))
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(MovieCompanies::Table)
                    .if_not_exists()
                    .col(integer(MovieCompanies::MovieId))
                    .col(integer(MovieCompanies::CompanyId))
                    .primary_key(
                        Index::create().col(MovieCompanies::MovieId).col(MovieCompanies::CompanyId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_companies_movie")
                            .from(MovieCompanies::Table, MovieCompanies::MovieId)
                            .to(Movies::Table, Movies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_movie_companies_company")
                            .from(MovieCompanies::Table, MovieCompanies::CompanyId)
                            .to(Companies::Table, Companies::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(MovieCompanies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Companies::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieGenres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Genres::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MoviePerson::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(People::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(MovieRatings::Table).to_owned()).await?;
        manager.drop_table(Table::drop().table(Movies::Table).to_owned()).await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
pub(crate) enum Movies {
    Table,
    Id,
    Title,
    OriginalTitle,
    ReleaseDate,
    Runtime,
    ImdbId,
    TmdbId,
    PosterPath,
    AverageRating,
}

#[derive(DeriveIden)]
enum MovieRatings {
    Table,
    MovieId,
    RatingSource,
    Value,
}

#[derive(DeriveIden)]
enum People {
    Table,
    Id,
    Name,
    TmdbId,
    Gender,
    ProfilePath,
}

#[derive(DeriveIden)]
enum MoviePerson {
    Table,
    PersonId,
    MovieId,
    Role,
    Character,
    BillingOrder,
}

#[derive(DeriveIden)]
enum Genres {
    Table,
    Id,
    Name,
    TmdbId,
}

#[derive(DeriveIden)]
enum MovieGenres {
    Table,
    MovieId,
    GenreId,
}

#[derive(DeriveIden)]
enum Companies {
    Table,
    Id,
    Name,
    TmdbId,
    LogoPath,
}

#[derive(DeriveIden)]
enum MovieCompanies {
    Table,
    MovieId,
    CompanyId,
}
