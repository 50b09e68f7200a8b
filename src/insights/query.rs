//! Query builder for the per-dimension stats aggregates.
//!
//! A [`StatsQuery`] is plain data: the dimension being grouped, the rating
//! join, a list of predicates, an optional sample-size floor and the sort.
//! It is translated into `sea_query` statements in one place so the count
//! and page statements always share the same joins, predicates and HAVING.

use jiff::civil::Date;
use sea_orm::{
    ConnectionTrait, EntityName, FromQueryResult,
    sea_query::{Alias, Expr, Func, JoinType, LikeExpr, Query, SelectStatement, SimpleExpr},
};

use crate::{
    entities::{company, genre, history, movie, movie_company, movie_genre, movie_person, movie_rating, person},
    error::{AppError, AppResult},
    models::{RatingSource, Role},
    params::{AverageBy, Pagination, SortDirection},
};

/// A calendar year as the half-open window `[year-01-01, (year+1)-01-01)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct YearWindow {
    pub year: i16,
    pub start: Date,
    pub end: Date,
}

impl YearWindow {
    pub fn new(year: i16) -> AppResult<Self> {
        let start = Date::new(year, 1, 1).map_err(|_| AppError::validation("year", "out of range"))?;
        let end = year
            .checked_add(1)
            .and_then(|next| Date::new(next, 1, 1).ok())
            .ok_or_else(|| AppError::validation("year", "out of range"))?;
        Ok(Self { year, start, end })
    }

    /// `start <= column < end` over an ISO date column.
    pub fn condition(&self, column: SimpleExpr) -> SimpleExpr {
        Expr::expr(column.clone())
            .gte(self.start.to_string())
            .and(Expr::expr(column).lt(self.end.to_string()))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dimension {
    Person,
    Genre,
    Company,
    ReleaseYear,
    WatchedYear,
}

impl Dimension {
    fn is_year(self) -> bool {
        matches!(self, Dimension::ReleaseYear | Dimension::WatchedYear)
    }

    fn id_column(self) -> Option<SimpleExpr> {
        Some(match self {
            Dimension::Person => Expr::col((person::Entity, person::Column::Id)).into(),
            Dimension::Genre => Expr::col((genre::Entity, genre::Column::Id)).into(),
            Dimension::Company => Expr::col((company::Entity, company::Column::Id)).into(),
            Dimension::ReleaseYear | Dimension::WatchedYear => return None,
        })
    }

    fn tmdb_id_column(self) -> Option<SimpleExpr> {
        Some(match self {
            Dimension::Person => Expr::col((person::Entity, person::Column::TmdbId)).into(),
            Dimension::Genre => Expr::col((genre::Entity, genre::Column::TmdbId)).into(),
            Dimension::Company => Expr::col((company::Entity, company::Column::TmdbId)).into(),
            Dimension::ReleaseYear | Dimension::WatchedYear => return None,
        })
    }

    fn name_column(self) -> Option<SimpleExpr> {
        Some(match self {
            Dimension::Person => Expr::col((person::Entity, person::Column::Name)).into(),
            Dimension::Genre => Expr::col((genre::Entity, genre::Column::Name)).into(),
            Dimension::Company => Expr::col((company::Entity, company::Column::Name)).into(),
            Dimension::ReleaseYear | Dimension::WatchedYear => return None,
        })
    }

    /// The year bucket for year dimensions.
    fn year_expr(self) -> Option<SimpleExpr> {
        match self {
            Dimension::ReleaseYear => Some(date_part(DatePart::Year, movie::Entity, "release_date")),
            Dimension::WatchedYear => Some(date_part(DatePart::Year, history::Entity, "watched_date")),
            _ => None,
        }
    }

    /// Identifying columns, selected and grouped on.
    fn key_columns(self) -> Vec<(SimpleExpr, &'static str)> {
        match self {
            Dimension::Person => vec![
                (Expr::col((person::Entity, person::Column::Id)).into(), "id"),
                (Expr::col((person::Entity, person::Column::TmdbId)).into(), "tmdb_id"),
                (Expr::col((person::Entity, person::Column::Name)).into(), "name"),
                (Expr::col((person::Entity, person::Column::ProfilePath)).into(), "profile_path"),
            ],
            Dimension::Genre => vec![
                (Expr::col((genre::Entity, genre::Column::Id)).into(), "id"),
                (Expr::col((genre::Entity, genre::Column::TmdbId)).into(), "tmdb_id"),
                (Expr::col((genre::Entity, genre::Column::Name)).into(), "name"),
            ],
            Dimension::Company => vec![
                (Expr::col((company::Entity, company::Column::Id)).into(), "id"),
                (Expr::col((company::Entity, company::Column::TmdbId)).into(), "tmdb_id"),
                (Expr::col((company::Entity, company::Column::Name)).into(), "name"),
                (Expr::col((company::Entity, company::Column::LogoPath)).into(), "logo_path"),
            ],
            Dimension::ReleaseYear | Dimension::WatchedYear => {
                self.year_expr().map(|year| vec![(year, "year")]).unwrap_or_default()
            },
        }
    }

    fn join_dimension(self, select: &mut SelectStatement) {
        match self {
            Dimension::Person => {
                select
                    .join(
                        JoinType::InnerJoin,
                        movie_person::Entity,
                        Expr::col((movie_person::Entity, movie_person::Column::MovieId))
                            .equals((movie::Entity, movie::Column::Id)),
                    )
                    .join(
                        JoinType::InnerJoin,
                        person::Entity,
                        Expr::col((person::Entity, person::Column::Id))
                            .equals((movie_person::Entity, movie_person::Column::PersonId)),
                    );
            },
            Dimension::Genre => {
                select
                    .join(
                        JoinType::InnerJoin,
                        movie_genre::Entity,
                        Expr::col((movie_genre::Entity, movie_genre::Column::MovieId))
                            .equals((movie::Entity, movie::Column::Id)),
                    )
                    .join(
                        JoinType::InnerJoin,
                        genre::Entity,
                        Expr::col((genre::Entity, genre::Column::Id))
                            .equals((movie_genre::Entity, movie_genre::Column::GenreId)),
                    );
            },
            Dimension::Company => {
                select
                    .join(
                        JoinType::InnerJoin,
                        movie_company::Entity,
                        Expr::col((movie_company::Entity, movie_company::Column::MovieId))
                            .equals((movie::Entity, movie::Column::Id)),
                    )
                    .join(
                        JoinType::InnerJoin,
                        company::Entity,
                        Expr::col((company::Entity, company::Column::Id))
                            .equals((movie_company::Entity, movie_company::Column::CompanyId)),
                    );
            },
            Dimension::ReleaseYear | Dimension::WatchedYear => {},
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortKey {
    Name,
    Average,
    Count,
    Year,
}

impl SortKey {
    /// Maps a `sort_by` column token. Unknown tokens sort by the default order.
    pub fn from_column(column: &str) -> Option<Self> {
        match column {
            "name" => Some(SortKey::Name),
            "average" | "avgRating" => Some(SortKey::Average),
            "count" | "appearances" => Some(SortKey::Count),
            "year" => Some(SortKey::Year),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    UserIs(i32),
    NameContains(String),
    EntityIdIs(i32),
    TmdbIdIs(i32),
    RoleIn(&'static [Role]),
    BillingOrderAtMost(i32),
    GenderIs(i32),
    WatchedWithin(YearWindow),
    ReleasedWithin(YearWindow),
}

impl Predicate {
    /// `None` when the predicate has no meaning for `dimension`.
    fn condition(&self, dimension: Dimension) -> Option<SimpleExpr> {
        let person_only = dimension == Dimension::Person;
        match self {
            Predicate::UserIs(user_id) => Some(Expr::col((history::Entity, history::Column::UserId)).eq(*user_id)),
            Predicate::NameContains(query) => dimension
                .name_column()
                .map(|name| Expr::expr(Func::lower(name)).like(contains_pattern(query))),
            Predicate::EntityIdIs(id) => dimension.id_column().map(|col| Expr::expr(col).eq(*id)),
            Predicate::TmdbIdIs(id) => dimension.tmdb_id_column().map(|col| Expr::expr(col).eq(*id)),
            Predicate::RoleIn(roles) => person_only.then(|| {
                Expr::col((movie_person::Entity, movie_person::Column::Role)).is_in(roles.iter().map(|r| r.as_str()))
            }),
            Predicate::BillingOrderAtMost(max) => person_only
                .then(|| Expr::col((movie_person::Entity, movie_person::Column::BillingOrder)).lte(*max)),
            Predicate::GenderIs(gender) => {
                person_only.then(|| Expr::col((person::Entity, person::Column::Gender)).eq(*gender))
            },
            Predicate::WatchedWithin(window) => {
                Some(window.condition(Expr::col((history::Entity, history::Column::WatchedDate)).into()))
            },
            Predicate::ReleasedWithin(window) => {
                Some(window.condition(Expr::col((movie::Entity, movie::Column::ReleaseDate)).into()))
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StatsQuery {
    pub dimension: Dimension,
    pub rating_source: RatingSource,
    pub average_by: AverageBy,
    pub predicates: Vec<Predicate>,
    /// `HAVING COUNT(history) >= n`.
    pub min_appearances: Option<u32>,
    pub sort: Option<(SortKey, SortDirection)>,
}

impl StatsQuery {
    pub fn new(dimension: Dimension, user_id: i32, rating_source: RatingSource, average_by: AverageBy) -> Self {
        Self {
            dimension,
            rating_source,
            average_by,
            predicates: vec![Predicate::UserIs(user_id)],
            min_appearances: None,
            sort: None,
        }
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn filter_opt<T>(self, value: Option<T>, predicate: impl FnOnce(T) -> Predicate) -> Self {
        match value {
            Some(value) => self.filter(predicate(value)),
            None => self,
        }
    }

    pub fn min_appearances(mut self, floor: u32) -> Self {
        self.min_appearances = Some(floor);
        self
    }

    pub fn sort(mut self, key: Option<SortKey>, direction: SortDirection) -> Self {
        self.sort = key.map(|key| (key, direction));
        self
    }

    fn average_expr(&self) -> SimpleExpr {
        match self.average_by {
            AverageBy::MovieAverage => Expr::col((movie::Entity, movie::Column::AverageRating)).into(),
            AverageBy::SourceValue => Expr::col((movie_rating::Entity, movie_rating::Column::Value)).into(),
        }
    }

    /// The grouped aggregate, without ordering or pagination.
    pub fn grouped(&self) -> SelectStatement {
        let mut select = Query::select();

        let keys = self.dimension.key_columns();
        for (expr, alias) in &keys {
            select.expr_as(expr.clone(), Alias::new(*alias));
        }
        select
            .expr_as(Func::count(Expr::col((history::Entity, history::Column::Id))), Alias::new("appearances"))
            .expr_as(Func::avg(self.average_expr()), Alias::new("avg_rating"))
            .from(history::Entity)
            .join(
                JoinType::InnerJoin,
                movie::Entity,
                Expr::col((movie::Entity, movie::Column::Id)).equals((history::Entity, history::Column::MovieId)),
            )
            .join(
                JoinType::InnerJoin,
                movie_rating::Entity,
                Expr::col((movie_rating::Entity, movie_rating::Column::MovieId))
                    .equals((history::Entity, history::Column::MovieId))
                    .and(
                        Expr::col((movie_rating::Entity, movie_rating::Column::RatingSource))
                            .eq(self.rating_source.as_str()),
                    ),
            );
        self.dimension.join_dimension(&mut select);

        for predicate in &self.predicates {
            if let Some(condition) = predicate.condition(self.dimension) {
                select.and_where(condition);
            }
        }

        select.add_group_by(keys.into_iter().map(|(expr, _)| expr));

        if let Some(floor) = self.min_appearances {
            select.and_having(Expr::expr(Func::count(Expr::col((history::Entity, history::Column::Id)))).gte(floor));
        }

        select
    }

    /// Counts groups, not joined rows.
    pub fn count_statement(&self) -> SelectStatement {
        Query::select()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new("total"))
            .from_subquery(self.grouped(), Alias::new("sub_query"))
            .to_owned()
    }

    pub fn page_statement(&self, pagination: Pagination) -> SelectStatement {
        let mut select = self.grouped();

        if let Some((key, direction)) = self.sort {
            let order = direction.order();
            match key {
                SortKey::Name => {
                    if let Some(name) = self.dimension.name_column() {
                        select.order_by_expr(name, order);
                    }
                },
                SortKey::Average => {
                    select.order_by(Alias::new("avg_rating"), order);
                },
                SortKey::Count => {
                    select.order_by(Alias::new("appearances"), order);
                },
                SortKey::Year => {
                    if self.dimension.is_year() {
                        select.order_by(Alias::new("year"), order);
                    }
                },
            }
        }

        if self.dimension.is_year() {
            if !matches!(self.sort, Some((SortKey::Year, _))) {
                select.order_by(Alias::new("year"), SortDirection::Asc.order());
            }
        } else {
            select.order_by(Alias::new("id"), SortDirection::Asc.order());
        }

        select.limit(pagination.limit).offset(pagination.offset);
        select
    }
}

/// Restricts a user's watched movies to one entity or one year.
///
/// Bridge tables are joined under the `scope` alias so callers can join the
/// same table again for their own grouping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Scope {
    All,
    Person(i32),
    Genre(i32),
    Company(i32),
    ReleasedIn(YearWindow),
    WatchedIn(YearWindow),
}

impl Scope {
    fn apply(&self, select: &mut SelectStatement) {
        let scope = || Alias::new("scope");
        match *self {
            Scope::All => {},
            Scope::Person(id) => {
                select.join_as(
                    JoinType::InnerJoin,
                    movie_person::Entity,
                    scope(),
                    Expr::col((scope(), movie_person::Column::MovieId))
                        .equals((history::Entity, history::Column::MovieId))
                        .and(Expr::col((scope(), movie_person::Column::PersonId)).eq(id)),
                );
            },
            Scope::Genre(id) => {
                select.join_as(
                    JoinType::InnerJoin,
                    movie_genre::Entity,
                    scope(),
                    Expr::col((scope(), movie_genre::Column::MovieId))
                        .equals((history::Entity, history::Column::MovieId))
                        .and(Expr::col((scope(), movie_genre::Column::GenreId)).eq(id)),
                );
            },
            Scope::Company(id) => {
                select.join_as(
                    JoinType::InnerJoin,
                    movie_company::Entity,
                    scope(),
                    Expr::col((scope(), movie_company::Column::MovieId))
                        .equals((history::Entity, history::Column::MovieId))
                        .and(Expr::col((scope(), movie_company::Column::CompanyId)).eq(id)),
                );
            },
            Scope::ReleasedIn(window) => {
                select.and_where(window.condition(Expr::col((movie::Entity, movie::Column::ReleaseDate)).into()));
            },
            Scope::WatchedIn(window) => {
                select.and_where(window.condition(Expr::col((history::Entity, history::Column::WatchedDate)).into()));
            },
        }
    }
}

/// `histories` joined to `movies` for one user, narrowed by `scope`. Selects nothing.
pub fn watched(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = Query::select();
    select
        .from(history::Entity)
        .join(
            JoinType::InnerJoin,
            movie::Entity,
            Expr::col((movie::Entity, movie::Column::Id)).equals((history::Entity, history::Column::MovieId)),
        )
        .and_where(Expr::col((history::Entity, history::Column::UserId)).eq(user_id));
    scope.apply(&mut select);
    select
}

/// Selects the `MovieRef` columns of `movies`.
pub fn select_movie_ref(select: &mut SelectStatement) -> &mut SelectStatement {
    select.columns([
        (movie::Entity, movie::Column::Id),
        (movie::Entity, movie::Column::TmdbId),
        (movie::Entity, movie::Column::Title),
        (movie::Entity, movie::Column::PosterPath),
        (movie::Entity, movie::Column::ReleaseDate),
        (movie::Entity, movie::Column::Runtime),
        (movie::Entity, movie::Column::AverageRating),
    ])
}

/// Case-folded `LIKE` pattern matching `needle` as a literal substring.
pub fn contains_pattern(needle: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape('\\')
}

/// `COUNT(DISTINCT table.column)`.
pub fn count_distinct<E: EntityName>(entity: E, column: &str) -> SimpleExpr {
    Expr::cust(format!("COUNT(DISTINCT \"{}\".\"{}\")", entity.table_name(), column))
}

#[derive(Clone, Copy, Debug)]
pub enum DatePart {
    Year,
    Month,
    /// 0 = Sunday.
    Weekday,
}

impl DatePart {
    fn format(self) -> &'static str {
        match self {
            DatePart::Year => "%Y",
            DatePart::Month => "%m",
            DatePart::Weekday => "%w",
        }
    }
}

/// Integer calendar part of an ISO date column.
pub fn date_part<E: EntityName>(part: DatePart, entity: E, column: &str) -> SimpleExpr {
    Expr::cust(format!(
        "CAST(strftime('{}', \"{}\".\"{}\") AS INTEGER)",
        part.format(),
        entity.table_name(),
        column
    ))
}

#[derive(Debug, FromQueryResult)]
struct CountRow {
    total: i64,
}

pub async fn fetch_all<T, C>(db: &C, select: SelectStatement) -> AppResult<Vec<T>>
where
    T: FromQueryResult,
    C: ConnectionTrait,
{
    let stmt = db.get_database_backend().build(&select);
    Ok(T::find_by_statement(stmt).all(db).await?)
}

pub async fn fetch_one<T, C>(db: &C, select: SelectStatement) -> AppResult<Option<T>>
where
    T: FromQueryResult,
    C: ConnectionTrait,
{
    let stmt = db.get_database_backend().build(&select);
    Ok(T::find_by_statement(stmt).one(db).await?)
}

pub async fn fetch_count<C: ConnectionTrait>(db: &C, select: SelectStatement) -> AppResult<u64> {
    let row: Option<CountRow> = fetch_one(db, select).await?;
    Ok(row.map(|r| r.total.max(0) as u64).unwrap_or(0))
}
