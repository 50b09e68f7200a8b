//! Per-user analytics over watch history.

pub mod detail;
pub mod query;
pub mod ranking;
pub mod retrospective;
pub mod stats;
pub mod summary;

use sea_orm::{
    FromQueryResult,
    sea_query::{Alias, Expr, Func, Order, SelectStatement},
};
use serde::Serialize;

use self::query::{DatePart, Scope, count_distinct, date_part, watched};
use crate::entities::{history, movie};

/// Months are 1-12.
#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct MonthCount {
    pub month: i32,
    pub count: i64,
}

/// 0 = Sunday through 6 = Saturday.
#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct WeekdayCount {
    pub weekday: i32,
    pub count: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct YearCount {
    pub year: i32,
    pub count: i64,
}

/// Histories per calendar bucket of the watched date. Sparse: empty buckets
/// are absent.
pub(crate) fn watched_histogram(user_id: i32, scope: Scope, part: DatePart, bucket: &'static str) -> SelectStatement {
    let expr = date_part(part, history::Entity, "watched_date");
    let mut select = watched(user_id, scope);
    select
        .expr_as(expr.clone(), Alias::new(bucket))
        .expr_as(count_distinct(history::Entity, "id"), Alias::new("count"))
        .add_group_by([expr])
        .order_by(Alias::new(bucket), Order::Asc);
    select
}

/// Aggregate figures over every history in a scope. Sum and average are
/// `None` when the scope is empty.
#[derive(Clone, Debug, PartialEq, FromQueryResult)]
pub(crate) struct Totals {
    pub watched: i64,
    pub runtime: Option<i64>,
    pub average: Option<f64>,
}

pub(crate) fn totals(user_id: i32, scope: Scope) -> SelectStatement {
    let mut select = watched(user_id, scope);
    select
        .expr_as(Func::count(Expr::col((history::Entity, history::Column::Id))), Alias::new("watched"))
        .expr_as(Func::sum(Expr::col((movie::Entity, movie::Column::Runtime))), Alias::new("runtime"))
        .expr_as(Func::avg(Expr::col((movie::Entity, movie::Column::AverageRating))), Alias::new("average"));
    select
}
