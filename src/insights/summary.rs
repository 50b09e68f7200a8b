use serde::Serialize;
use tracing::debug;

use super::{
    Totals, WeekdayCount,
    query::{DatePart, Scope, fetch_all, fetch_one},
    totals, watched_histogram,
};
use crate::{error::AppResult, rating::round_to, store::Store};

/// Whole-history overview for the insights landing page.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub movie_count: i64,
    pub total_runtime: i64,
    pub average_rating: f64,
    pub activity_by_day_of_week: Vec<WeekdayCount>,
}

impl Store {
    pub async fn history_summary(&self, user_id: i32) -> AppResult<HistorySummary> {
        let (totals, activity_by_day_of_week) = futures::try_join!(
            fetch_one::<Totals, _>(self.db(), totals(user_id, Scope::All)),
            fetch_all(self.db(), watched_histogram(user_id, Scope::All, DatePart::Weekday, "weekday")),
        )?;

        let summary = HistorySummary {
            movie_count: totals.as_ref().map(|t| t.watched).unwrap_or(0),
            total_runtime: totals.as_ref().and_then(|t| t.runtime).unwrap_or(0),
            average_rating: totals.and_then(|t| t.average).map(|avg| round_to(avg, 1)).unwrap_or(0.0),
            activity_by_day_of_week,
        };
        debug!(user_id, movie_count = summary.movie_count, "history summary");
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support as seed;

    #[tokio::test]
    async fn summary_over_whole_history() {
        let store = seed::setup_store().await;
        let db = store.db();
        let me = seed::user(db, "me@example.com").await;
        let other = seed::user(db, "other@example.com").await;

        let a = seed::movie(db, 1, "2000-01-01", 7.0, Some(100)).await;
        let b = seed::movie(db, 2, "2001-01-01", 8.25, None).await;
        seed::history(db, me, a, "2019-03-03", None).await;
        seed::history(db, me, b, "2024-03-03", None).await;
        seed::history(db, other, a, "2024-03-04", None).await;

        let summary = store.history_summary(me).await.unwrap();
        assert_eq!(summary.movie_count, 2);
        assert_eq!(summary.total_runtime, 100);
        assert_eq!(summary.average_rating, 7.6);
        // 2019-03-03 and 2024-03-03 were both Sundays.
        assert_eq!(summary.activity_by_day_of_week, vec![WeekdayCount { weekday: 0, count: 2 }]);
    }

    #[tokio::test]
    async fn empty_history_is_all_zero() {
        let store = seed::setup_store().await;
        let user = seed::user(store.db(), "a@example.com").await;
        let summary = store.history_summary(user).await.unwrap();
        assert_eq!(summary.movie_count, 0);
        assert_eq!(summary.total_runtime, 0);
        assert_eq!(summary.average_rating, 0.0);
        assert!(summary.activity_by_day_of_week.is_empty());
    }
}
