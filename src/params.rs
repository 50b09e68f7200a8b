//! Request parameter parsing and resolution shared by every list endpoint.
//!
//! Raw query strings are validated here so that malformed values are rejected
//! with the offending field named before any query is built.

use async_trait::async_trait;
use sea_orm::sea_query::Order;

use crate::{
    error::{AppError, AppResult},
    models::{RatingSource, RoleFilter},
};

pub const PAGE_SIZE: u64 = 20;

/// Largest page whose offset still binds as a signed 64-bit integer.
pub const MAX_PAGE: u64 = i64::MAX as u64 / PAGE_SIZE + 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn order(self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// A `<column>.<direction>` sort specifier.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    /// Splits on the first `.`; the direction must be `asc` or `desc`.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let (column, direction) = raw
            .split_once('.')
            .ok_or_else(|| AppError::validation("sort_by", format!("expected `<column>.<direction>`, got `{raw}`")))?;

        let direction = match direction {
            "asc" => SortDirection::Asc,
            "desc" => SortDirection::Desc,
            other => {
                return Err(AppError::validation("sort_by", format!("unsupported direction `{other}`")));
            },
        };

        if column.is_empty() {
            return Err(AppError::validation("sort_by", "missing column"));
        }

        Ok(Self { column: column.to_string(), direction })
    }
}

/// Which expression the average-rating aggregate runs over.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AverageBy {
    /// The movie's stored blended average.
    MovieAverage,
    /// The value recorded by one rating source.
    SourceValue,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Pagination {
    /// `page` is 1-indexed.
    pub fn for_page(page: u64) -> Self {
        let offset = page.saturating_sub(1).saturating_mul(PAGE_SIZE).min(i64::MAX as u64);
        Self { offset, limit: PAGE_SIZE }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedParams {
    pub pagination: Pagination,
    pub sort: SortSpec,
    /// Concrete source row joined from `movie_ratings`.
    pub rating_source: RatingSource,
    pub average_by: AverageBy,
}

/// Resolves pagination, sorting and the rating source for one request.
///
/// Without an explicit source the displayed value is the movie's blended
/// average, but the ratings join still needs one concrete source row: the
/// user's preferred source, or `fallback` when they have none.
pub fn resolve(
    page: u64,
    sort_by: &str,
    selected: Option<RatingSource>,
    preferred: Option<RatingSource>,
    fallback: RatingSource,
) -> AppResult<ResolvedParams> {
    check_page(page)?;
    let sort = SortSpec::parse(sort_by)?;

    let (rating_source, average_by) = match selected {
        Some(source) => (source, AverageBy::SourceValue),
        None => (preferred.unwrap_or(fallback), AverageBy::MovieAverage),
    };

    Ok(ResolvedParams { pagination: Pagination::for_page(page), sort, rating_source, average_by })
}

/// Where a user's stored rating preference comes from.
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    async fn preferred_rating_source(&self, user_id: i32) -> AppResult<Option<RatingSource>>;
}

/// Looks up the user's preference only when the request did not pick a source.
pub async fn resolve_for_user<P>(
    prefs: &P,
    user_id: i32,
    page: u64,
    sort_by: &str,
    selected: Option<RatingSource>,
    fallback: RatingSource,
) -> AppResult<ResolvedParams>
where
    P: PreferenceSource + ?Sized,
{
    let preferred = match selected {
        Some(_) => None,
        None => prefs.preferred_rating_source(user_id).await?,
    };
    resolve(page, sort_by, selected, preferred, fallback)
}

fn check_page(page: u64) -> AppResult<u64> {
    match page {
        0 => Err(AppError::validation("page", "must be at least 1")),
        p if p > MAX_PAGE => Err(AppError::validation("page", format!("must be at most {MAX_PAGE}"))),
        p => Ok(p),
    }
}

fn non_empty(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

pub fn parse_page(raw: Option<&str>) -> AppResult<u64> {
    let Some(raw) = non_empty(raw) else {
        return Ok(1);
    };
    match raw.parse::<u64>() {
        Ok(page) => check_page(page),
        Err(_) => Err(AppError::validation("page", format!("expected an integer >= 1, got `{raw}`"))),
    }
}

/// Validates `sort_by` against the endpoint's allowed values.
pub fn parse_sort_by<'a>(raw: Option<&'a str>, allowed: &[&str], default: &'a str) -> AppResult<&'a str> {
    let Some(raw) = non_empty(raw) else {
        return Ok(default);
    };
    if allowed.contains(&raw) {
        Ok(raw)
    } else {
        Err(AppError::validation("sort_by", format!("expected one of {}", allowed.join(", "))))
    }
}

pub fn parse_rating_source(raw: Option<&str>) -> AppResult<Option<RatingSource>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    RatingSource::parse(raw).map(Some).ok_or_else(|| {
        AppError::validation("selected_rating", "expected one of IMDB, TMDB, ROTTEN_TOMATOES, METACRITIC")
    })
}

pub fn parse_role(raw: Option<&str>) -> AppResult<Option<RoleFilter>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    RoleFilter::parse(raw)
        .map(Some)
        .ok_or_else(|| AppError::validation("role", "expected one of cast, director, writer, producer"))
}

pub fn parse_id(field: &'static str, raw: Option<&str>) -> AppResult<Option<i32>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    raw.parse::<i32>()
        .map(Some)
        .map_err(|_| AppError::validation(field, format!("expected an integer, got `{raw}`")))
}

/// A four-digit year between 1900 and `current_year`.
pub fn parse_year(field: &'static str, raw: Option<&str>, current_year: i16) -> AppResult<Option<i16>> {
    let Some(raw) = non_empty(raw) else {
        return Ok(None);
    };
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation(field, "year must be a 4-digit number"));
    }
    let year: i16 = raw.parse().map_err(|_| AppError::validation(field, "year must be a 4-digit number"))?;
    if !(1900..=current_year).contains(&year) {
        return Err(AppError::validation(field, format!("year must be between 1900 and {current_year}")));
    }
    Ok(Some(year))
}

pub fn current_year() -> i16 {
    let today: jiff::civil::Date = jiff::Zoned::now().into();
    today.year()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_offsets_follow_page_size() {
        for page in 1..=5u64 {
            let p = Pagination::for_page(page);
            assert_eq!(p.offset, (page - 1) * 20);
            assert_eq!(p.limit, 20);
        }
    }

    #[test]
    fn sort_splits_on_first_dot() {
        let spec = SortSpec::parse("average.desc").unwrap();
        assert_eq!(spec.column, "average");
        assert_eq!(spec.direction, SortDirection::Desc);

        let err = SortSpec::parse("rating.imdb.asc").unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sort_by", .. }));
    }

    #[test]
    fn unknown_direction_is_rejected() {
        let err = SortSpec::parse("count.sideways").unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "sort_by", .. }));
        assert!(SortSpec::parse("count").is_err());
    }

    #[test]
    fn explicit_source_averages_its_own_values() {
        let resolved =
            resolve(2, "count.desc", Some(RatingSource::Tmdb), Some(RatingSource::Imdb), RatingSource::Imdb)
                .unwrap();
        assert_eq!(resolved.pagination, Pagination { offset: 20, limit: 20 });
        assert_eq!(resolved.rating_source, RatingSource::Tmdb);
        assert_eq!(resolved.average_by, AverageBy::SourceValue);
    }

    #[test]
    fn average_mode_joins_on_preferred_source() {
        let resolved =
            resolve(1, "name.asc", None, Some(RatingSource::Metacritic), RatingSource::Imdb).unwrap();
        assert_eq!(resolved.rating_source, RatingSource::Metacritic);
        assert_eq!(resolved.average_by, AverageBy::MovieAverage);

        let resolved = resolve(1, "name.asc", None, None, RatingSource::Imdb).unwrap();
        assert_eq!(resolved.rating_source, RatingSource::Imdb);
    }

    #[test]
    fn huge_pages_are_rejected_before_the_offset_overflows() {
        let last = resolve(MAX_PAGE, "name.asc", None, None, RatingSource::Imdb).unwrap();
        assert!(last.pagination.offset <= i64::MAX as u64);

        let err = resolve(MAX_PAGE + 1, "name.asc", None, None, RatingSource::Imdb).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "page", .. }));

        for raw in ["500000000000000000", "18446744073709551615", "99999999999999999999"] {
            let err = parse_page(Some(raw)).unwrap_err();
            assert!(matches!(err, AppError::Validation { field: "page", .. }), "{raw}");
        }
        assert_eq!(Pagination::for_page(u64::MAX).offset, i64::MAX as u64);
    }

    #[test]
    fn page_zero_is_rejected() {
        let err = resolve(0, "name.asc", None, None, RatingSource::Imdb).unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "page", .. }));
    }

    struct FixedPreference(Option<RatingSource>);

    #[async_trait]
    impl PreferenceSource for FixedPreference {
        async fn preferred_rating_source(&self, _user_id: i32) -> AppResult<Option<RatingSource>> {
            Ok(self.0)
        }
    }

    struct NoUser;

    #[async_trait]
    impl PreferenceSource for NoUser {
        async fn preferred_rating_source(&self, user_id: i32) -> AppResult<Option<RatingSource>> {
            Err(AppError::not_found(format!("user {user_id}")))
        }
    }

    #[tokio::test]
    async fn resolve_for_user_reads_preference_in_average_mode() {
        let prefs = FixedPreference(Some(RatingSource::RottenTomatoes));
        let resolved = resolve_for_user(&prefs, 7, 1, "count.desc", None, RatingSource::Imdb).await.unwrap();
        assert_eq!(resolved.rating_source, RatingSource::RottenTomatoes);
    }

    #[tokio::test]
    async fn resolve_for_user_skips_lookup_when_source_is_explicit() {
        let resolved =
            resolve_for_user(&NoUser, 7, 1, "count.desc", Some(RatingSource::Imdb), RatingSource::Tmdb)
                .await
                .unwrap();
        assert_eq!(resolved.rating_source, RatingSource::Imdb);

        let err = resolve_for_user(&NoUser, 7, 1, "count.desc", None, RatingSource::Tmdb).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn raw_page_defaults_and_validates() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("")).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert!(matches!(parse_page(Some("0")), Err(AppError::Validation { field: "page", .. })));
        assert!(matches!(parse_page(Some("two")), Err(AppError::Validation { field: "page", .. })));
    }

    #[test]
    fn sort_by_must_be_in_endpoint_enum() {
        let allowed = ["count.desc", "name.asc"];
        assert_eq!(parse_sort_by(None, &allowed, "name.asc").unwrap(), "name.asc");
        assert_eq!(parse_sort_by(Some("count.desc"), &allowed, "name.asc").unwrap(), "count.desc");
        assert!(parse_sort_by(Some("year.desc"), &allowed, "name.asc").is_err());
    }

    #[test]
    fn years_are_four_digits_in_range() {
        assert_eq!(parse_year("year", Some("1999"), 2025).unwrap(), Some(1999));
        assert_eq!(parse_year("year", None, 2025).unwrap(), None);
        assert!(parse_year("year", Some("99"), 2025).is_err());
        assert!(parse_year("year", Some("1899"), 2025).is_err());
        assert!(parse_year("year", Some("2030"), 2025).is_err());
        assert!(parse_year("year", Some("20x0"), 2025).is_err());
    }

    #[test]
    fn enum_params_name_the_field_on_failure() {
        assert!(matches!(
            parse_rating_source(Some("LETTERBOXD")),
            Err(AppError::Validation { field: "selected_rating", .. })
        ));
        assert!(matches!(parse_role(Some("gaffer")), Err(AppError::Validation { field: "role", .. })));
        assert!(matches!(parse_id("genre_id", Some("abc")), Err(AppError::Validation { field: "genre_id", .. })));
        assert_eq!(parse_role(Some("cast")).unwrap(), Some(RoleFilter::Cast));
    }
}
