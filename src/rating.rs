use crate::models::RatingSource;

const UNKNOWN_SOURCE_MAX: f64 = 10.0;

/// A rating as reported by one source, in that source's native scale.
#[derive(Clone, Debug, PartialEq)]
pub struct SourceRating {
    pub source: String,
    pub value: f64,
}

impl SourceRating {
    pub fn new(source: impl Into<String>, value: f64) -> Self {
        Self { source: source.into(), value }
    }
}

/// Rescales every rating to 0–10 and returns their mean, rounded to one decimal.
/// Sources we don't recognise are assumed to already be on a 10-point scale.
pub fn normalize(ratings: &[SourceRating]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }

    let total: f64 = ratings
        .iter()
        .map(|r| {
            let max = RatingSource::parse(&r.source).map_or(UNKNOWN_SOURCE_MAX, RatingSource::max_score);
            r.value / max * 10.0
        })
        .sum();

    round_to(total / ratings.len() as f64, 1)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
