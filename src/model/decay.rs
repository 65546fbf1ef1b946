use super::{
    constants::DEFAULT_RATING,
    structures::{parameter_set::DecayParameters, rating::Rating}
};

/// Pulls an idle player's rating back toward the default rating.
///
/// No-op while `days_idle <= grace_days`. Beyond that the distance from the
/// default rating shrinks by `exp(-rate * excess_days / 365)`.
///
/// Called on the stored rating at the moment it becomes a pre-match rating, so
/// consecutive idle spells compound from whatever the rating was at the time.
pub fn decay(params: &DecayParameters, rating: Rating, days_idle: Option<i64>) -> Rating {
    let days_idle = match days_idle {
        Some(days) => days as f64,
        None => return rating
    };

    if days_idle <= params.grace_days {
        return rating;
    }

    let excess_days = days_idle - params.grace_days;
    let retained = (-params.rate * excess_days / 365.0).exp();
    let distance = (rating - DEFAULT_RATING).points();

    DEFAULT_RATING + Rating::from_points(distance * retained)
}
