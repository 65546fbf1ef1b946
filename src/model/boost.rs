use super::{
    constants::{BOOST_MAX, BOOST_MIN},
    structures::parameter_set::BoostParameters
};

/// K-factor multiplier for a player about to play a match.
///
/// The new-player component fades linearly from `new_boost` at zero matches to
/// 1.0 at `new_threshold` matches. The returning-player component is a flat
/// `returning_boost` once the player has been idle longer than
/// `returning_days`. Both combine multiplicatively and the result is clamped
/// to `[1.0, 3.0]`.
pub fn boost(params: &BoostParameters, total_matches: i32, days_since_last_match: Option<i64>) -> f64 {
    let multiplier = new_player_component(params, total_matches) * returning_component(params, days_since_last_match);

    multiplier.clamp(BOOST_MIN, BOOST_MAX)
}

fn new_player_component(params: &BoostParameters, total_matches: i32) -> f64 {
    if params.new_threshold <= 0 || total_matches >= params.new_threshold {
        return 1.0;
    }

    let progress = total_matches.max(0) as f64 / params.new_threshold as f64;
    params.new_boost + (1.0 - params.new_boost) * progress
}

fn returning_component(params: &BoostParameters, days_since_last_match: Option<i64>) -> f64 {
    match days_since_last_match {
        Some(days) if days as f64 > params.returning_days => params.returning_boost,
        _ => 1.0
    }
}
