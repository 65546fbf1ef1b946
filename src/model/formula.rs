use super::structures::{match_record::Side, rating::Rating};

/// Outcome of applying one match to both players' ratings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingChange {
    pub rating_a_before: Rating,
    pub rating_b_before: Rating,
    pub rating_a_after: Rating,
    pub rating_b_after: Rating,
    /// Pre-match win probability of player A
    pub expected_a: f64,
    /// K after boost and margin scaling
    pub effective_k: f64
}

impl RatingChange {
    pub fn delta_a(&self) -> Rating {
        self.rating_a_after - self.rating_a_before
    }

    pub fn delta_b(&self) -> Rating {
        self.rating_b_after - self.rating_b_before
    }

    /// Whether the lower-rated player won.
    pub fn was_upset(&self) -> bool {
        if self.delta_a() > Rating::ZERO {
            self.rating_a_before < self.rating_b_before
        } else {
            self.rating_b_before < self.rating_a_before
        }
    }
}

/// `E_A = 1 / (1 + 10^((R_B - R_A) / S))`
pub fn expected_score(rating: Rating, opponent: Rating, s: f64) -> f64 {
    1.0 / (1.0 + 10f64.powf((opponent.points() - rating.points()) / s))
}

/// Probability that a player rated `rating` beats one rated `opponent`.
pub fn win_probability(rating: Rating, opponent: Rating, s: f64) -> f64 {
    expected_score(rating, opponent, s)
}

/// The rating needed to have `probability` of beating `opponent`.
///
/// Certain outcomes have no finite answer and are capped at 1000 points
/// either side of the opponent.
pub fn rating_for_probability(probability: f64, opponent: Rating, s: f64) -> Rating {
    if probability >= 1.0 {
        return opponent + Rating::from_points(1000.0);
    }
    if probability <= 0.0 {
        return opponent - Rating::from_points(1000.0);
    }

    let odds_against = (1.0 - probability) / probability;
    Rating::from_points(opponent.points() - s * odds_against.log10())
}

/// Applies a single match result to both players.
///
/// Rating is zero-sum per match: the change is computed once and applied with
/// opposite signs, so `delta_a == -delta_b` exactly. Because the two sides may
/// have different boosts, the match uses the mean of both boosts as its
/// multiplier; when both sides share a boost this is that boost.
#[allow(clippy::too_many_arguments)]
pub fn apply(
    rating_a: Rating,
    rating_b: Rating,
    winner: Side,
    k: f64,
    s: f64,
    margin_factor: f64,
    boost_a: f64,
    boost_b: f64
) -> RatingChange {
    let expected_a = expected_score(rating_a, rating_b, s);
    let outcome_a = match winner {
        Side::A => 1.0,
        Side::B => 0.0
    };

    let effective_k = k * ((boost_a + boost_b) / 2.0) * margin_factor;
    let delta = Rating::from_points(effective_k * (outcome_a - expected_a));

    RatingChange {
        rating_a_before: rating_a,
        rating_b_before: rating_b,
        rating_a_after: rating_a + delta,
        rating_b_after: rating_b - delta,
        expected_a,
        effective_k
    }
}
