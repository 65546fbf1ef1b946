use super::{
    constants::{MARGIN_MAX, MARGIN_MIN, NEUTRAL_DOMINANCE},
    structures::{match_outcome::MatchOutcome, match_record::Side, parameter_set::MarginParameters}
};

/// Games in one set, from player A's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScore {
    pub a: u32,
    pub b: u32,
    /// Loser's points in the tiebreak, when one was played
    pub tiebreak: Option<u32>
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarginResult {
    pub multiplier: f64,
    pub games_won_winner: u32,
    pub games_won_loser: u32,
    pub sets_won_winner: u32,
    pub sets_won_loser: u32,
    /// `(winner games - loser games) / total games`, 0.5 when nothing was counted
    pub dominance_ratio: f64
}

impl MarginResult {
    fn neutral() -> MarginResult {
        MarginResult {
            multiplier: 1.0,
            games_won_winner: 0,
            games_won_loser: 0,
            sets_won_winner: 0,
            sets_won_loser: 0,
            dominance_ratio: NEUTRAL_DOMINANCE
        }
    }
}

const MARKERS: [&str; 6] = ["ret", "ret.", "(ret)", "w/o", "walkover", "def"];

/// Parses score text such as `6-4 3-6 7-6(5)` into sets.
///
/// Retirement and walkover markers are ignored, as are tokens that do not look
/// like a set.
pub fn parse_score(score: &str) -> Vec<SetScore> {
    score
        .split_whitespace()
        .map(|token| token.trim_matches(|c| c == ',' || c == ';'))
        .filter(|token| !MARKERS.contains(&token.to_ascii_lowercase().as_str()))
        .filter_map(parse_set)
        .collect()
}

fn parse_set(token: &str) -> Option<SetScore> {
    let (games, tiebreak) = match token.split_once('(') {
        Some((games, rest)) => (games, rest.strip_suffix(')')?.parse::<u32>().ok()),
        None => (token, None)
    };

    let (a, b) = games.split_once('-')?;
    Some(SetScore {
        a: a.parse().ok()?,
        b: b.parse().ok()?,
        tiebreak
    })
}

/// Margin-of-victory multiplier for a match.
///
/// Only completed matches carry a trustworthy score; every other outcome, and
/// a completed match with no countable games, gets the neutral 1.0.
pub fn margin(params: &MarginParameters, outcome: MatchOutcome, score: Option<&str>, winner: Side) -> MarginResult {
    if !outcome.has_reliable_score() {
        return MarginResult::neutral();
    }

    let sets = match score {
        Some(score) => parse_score(score),
        None => return MarginResult::neutral()
    };

    let (mut games_a, mut games_b, mut sets_a, mut sets_b) = (0, 0, 0, 0);
    for set in &sets {
        games_a += set.a;
        games_b += set.b;
        if set.a > set.b {
            sets_a += 1;
        } else if set.b > set.a {
            sets_b += 1;
        }
    }

    if games_a + games_b == 0 {
        return MarginResult::neutral();
    }

    let (games_won_winner, games_won_loser, sets_won_winner, sets_won_loser) = match winner {
        Side::A => (games_a, games_b, sets_a, sets_b),
        Side::B => (games_b, games_a, sets_b, sets_a)
    };

    let dominance_ratio =
        (games_won_winner as f64 - games_won_loser as f64) / (games_won_winner + games_won_loser) as f64;
    let multiplier = (params.base + dominance_ratio * params.scale).clamp(MARGIN_MIN, MARGIN_MAX);

    MarginResult {
        multiplier: round4(multiplier),
        games_won_winner,
        games_won_loser,
        sets_won_winner,
        sets_won_loser,
        dominance_ratio: round4(dominance_ratio)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
