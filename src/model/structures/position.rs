use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a match sits in the processing order.
///
/// `temporal_order` is the primary key; the match id breaks ties so that the
/// ordering is total and stable across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub temporal_order: i64,
    pub match_id: i32
}

impl Position {
    pub fn new(temporal_order: i64, match_id: i32) -> Position {
        Position {
            temporal_order,
            match_id
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.temporal_order, self.match_id)
    }
}
