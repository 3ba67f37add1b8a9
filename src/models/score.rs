//! Game scores, difficulties and leaderboard projections.

use super::{ScoreId, UserId};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Difficulty level of a game round.
///
/// - `Easy`: clicked numbers stay marked, the search area shrinks
/// - `Medium`: clicked numbers are not marked
/// - `Hard`: the grid is reshuffled after every click
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Marked numbers.
    #[default]
    Easy,
    /// Unmarked numbers.
    Medium,
    /// Reshuffled grid.
    Hard,
}

impl Difficulty {
    /// Returns all difficulties in rank order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Easy, Self::Medium, Self::Hard]
    }

    /// Returns the storage tag for this difficulty.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    /// Returns the sort rank (easy < medium < hard).
    #[must_use]
    pub const fn rank(&self) -> u8 {
        match self {
            Self::Easy => 0,
            Self::Medium => 1,
            Self::Hard => 2,
        }
    }

    /// Parses a difficulty tag, ignoring case.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let tag = s.trim();
        Self::all()
            .iter()
            .copied()
            .find(|d| d.as_str().eq_ignore_ascii_case(tag))
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| {
            let tags: Vec<&str> = Self::all().iter().map(Self::as_str).collect();
            Error::InvalidInput(format!(
                "difficulty must be one of {} (got '{s}')",
                tags.join(", ")
            ))
        })
    }
}

/// A stored game result. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Unique identifier.
    pub id: ScoreId,
    /// Owner of the score.
    pub user_id: UserId,
    /// Game tag, e.g. `number-game`.
    pub game_type: String,
    /// Points earned.
    pub score: u32,
    /// Completion time in seconds (lower is better).
    pub time: f64,
    /// Difficulty the round was played at.
    pub difficulty: Difficulty,
    /// Submission timestamp (UTC, microsecond precision).
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the caller when recording a score.
#[derive(Debug, Clone, PartialEq)]
pub struct NewScore {
    /// Owner of the score.
    pub user_id: UserId,
    /// Game tag.
    pub game_type: String,
    /// Points earned.
    pub score: u32,
    /// Completion time in seconds.
    pub time: f64,
    /// Difficulty the round was played at.
    pub difficulty: Difficulty,
}

impl NewScore {
    /// Creates a new score request.
    #[must_use]
    pub fn new(
        user_id: UserId,
        game_type: impl Into<String>,
        score: u32,
        time: f64,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            user_id,
            game_type: game_type.into(),
            score,
            time,
            difficulty,
        }
    }

    /// Rejects times that cannot be ranked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] unless `time` is finite and positive.
    pub fn check_time(&self) -> Result<()> {
        if self.time.is_finite() && self.time > 0.0 {
            Ok(())
        } else {
            Err(Error::InvalidInput(format!(
                "time must be a positive number of seconds, got {}",
                self.time
            )))
        }
    }

    /// Turns the request into a stored record.
    #[must_use]
    pub fn into_score(self, id: ScoreId, created_at: DateTime<Utc>) -> Score {
        Score {
            id,
            user_id: self.user_id,
            game_type: self.game_type,
            score: self.score,
            time: self.time,
            difficulty: self.difficulty,
            created_at,
        }
    }
}

/// A leaderboard row: a score joined with its owner's username.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// The ranked score.
    #[serde(flatten)]
    pub score: Score,
    /// Username of the score's owner.
    pub username: String,
}

/// Aggregates for one (game type, difficulty) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreStats {
    /// Game tag.
    pub game_type: String,
    /// Difficulty.
    pub difficulty: Difficulty,
    /// Number of scores in the group (always at least one).
    pub count: u64,
    /// Mean completion time.
    pub avg_time: f64,
    /// Best completion time.
    pub min_time: f64,
    /// Worst completion time.
    pub max_time: f64,
    /// Mean points.
    pub avg_score: f64,
}
