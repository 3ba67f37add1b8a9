//! Score submission and leaderboards.

use crate::config::GameConfig;
use crate::models::{Difficulty, LeaderboardEntry, NewScore, Score, UserId};
use crate::storage::{Committed, StorageBackend};
use crate::{Error, Result};
use std::sync::Arc;
use tracing::instrument;

/// Shortest completion time accepted, in seconds.
pub const MIN_TIME_SECS: f64 = 0.001;

/// A score as submitted by a client.
///
/// Fields are wider than the stored record so out-of-range values can be
/// reported instead of silently truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitScore {
    /// Owner of the score.
    pub user_id: UserId,
    /// Game tag; must be configured.
    pub game_type: String,
    /// Points earned.
    pub score: i64,
    /// Completion time in seconds.
    pub time: f64,
    /// Difficulty, `easy` when absent.
    pub difficulty: Option<Difficulty>,
}

impl SubmitScore {
    fn into_new_score(self, game: &GameConfig) -> Result<NewScore> {
        check_game(game, &self.game_type)?;

        let score = u32::try_from(self.score).map_err(|_| {
            Error::InvalidInput(format!(
                "score must be between 0 and {}, got {}",
                u32::MAX,
                self.score
            ))
        })?;

        if !self.time.is_finite() || self.time < MIN_TIME_SECS {
            return Err(Error::InvalidInput(format!(
                "time must be at least {MIN_TIME_SECS} seconds, got {}",
                self.time
            )));
        }

        Ok(NewScore::new(
            self.user_id,
            self.game_type,
            score,
            self.time,
            self.difficulty.unwrap_or_default(),
        ))
    }
}

fn check_game(game: &GameConfig, game_type: &str) -> Result<()> {
    if game.accepts(game_type) {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "game_type '{game_type}' is not one of: {}",
            game.game_types.join(", ")
        )))
    }
}

/// Service for recording and ranking scores.
pub struct ScoreService {
    storage: Arc<dyn StorageBackend>,
    game: GameConfig,
}

impl ScoreService {
    /// Creates a new score service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, game: GameConfig) -> Self {
        Self { storage, game }
    }

    /// Validates and records a score.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The game type is not configured, or the score or time is out of
    ///   range ([`Error::InvalidInput`])
    /// - The user does not exist ([`Error::InvalidReference`])
    /// - Storage fails
    #[instrument(
        skip(self, submission),
        fields(
            operation = "submit_score",
            user_id = %submission.user_id,
            game_type = %submission.game_type
        )
    )]
    pub fn submit(&self, submission: SubmitScore) -> Result<Committed<Score>> {
        let new_score = submission.into_new_score(&self.game)?;
        let created = self.storage.create_score(new_score)?;
        tracing::debug!(score_id = %created.value.id, time = created.value.time, "score recorded");
        Ok(created)
    }

    /// Returns the best scores for a game and difficulty.
    ///
    /// `limit` defaults to the configured default and is clamped to
    /// `1..=max_limit`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown game type, or a storage
    /// error.
    #[instrument(skip(self), fields(operation = "leaderboard"))]
    pub fn leaderboard(
        &self,
        game_type: &str,
        difficulty: Difficulty,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>> {
        check_game(&self.game, game_type)?;
        self.storage
            .leaderboard(game_type, difficulty, self.effective_limit(limit))
    }

    /// Returns a user's scores for a game and difficulty, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an unknown game type, or a storage
    /// error.
    #[instrument(skip(self), fields(operation = "user_scores", user_id = %user_id))]
    pub fn user_scores(
        &self,
        user_id: &UserId,
        game_type: &str,
        difficulty: Difficulty,
    ) -> Result<Vec<Score>> {
        check_game(&self.game, game_type)?;
        self.storage.user_scores(user_id, game_type, difficulty)
    }

    /// Resolves a requested leaderboard size.
    #[must_use]
    pub fn effective_limit(&self, limit: Option<usize>) -> usize {
        let max = self.game.max_limit.max(1);
        limit.unwrap_or(self.game.default_limit).clamp(1, max)
    }
}
