//! Orderings and aggregation shared by the in-process backends.
//!
//! The `SQLite` backend expresses the orderings in SQL and reuses the
//! aggregation; both must agree.

use crate::models::{Difficulty, Score, ScoreStats, User};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Leaderboard order: fastest time, then earliest submission, then id.
pub fn leaderboard_order(a: &Score, b: &Score) -> Ordering {
    a.time
        .total_cmp(&b.time)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Per-user history order: newest first, then id.
pub fn newest_score_first(a: &Score, b: &Score) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// User listing order: newest registration first, then id.
pub fn newest_user_first(a: &User, b: &User) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

#[derive(Default)]
struct Accumulator {
    difficulty: Difficulty,
    times: Vec<f64>,
    score_sum: u64,
}

impl Accumulator {
    fn add(&mut self, score: &Score) {
        self.difficulty = score.difficulty;
        self.times.push(score.time);
        self.score_sum += u64::from(score.score);
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(mut self, game_type: String) -> ScoreStats {
        self.times.sort_by(f64::total_cmp);
        let n = self.times.len() as f64;
        ScoreStats {
            game_type,
            difficulty: self.difficulty,
            count: self.times.len() as u64,
            avg_time: compensated_sum(&self.times) / n,
            min_time: self.times.first().copied().unwrap_or_default(),
            max_time: self.times.last().copied().unwrap_or_default(),
            avg_score: self.score_sum as f64 / n,
        }
    }
}

/// Kahan-Babuska-Neumaier sum, stepped the way `SQLite` steps `SUM`/`AVG`
/// over REAL values.
///
/// Given the same values in the same order both produce the same bits.
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut err = 0.0_f64;
    for &value in values {
        let total = sum + value;
        if sum.abs() > value.abs() {
            err += (sum - total) + value;
        } else {
            err += (value - total) + sum;
        }
        sum = total;
    }
    sum + err
}

/// Groups scores by (game type, difficulty) and computes their aggregates.
///
/// Rows come out ordered by game type, then [`Difficulty::rank`]. Times are
/// summed in ascending order, matching the ordered input the `SQLite`
/// aggregate reads.
pub fn aggregate_stats<'a>(scores: impl IntoIterator<Item = &'a Score>) -> Vec<ScoreStats> {
    let mut groups: BTreeMap<(String, u8), Accumulator> = BTreeMap::new();
    for score in scores {
        groups
            .entry((score.game_type.clone(), score.difficulty.rank()))
            .or_default()
            .add(score);
    }

    groups
        .into_iter()
        .map(|((game_type, _), acc)| acc.finish(game_type))
        .collect()
}
