//! Row conversion between `SQLite` and the record types.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch, so
//! ordering by the column equals ordering by `created_at`.

use crate::models::{Difficulty, LeaderboardEntry, Score, ScoreId, User, UserId};
use chrono::{DateTime, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

fn conversion_error(index: usize, ty: Type, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(index, ty, message.into())
}

fn timestamp(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let micros: i64 = row.get(index)?;
    DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        conversion_error(index, Type::Integer, format!("timestamp out of range: {micros}"))
    })
}

fn difficulty(row: &Row<'_>, index: usize) -> rusqlite::Result<Difficulty> {
    let raw: String = row.get(index)?;
    Difficulty::parse(&raw)
        .ok_or_else(|| conversion_error(index, Type::Text, format!("unknown difficulty: {raw}")))
}

fn points(row: &Row<'_>, index: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(index)?;
    u32::try_from(raw)
        .map_err(|_| conversion_error(index, Type::Integer, format!("score out of range: {raw}")))
}

/// Converts a timestamp into its column value.
pub fn to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// Decodes `id, username, password_hash, created_at`.
pub fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId::new(row.get::<_, String>(0)?),
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: timestamp(row, 3)?,
    })
}

/// Decodes `id, user_id, game_type, score, time, difficulty, created_at`.
pub fn score_from_row(row: &Row<'_>) -> rusqlite::Result<Score> {
    Ok(Score {
        id: ScoreId::new(row.get::<_, String>(0)?),
        user_id: UserId::new(row.get::<_, String>(1)?),
        game_type: row.get(2)?,
        score: points(row, 3)?,
        time: row.get(4)?,
        difficulty: difficulty(row, 5)?,
        created_at: timestamp(row, 6)?,
    })
}

/// Decodes a score row followed by `username`.
pub fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<LeaderboardEntry> {
    Ok(LeaderboardEntry {
        score: score_from_row(row)?,
        username: row.get(7)?,
    })
}
