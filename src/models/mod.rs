//! Data models for focusgrid.
//!
//! This module contains the records owned by storage backends and the value
//! types exchanged with them.

mod ids;
mod page;
mod score;
mod user;

pub use ids::{ScoreId, UserId, new_identifier};
pub use page::{MAX_PAGE_SIZE, Page, PageRequest};
pub use score::{Difficulty, LeaderboardEntry, NewScore, Score, ScoreStats};
pub use user::User;
