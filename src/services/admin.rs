//! Administrative operations.

use crate::models::{Page, PageRequest, ScoreId, ScoreStats, User, UserId};
use crate::storage::{Committed, StorageBackend};
use crate::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Record counts of the active backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStatus {
    /// Backend name.
    pub backend: &'static str,
    /// Registered users.
    pub users: u64,
    /// Stored scores.
    pub scores: u64,
}

/// Service for user management and statistics.
pub struct AdminService {
    storage: Arc<dyn StorageBackend>,
}

impl AdminService {
    /// Creates a new admin service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Lists users newest first, filtered by a case-insensitive substring.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self), fields(operation = "list_users"))]
    pub fn list_users(&self, page: usize, page_size: usize, search: &str) -> Result<Page<User>> {
        self.storage
            .list_users(PageRequest::new(page, page_size), search.trim())
    }

    /// Deletes a user and the user's scores.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the user does
    /// not exist, or a storage error.
    #[instrument(skip(self), fields(operation = "delete_user", user_id = %id))]
    pub fn delete_user(&self, id: &UserId) -> Result<Committed<()>> {
        let deleted = self.storage.delete_user(id)?;
        tracing::info!("user deleted");
        Ok(deleted)
    }

    /// Aggregates scores per game and difficulty.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self), fields(operation = "score_stats"))]
    pub fn score_stats(&self) -> Result<Vec<ScoreStats>> {
        self.storage.score_stats()
    }

    /// Deletes a single score.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`](crate::Error::NotFound) if the score does
    /// not exist, or a storage error.
    #[instrument(skip(self), fields(operation = "delete_score", score_id = %id))]
    pub fn delete_score(&self, id: &ScoreId) -> Result<Committed<()>> {
        let deleted = self.storage.delete_score(id)?;
        tracing::info!("score deleted");
        Ok(deleted)
    }

    /// Reports the backend and its record counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    #[instrument(skip(self), fields(operation = "status"))]
    pub fn status(&self) -> Result<StoreStatus> {
        Ok(StoreStatus {
            backend: self.storage.backend_name(),
            users: self.storage.count_users()?,
            scores: self.storage.count_scores()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::models::{Difficulty, NewScore};
    use crate::storage::MemoryBackend;

    fn seeded() -> (AdminService, Arc<MemoryBackend>, Vec<UserId>) {
        let storage = Arc::new(MemoryBackend::new());
        let ids = ["alice", "bob", "Alicia"]
            .iter()
            .map(|name| storage.create_user(name, "digest").unwrap().into_inner().id)
            .collect();
        (AdminService::new(storage.clone()), storage, ids)
    }

    #[test]
    fn test_list_users_search_and_paging() {
        let (admin, _, _) = seeded();

        let page = admin.list_users(1, 10, "ALI").unwrap();
        let names: Vec<_> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["Alicia", "alice"]);
        assert_eq!(page.total, 2);

        let page = admin.list_users(2, 2, "").unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].username, "alice");
    }

    #[test]
    fn test_delete_user_cascades_and_updates_status() {
        let (admin, storage, ids) = seeded();
        storage
            .create_score(NewScore::new(
                ids[0].clone(),
                "number-game",
                25,
                9.5,
                Difficulty::Medium,
            ))
            .unwrap();
        assert_eq!(
            admin.status().unwrap(),
            StoreStatus {
                backend: "memory",
                users: 3,
                scores: 1
            }
        );

        assert!(admin.delete_user(&ids[0]).unwrap().is_durable());
        let status = admin.status().unwrap();
        assert_eq!((status.users, status.scores), (2, 0));

        let err = admin.delete_user(&ids[0]).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
    }

    #[test]
    fn test_stats_and_delete_score() {
        let (admin, storage, ids) = seeded();
        let score = storage
            .create_score(NewScore::new(
                ids[1].clone(),
                "number-game",
                25,
                12.0,
                Difficulty::Hard,
            ))
            .unwrap()
            .into_inner();

        let stats = admin.score_stats().unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].difficulty, Difficulty::Hard);
        assert_eq!(stats[0].count, 1);

        admin.delete_score(&score.id).unwrap();
        assert!(admin.score_stats().unwrap().is_empty());
        assert!(matches!(
            admin.delete_score(&score.id).unwrap_err(),
            Error::NotFound { entity: "score", .. }
        ));
    }
}
