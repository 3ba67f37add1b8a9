//! Business logic services.
//!
//! Services validate requests and delegate to a shared
//! [`StorageBackend`]. They never cache records, so every call observes the
//! backend's current state.

mod accounts;
mod admin;
mod password;
mod scores;

pub use accounts::{AccountService, RegisterRequest};
pub use admin::{AdminService, StoreStatus};
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use scores::{MIN_TIME_SECS, ScoreService, SubmitScore};

use crate::Result;
use crate::config::FocusgridConfig;
use crate::storage::{BackendFactory, StorageBackend};
use std::sync::Arc;

/// Services wired to one storage backend.
pub struct ServiceContainer {
    accounts: AccountService,
    scores: ScoreService,
    admin: AdminService,
}

impl ServiceContainer {
    /// Builds the configured backend and the services on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be opened.
    pub fn from_config(config: &FocusgridConfig) -> Result<Self> {
        let storage = BackendFactory::create(&config.storage)?;
        Ok(Self::with_storage(storage, config))
    }

    /// Builds the services on an existing backend.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn StorageBackend>, config: &FocusgridConfig) -> Self {
        let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2PasswordHasher::default());
        Self {
            accounts: AccountService::new(Arc::clone(&storage), hasher),
            scores: ScoreService::new(Arc::clone(&storage), config.game.clone()),
            admin: AdminService::new(storage),
        }
    }

    /// Returns the account service.
    #[must_use]
    pub const fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    /// Returns the score service.
    #[must_use]
    pub const fn scores(&self) -> &ScoreService {
        &self.scores
    }

    /// Returns the admin service.
    #[must_use]
    pub const fn admin(&self) -> &AdminService {
        &self.admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;
    use crate::storage::BackendType;
    use secrecy::SecretString;
    use tempfile::TempDir;

    #[test]
    fn test_container_shares_one_backend() {
        let dir = TempDir::new().unwrap();
        let config = FocusgridConfig::new()
            .with_data_dir(dir.path())
            .with_backend(BackendType::File);
        let services = ServiceContainer::from_config(&config).unwrap();

        let user = services
            .accounts()
            .register(RegisterRequest {
                username: "ada".to_string(),
                password: SecretString::from("secret_1".to_string()),
                confirm_password: SecretString::from("secret_1".to_string()),
                agree_to_terms: true,
            })
            .unwrap()
            .into_inner();
        services
            .scores()
            .submit(SubmitScore {
                user_id: user.id,
                game_type: "number-game".to_string(),
                score: 25,
                time: 11.5,
                difficulty: Some(Difficulty::Medium),
            })
            .unwrap();

        let status = services.admin().status().unwrap();
        assert_eq!(status.backend, "file");
        assert_eq!((status.users, status.scores), (1, 1));
        assert!(dir.path().join("scores.json").exists());
    }
}
