//! Account registration and login.

use super::PasswordHasher;
use crate::models::{User, UserId};
use crate::storage::{Committed, StorageBackend};
use crate::{Error, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

static USERNAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{3,20}$").expect("static regex: username pattern")
});

static PASSWORD_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_]{6,20}$").expect("static regex: password pattern")
});

/// A registration form.
#[derive(Debug)]
pub struct RegisterRequest {
    /// Desired login name.
    pub username: String,
    /// Plaintext password.
    pub password: SecretString,
    /// Must repeat `password`.
    pub confirm_password: SecretString,
    /// The player accepted the privacy terms.
    pub agree_to_terms: bool,
}

impl RegisterRequest {
    fn validate(&self) -> Result<()> {
        if self.username.is_empty() {
            return Err(invalid("username is required"));
        }
        if !USERNAME_PATTERN.is_match(&self.username) {
            return Err(invalid(
                "username must be 3-20 characters of letters, digits or underscores",
            ));
        }

        let password = self.password.expose_secret();
        if password.is_empty() {
            return Err(invalid("password is required"));
        }
        if !PASSWORD_PATTERN.is_match(password) {
            return Err(invalid(
                "password must be 6-20 characters of letters, digits or underscores",
            ));
        }

        let confirm = self.confirm_password.expose_secret();
        if confirm.is_empty() {
            return Err(invalid("confirm_password is required"));
        }
        if confirm != password {
            return Err(invalid("confirm_password does not match password"));
        }

        if !self.agree_to_terms {
            return Err(invalid("agree_to_terms must be accepted"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidInput(message.to_string())
}

/// Service for player accounts.
pub struct AccountService {
    storage: Arc<dyn StorageBackend>,
    hasher: Arc<dyn PasswordHasher>,
}

impl AccountService {
    /// Creates a new account service.
    #[must_use]
    pub fn new(storage: Arc<dyn StorageBackend>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { storage, hasher }
    }

    /// Registers a new player.
    ///
    /// Uniqueness is decided by the backend, so two concurrent registrations
    /// of one name cannot both succeed.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - A field fails validation ([`Error::InvalidInput`])
    /// - The username is taken ([`Error::DuplicateUsername`])
    /// - Storage fails
    #[instrument(skip(self, request), fields(operation = "register", username = %request.username))]
    pub fn register(&self, request: RegisterRequest) -> Result<Committed<User>> {
        request.validate()?;
        let digest = self.hasher.hash(&request.password)?;
        let created = self.storage.create_user(&request.username, &digest)?;
        tracing::info!(user_id = %created.value.id, "user registered");
        Ok(created)
    }

    /// Checks a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCredentials`] for an unknown user or a wrong
    /// password, or a storage error.
    #[instrument(skip(self, password), fields(operation = "login"))]
    pub fn login(&self, username: &str, password: &SecretString) -> Result<User> {
        if username.is_empty() || password.expose_secret().is_empty() {
            return Err(Error::InvalidCredentials);
        }

        let Some(user) = self.storage.find_user_by_username(username)? else {
            tracing::debug!("login for unknown user");
            return Err(Error::InvalidCredentials);
        };
        if !self.hasher.verify(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "login with wrong password");
            return Err(Error::InvalidCredentials);
        }
        Ok(user)
    }

    /// Loads a user by ID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the user no longer exists.
    #[instrument(skip(self), fields(operation = "profile", user_id = %user_id))]
    pub fn profile(&self, user_id: &UserId) -> Result<User> {
        self.storage
            .find_user_by_id(user_id)?
            .ok_or_else(|| Error::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::Argon2PasswordHasher;
    use crate::storage::MemoryBackend;
    use test_case::test_case;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn service() -> AccountService {
        AccountService::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(Argon2PasswordHasher::with_cost(1024, 1, 1).unwrap()),
        )
    }

    fn request(username: &str, password: &str, confirm: &str, terms: bool) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            password: secret(password),
            confirm_password: secret(confirm),
            agree_to_terms: terms,
        }
    }

    #[test]
    fn test_register_then_login() {
        let accounts = service();
        let user = accounts
            .register(request("ada_l", "secret_1", "secret_1", true))
            .unwrap()
            .into_inner();
        assert_eq!(user.username, "ada_l");
        assert!(user.password_hash.starts_with("$argon2id$"));

        let logged_in = accounts.login("ada_l", &secret("secret_1")).unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(accounts.profile(&user.id).unwrap(), logged_in);
    }

    #[test_case("ab", "secret_1", "secret_1", true, "username" ; "username too short")]
    #[test_case("", "secret_1", "secret_1", true, "username" ; "username empty")]
    #[test_case("has space", "secret_1", "secret_1", true, "username" ; "username bad chars")]
    #[test_case("a_very_long_username_x", "secret_1", "secret_1", true, "username" ; "username too long")]
    #[test_case("ada_l", "short", "short", true, "password" ; "password too short")]
    #[test_case("ada_l", "pass-word", "pass-word", true, "password" ; "password bad chars")]
    #[test_case("ada_l", "secret_1", "secret_2", true, "confirm_password" ; "mismatch")]
    #[test_case("ada_l", "secret_1", "", true, "confirm_password" ; "confirm empty")]
    #[test_case("ada_l", "secret_1", "secret_1", false, "agree_to_terms" ; "terms refused")]
    fn test_register_validation(
        username: &str,
        password: &str,
        confirm: &str,
        terms: bool,
        field: &str,
    ) {
        let accounts = service();
        let err = accounts
            .register(request(username, password, confirm, terms))
            .unwrap_err();
        match err {
            Error::InvalidInput(message) => assert!(message.starts_with(field), "{message}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_register_duplicate() {
        let accounts = service();
        accounts
            .register(request("ada_l", "secret_1", "secret_1", true))
            .unwrap();
        let err = accounts
            .register(request("ada_l", "other_pw", "other_pw", true))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUsername(name) if name == "ada_l"));
    }

    #[test]
    fn test_login_does_not_enumerate_users() {
        let accounts = service();
        accounts
            .register(request("ada_l", "secret_1", "secret_1", true))
            .unwrap();

        let unknown = accounts.login("nobody", &secret("secret_1")).unwrap_err();
        let wrong = accounts.login("ada_l", &secret("secret_2")).unwrap_err();
        assert!(matches!(unknown, Error::InvalidCredentials));
        assert!(matches!(wrong, Error::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[test]
    fn test_login_is_case_sensitive() {
        let accounts = service();
        accounts
            .register(request("Ada_L", "secret_1", "secret_1", true))
            .unwrap();
        assert!(accounts.login("ada_l", &secret("secret_1")).is_err());
    }

    #[test]
    fn test_profile_of_missing_user() {
        let err = service().profile(&UserId::new("ghost")).unwrap_err();
        assert!(matches!(err, Error::NotFound { entity: "user", .. }));
    }
}
