//! Registration and login.
//!
//! The HTTP layer resolves a bearer token to a caller user id through
//! [`TokenService`] before any domain operation runs; the domain service
//! itself never sees credentials.

pub mod password;
pub mod token;

pub use token::TokenService;

use crate::db::users::NewUser;
use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{Role, User};
use tracing::info;

/// Authentication service: account creation and credential checks.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(db: Database, tokens: TokenService) -> Self {
        Self { db, tokens }
    }

    /// Register a new user. Fails `BadRequest` when the login is taken.
    pub fn register(&self, login: &str, password: &str, role: Role) -> ApiResult<User> {
        if login.trim().is_empty() {
            return Err(ApiError::missing_field("login"));
        }
        if password.is_empty() {
            return Err(ApiError::missing_field("password"));
        }

        if self.db.find_user_by_login(login)?.is_some() {
            return Err(ApiError::login_taken(login));
        }

        let user = self.db.insert_user(&NewUser {
            login: login.to_string(),
            password_hash: password::hash_password(password)?,
            role,
        })?;

        info!(user_id = user.id, login, "registered user");
        Ok(user)
    }

    /// Check credentials and issue a bearer token.
    ///
    /// Unknown login and wrong password produce the same error; which one
    /// failed is not leaked.
    pub fn login(&self, login: &str, password: &str) -> ApiResult<String> {
        let user = self
            .db
            .find_user_by_login(login)?
            .ok_or_else(ApiError::invalid_credentials)?;

        if !password::verify_password(password, &user.password_hash) {
            return Err(ApiError::invalid_credentials());
        }

        self.tokens.issue(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn setup() -> AuthService {
        let db = Database::open_in_memory().unwrap();
        AuthService::new(db, TokenService::new("test-secret", 2))
    }

    #[test]
    fn test_register_then_login() {
        let auth = setup();
        let user = auth.register("ana", "hunter2", Role::User).unwrap();
        assert_eq!(user.login, "ana");
        assert_ne!(user.password_hash, "hunter2");

        let token = auth.login("ana", "hunter2").unwrap();
        assert!(!token.is_empty());
    }

    #[test]
    fn test_duplicate_login_is_rejected() {
        let auth = setup();
        auth.register("ana", "hunter2", Role::User).unwrap();
        let err = auth.register("ana", "other", Role::Admin).unwrap_err();
        assert_eq!(err.code, ErrorCode::LoginTaken);
    }

    #[test]
    fn test_blank_fields_are_rejected() {
        let auth = setup();
        assert_eq!(
            auth.register("  ", "pw", Role::User).unwrap_err().code,
            ErrorCode::MissingRequiredField
        );
        assert_eq!(
            auth.register("ana", "", Role::User).unwrap_err().code,
            ErrorCode::MissingRequiredField
        );
    }

    #[test]
    fn test_bad_credentials_are_uniform() {
        let auth = setup();
        auth.register("ana", "hunter2", Role::User).unwrap();

        let unknown = auth.login("nobody", "hunter2").unwrap_err();
        let wrong_pw = auth.login("ana", "wrong").unwrap_err();
        assert_eq!(unknown.code, ErrorCode::InvalidCredentials);
        assert_eq!(wrong_pw.code, ErrorCode::InvalidCredentials);
        assert_eq!(unknown.message, wrong_pw.message);
    }
}
