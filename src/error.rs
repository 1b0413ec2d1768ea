//! Structured error types shared by the domain service and the HTTP layer.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
///
/// The HTTP layer derives the response status from the code; the core
/// never encodes transport concerns itself.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    SubtaskNesting,
    IncompleteSubtasks,

    // Not found
    TaskNotFound,
    UserNotFound,

    // Ownership / auth
    NotOwner,
    InvalidCredentials,
    LoginTaken,

    // Internal
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Terminal error kind per the domain contract.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredField
            | ErrorCode::InvalidFieldValue
            | ErrorCode::SubtaskNesting
            | ErrorCode::IncompleteSubtasks
            | ErrorCode::LoginTaken => ErrorKind::BadRequest,
            ErrorCode::TaskNotFound | ErrorCode::UserNotFound => ErrorKind::NotFound,
            ErrorCode::NotOwner => ErrorKind::Forbidden,
            ErrorCode::InvalidCredentials => ErrorKind::Unauthorized,
            ErrorCode::DatabaseError | ErrorCode::InternalError => ErrorKind::Internal,
        }
    }
}

/// Coarse error classification matching the boundary contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    NotFound,
    Forbidden,
    Unauthorized,
    Internal,
}

/// Structured error surfaced verbatim to the caller.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn user_not_found() -> Self {
        Self::new(ErrorCode::UserNotFound, "User not found")
    }

    pub fn not_owner(task_id: i64) -> Self {
        Self::new(
            ErrorCode::NotOwner,
            format!("Task {} does not belong to the authenticated user", task_id),
        )
    }

    pub fn subtask_nesting(parent_id: i64) -> Self {
        Self::new(
            ErrorCode::SubtaskNesting,
            format!(
                "Task {} is itself a subtask; subtasks cannot be nested",
                parent_id
            ),
        )
    }

    pub fn incomplete_subtasks(task_id: i64) -> Self {
        Self::new(
            ErrorCode::IncompleteSubtasks,
            format!(
                "Task {} still has incomplete subtasks; finish them before marking it DONE",
                task_id
            ),
        )
    }

    pub fn invalid_credentials() -> Self {
        Self::new(ErrorCode::InvalidCredentials, "Invalid login or password")
    }

    pub fn login_taken(login: &str) -> Self {
        Self::new(
            ErrorCode::LoginTaken,
            format!("A user already exists with login: {}", login),
        )
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

// Allow using ? on anyhow errors from the db layer.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ApiError>() {
            Ok(api_err) => api_err,
            Err(err) => ApiError::database(err),
        }
    }
}

/// Result type for service operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_kinds() {
        assert_eq!(ErrorCode::TaskNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::NotOwner.kind(), ErrorKind::Forbidden);
        assert_eq!(ErrorCode::IncompleteSubtasks.kind(), ErrorKind::BadRequest);
        assert_eq!(ErrorCode::LoginTaken.kind(), ErrorKind::BadRequest);
        assert_eq!(
            ErrorCode::InvalidCredentials.kind(),
            ErrorKind::Unauthorized
        );
    }

    #[test]
    fn test_serialization_shape() {
        let err = ApiError::invalid_value("title", "title must not be blank");
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "INVALID_FIELD_VALUE");
        assert_eq!(json["field"], "title");
    }

    #[test]
    fn test_anyhow_downcast_preserves_code() {
        let err: anyhow::Error = ApiError::task_not_found(7).into();
        let back: ApiError = err.into();
        assert_eq!(back.code, ErrorCode::TaskNotFound);
    }
}
