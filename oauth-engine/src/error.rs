use std::fmt;
use thiserror::Error;

use crate::secret::HashError;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Record already exists: {0}")]
    Conflict(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Failed to (de)serialize record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// OAuth 2.0 error codes (RFC 6749 Sections 4.1.2.1 and 5.2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidRequest,
    InvalidClient,
    InvalidGrant,
    InvalidScope,
    UnsupportedGrantType,
    UnsupportedResponseType,
    AccessDenied,
    ServerError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "invalid_request",
            ErrorCode::InvalidClient => "invalid_client",
            ErrorCode::InvalidGrant => "invalid_grant",
            ErrorCode::InvalidScope => "invalid_scope",
            ErrorCode::UnsupportedGrantType => "unsupported_grant_type",
            ErrorCode::UnsupportedResponseType => "unsupported_response_type",
            ErrorCode::AccessDenied => "access_denied",
            ErrorCode::ServerError => "server_error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of an authorize or token request.
///
/// Every variant maps onto exactly one [`ErrorCode`]. Disabled flows have their
/// own variants so they can be told apart from unknown grant or response types.
#[derive(Debug, Error)]
pub enum GrantError {
    #[error("{0}")]
    InvalidRequest(String),
    #[error("{0}")]
    InvalidClient(String),
    #[error("{0}")]
    InvalidGrant(String),
    #[error("{0}")]
    InvalidScope(String),
    #[error("unsupported grant type: {0}")]
    UnsupportedGrantType(String),
    #[error("unsupported response type: {0}")]
    UnsupportedResponseType(String),
    #[error("{0} is disabled")]
    GrantTypeDisabled(&'static str),
    #[error("{0} is disabled")]
    ResponseTypeDisabled(&'static str),
    #[error("invalid provision key")]
    InvalidProvisionKey,
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    PasswordHash(#[from] HashError),
}

impl GrantError {
    pub fn code(&self) -> ErrorCode {
        match self {
            GrantError::InvalidRequest(_) => ErrorCode::InvalidRequest,
            GrantError::InvalidClient(_) => ErrorCode::InvalidClient,
            GrantError::InvalidGrant(_) => ErrorCode::InvalidGrant,
            GrantError::InvalidScope(_) => ErrorCode::InvalidScope,
            GrantError::UnsupportedGrantType(_) | GrantError::GrantTypeDisabled(_) => {
                ErrorCode::UnsupportedGrantType
            }
            GrantError::UnsupportedResponseType(_) | GrantError::ResponseTypeDisabled(_) => {
                ErrorCode::UnsupportedResponseType
            }
            GrantError::InvalidProvisionKey => ErrorCode::AccessDenied,
            GrantError::Store(_) | GrantError::PasswordHash(_) => ErrorCode::ServerError,
        }
    }

    /// Description safe to hand back to the caller. Internal failures are not echoed.
    pub fn description(&self) -> String {
        match self {
            GrantError::Store(_) | GrantError::PasswordHash(_) => {
                "internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Failure of bearer-token authentication
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingHeader,
    #[error("invalid authorization header format")]
    MalformedHeader,
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    Expired { refreshable: bool },
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Failure while provisioning clients or registering users
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Invalid seed data: {0}")]
    Seed(#[from] serde_json::Error),
    #[error(transparent)]
    Hash(#[from] HashError),
    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ProvisionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ProvisionError::Conflict(msg),
            other => ProvisionError::Store(other),
        }
    }
}
