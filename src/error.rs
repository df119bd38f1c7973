use std::time::Duration;

/// Exit code used when an API call is rejected as unauthorized.
pub const AUTH_ERROR_EXIT_CODE: i32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum MzutilError {
    #[error("No stored value for '{0}'")]
    NotFound(String),

    #[error("Secret store {0} has bad permissions (expected 0700 directory, 0600 files)")]
    PermissionsInvalid(String),

    #[error("Timed out waiting for OAuth callback after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Login cancelled while waiting for OAuth callback")]
    Cancelled,

    #[error("OAuth callback state mismatch")]
    CsrfMismatch,

    #[error("Bad auth configuration: {0}")]
    BadConfig(String),

    #[error("Could not exchange authorization code for token: {0}")]
    AuthExchangeFailed(String),

    #[error("Not authorized: {0}. Run: mzutil login")]
    AuthError(String),

    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Credential vault error: {0}")]
    Vault(String),

    #[error("Callback listener error: {0}")]
    Callback(String),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MzutilError {
    /// Stable identifier for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            MzutilError::NotFound(_) => "not_found",
            MzutilError::PermissionsInvalid(_) => "permissions_invalid",
            MzutilError::Timeout(_) => "timeout",
            MzutilError::Cancelled => "cancelled",
            MzutilError::CsrfMismatch => "csrf_mismatch",
            MzutilError::BadConfig(_) => "bad_config",
            MzutilError::AuthExchangeFailed(_) => "auth_exchange_failed",
            MzutilError::AuthError(_) => "auth_error",
            MzutilError::Api { .. } => "api_error",
            MzutilError::Http(_) => "http_error",
            MzutilError::Serialization(_) => "serialization_error",
            MzutilError::Vault(_) => "vault_error",
            MzutilError::Callback(_) => "callback_error",
            MzutilError::IoError(_) => "io_error",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            MzutilError::AuthError(_) => AUTH_ERROR_EXIT_CODE,
            _ => 1,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, MzutilError::NotFound(_))
    }
}

impl From<reqwest::Error> for MzutilError {
    fn from(e: reqwest::Error) -> Self {
        MzutilError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for MzutilError {
    fn from(e: serde_json::Error) -> Self {
        MzutilError::Serialization(e.to_string())
    }
}
