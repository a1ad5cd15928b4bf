use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Backup not found: {0}")]
    NotFound(String),

    #[error("Read error: {0}")]
    Read(String),

    #[error("IdC credentials missing: {0}")]
    CredentialMissing(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    /// The remote side already rotated the token; the caller must rerun the
    /// whole operation rather than only the API call.
    #[error("Token refreshed but could not be saved: {0}")]
    PersistFailed(String),

    #[error("API call failed: {0}")]
    ApiCallFailed(String),

    #[error("Usage API returned no subscription information")]
    EmptyUsageResponse,

    #[error("Could not close Kiro, please close it manually and retry: {0}")]
    ProcessTerminationFailed(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Short machine-readable tag, stable across message wording changes.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::NotFound(_) => "not_found",
            AppError::Read(_) => "read",
            AppError::CredentialMissing(_) => "credential_missing",
            AppError::RefreshFailed(_) => "refresh_failed",
            AppError::PersistFailed(_) => "persist_failed",
            AppError::ApiCallFailed(_) => "api_call_failed",
            AppError::EmptyUsageResponse => "empty_usage_response",
            AppError::ProcessTerminationFailed(_) => "process_termination_failed",
            AppError::Network(_) => "network",
            AppError::Io(_) => "io",
            AppError::Json(_) => "json",
            AppError::Config(_) => "config",
        }
    }
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persist_failed_is_distinct_from_refresh_failed() {
        let persist = AppError::PersistFailed("disk full".to_string());
        let refresh = AppError::RefreshFailed("invalid_grant".to_string());
        assert_ne!(persist.kind(), refresh.kind());
        assert!(persist.to_string().contains("could not be saved"));
    }

    #[test]
    fn serializes_as_display_string() {
        let err = AppError::NotFound("ghost".to_string());
        let value = serde_json::to_value(&err).expect("serialize error");
        assert_eq!(value.as_str(), Some("Backup not found: ghost"));
    }
}
