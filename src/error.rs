//! Error types for MedChat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for MedChat operations
///
/// Covers configuration loading, attachment ingestion, provider exchanges,
/// and transcript bookkeeping. Errors raised while a turn is in flight never
/// escape the turn: the stream consumer turns them into the placeholder's
/// terminal text.
#[derive(Error, Debug)]
pub enum MedchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-side failures (rejected request, malformed response, blocked prompt)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Transport failures while talking to the provider
    #[error("Network error: {0}")]
    Network(String),

    /// Attachment ingestion failed
    #[error("File read error: {0}")]
    FileRead(String),

    /// No credential configured for the provider
    #[error("Missing credentials for provider: {0}")]
    MissingCredentials(String),

    /// Provider rejected the credential (401/403)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// A message with this id already exists in the transcript
    #[error("Duplicate message id: {0}")]
    DuplicateMessageId(String),

    /// Messages must carry a non-empty id
    #[error("Message id cannot be empty")]
    EmptyMessageId,

    /// A turn is already in flight
    #[error("A response is already being generated; wait for it to finish")]
    Busy,

    /// Nothing to send: blank prompt and no attachment
    #[error("Nothing to send: prompt is empty and no file is attached")]
    EmptyPrompt,
}

/// Coarse classification used when reporting a failed turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential, request, or response problem on the provider side
    Provider,
    /// Transport failure
    Network,
    /// Anything else (configuration, attachments, transcript bookkeeping)
    Other,
}

impl MedchatError {
    /// Classify this error into one of the failure families a turn can end with
    ///
    /// # Examples
    ///
    /// ```
    /// use medchat::error::{ErrorKind, MedchatError};
    ///
    /// let err = MedchatError::MissingCredentials("gemini".to_string());
    /// assert_eq!(err.kind(), ErrorKind::Provider);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Provider(_) | Self::MissingCredentials(_) | Self::Authentication(_) => {
                ErrorKind::Provider
            }
            Self::Network(_) => ErrorKind::Network,
            _ => ErrorKind::Other,
        }
    }
}

/// Classify an `anyhow::Error`, looking through to a `MedchatError` if one is inside
pub fn classify(error: &anyhow::Error) -> ErrorKind {
    error
        .downcast_ref::<MedchatError>()
        .map_or(ErrorKind::Other, MedchatError::kind)
}

/// Result type alias for MedChat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = MedchatError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_provider_error_display() {
        let error = MedchatError::Provider("quota exhausted".to_string());
        assert_eq!(error.to_string(), "Provider error: quota exhausted");
    }

    #[test]
    fn test_network_error_display() {
        let error = MedchatError::Network("connection refused".to_string());
        assert_eq!(error.to_string(), "Network error: connection refused");
    }

    #[test]
    fn test_file_read_error_display() {
        let error = MedchatError::FileRead("scan.png: permission denied".to_string());
        assert_eq!(
            error.to_string(),
            "File read error: scan.png: permission denied"
        );
    }

    #[test]
    fn test_missing_credentials_error_display() {
        let error = MedchatError::MissingCredentials("gemini".to_string());
        assert_eq!(error.to_string(), "Missing credentials for provider: gemini");
    }

    #[test]
    fn test_duplicate_message_id_display() {
        let error = MedchatError::DuplicateMessageId("user-1".to_string());
        assert_eq!(error.to_string(), "Duplicate message id: user-1");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(MedchatError::FileRead("x".into()).kind(), ErrorKind::Other);
        assert_eq!(
            MedchatError::Authentication("x".into()).kind(),
            ErrorKind::Provider
        );
        assert_eq!(MedchatError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(MedchatError::Busy.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_classify_through_anyhow() {
        let err: anyhow::Error = MedchatError::Network("reset".into()).into();
        assert_eq!(classify(&err), ErrorKind::Network);

        let err = anyhow::anyhow!("something else");
        assert_eq!(classify(&err), ErrorKind::Other);
    }

    #[test]
    fn test_classify_unmapped_library_error_is_other() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err = anyhow::Error::from(io_error);
        assert!(err.downcast_ref::<MedchatError>().is_none());
        assert_eq!(classify(&err), ErrorKind::Other);
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MedchatError>();
    }
}
