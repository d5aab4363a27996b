//! Error handling for Hush
//!
//! One taxonomy shared by the audio pipeline, the model backends and the session.

use thiserror::Error;

/// Result type alias for Hush operations
pub type Result<T> = std::result::Result<T, DenoiseError>;

/// Main error type for Hush operations
#[derive(Error, Debug)]
pub enum DenoiseError {
    // Argument Errors
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    // Model Errors
    #[error("Inference failed: {reason}")]
    Inference {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to load model {model}: {reason}")]
    ModelLoad {
        model: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("No model loaded (a previous model change failed)")]
    ModelUnavailable,

    // Session Errors
    #[error("Session is closed")]
    SessionClosed,

    // File Errors
    #[error("Invalid audio file: {reason}")]
    InvalidAudio {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DenoiseError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        DenoiseError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn inference(reason: impl Into<String>) -> Self {
        DenoiseError::Inference {
            reason: reason.into(),
            source: None,
        }
    }

    pub fn model_load(model: impl Into<String>, reason: impl Into<String>) -> Self {
        DenoiseError::ModelLoad {
            model: model.into(),
            reason: reason.into(),
            source: None,
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            DenoiseError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            DenoiseError::Inference { .. } => "INFERENCE_ERROR",
            DenoiseError::ModelLoad { .. } => "MODEL_LOAD_ERROR",
            DenoiseError::ModelUnavailable => "MODEL_UNAVAILABLE",
            DenoiseError::SessionClosed => "SESSION_CLOSED",
            DenoiseError::InvalidAudio { .. } => "INVALID_AUDIO",
            DenoiseError::Config { .. } => "CONFIG_ERROR",
            DenoiseError::Io(_) => "IO_ERROR",
            DenoiseError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Whether the caller can keep using the session after this error.
    ///
    /// Inference failures only cost the current chunk; a closed session or a
    /// session without a model needs action from the caller first.
    pub fn is_recoverable(&self) -> bool {
        match self {
            DenoiseError::InvalidArgument { .. } => true,
            DenoiseError::Inference { .. } => true,
            DenoiseError::ModelLoad { .. } => true,
            DenoiseError::InvalidAudio { .. } => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DenoiseError::invalid_argument("channels must be at least 1");
        assert_eq!(err.error_code(), "INVALID_ARGUMENT");
        assert_eq!(DenoiseError::SessionClosed.error_code(), "SESSION_CLOSED");
    }

    #[test]
    fn test_recoverability() {
        assert!(DenoiseError::inference("tensor shape mismatch").is_recoverable());
        assert!(!DenoiseError::SessionClosed.is_recoverable());
        assert!(!DenoiseError::ModelUnavailable.is_recoverable());
    }

    #[test]
    fn test_model_load_message_names_model() {
        let err = DenoiseError::model_load("silero_denoise_large_fast", "file not found");
        let message = err.to_string();
        assert!(message.contains("silero_denoise_large_fast"));
        assert!(message.contains("file not found"));
    }
}
