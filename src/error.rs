use thiserror::Error;

/// Problems caught locally, before any request leaves the client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,

    #[error("Title must be {max} characters or less")]
    TitleTooLong { max: usize },

    #[error("Description must be {max} characters or less")]
    DescriptionTooLong { max: usize },
}

/// Why a request never produced an HTTP response.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend rejected the session. The sign-in redirect has already fired.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{message}")]
    RequestFailed { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] TransportError),

    #[error("Malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Session storage error: {0}")]
    Session(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized => Some(401),
            ApiError::RequestFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the user can sensibly retry the same action by hand.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_) | ApiError::RequestFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_failed_displays_backend_message() {
        let err = ApiError::RequestFailed {
            status: 404,
            message: "Task not found".to_string(),
        };
        assert_eq!(err.to_string(), "Task not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn validation_messages_match_form_copy() {
        assert_eq!(ValidationError::TitleRequired.to_string(), "Title is required");
        assert_eq!(
            ValidationError::TitleTooLong { max: 200 }.to_string(),
            "Title must be 200 characters or less"
        );
        let err: ApiError = ValidationError::DescriptionTooLong { max: 1000 }.into();
        assert_eq!(err.to_string(), "Description must be 1000 characters or less");
        assert!(!err.is_retryable());
    }

    #[test]
    fn network_error_keeps_transport_cause() {
        let err: ApiError = TransportError::Other("connection reset".into()).into();
        assert_eq!(err.to_string(), "Network error: connection reset");
        assert!(err.is_retryable());
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection reset"));
    }
}
