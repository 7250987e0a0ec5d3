use thiserror::Error;

/// Failure of a single upstream call, as seen by a provider adapter
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("{provider} responded with status {status}: {message}")]
    Status {
        provider: &'static str,
        status: u16,
        message: String,
    },
    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },
    #[error("{provider} returned an unreadable response: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },
}

impl FetchError {
    pub fn status(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        FetchError::Status {
            provider,
            status,
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }
}

impl From<octocrab::Error> for FetchError {
    fn from(err: octocrab::Error) -> Self {
        match err {
            octocrab::Error::GitHub { source, .. } => FetchError::Status {
                provider: "github",
                status: source.status_code.as_u16(),
                message: source.message.clone(),
            },
            octocrab::Error::Serde { source, .. } => FetchError::Decode {
                provider: "github",
                message: source.to_string(),
            },
            other => FetchError::Transport {
                provider: "github",
                message: other.to_string(),
            },
        }
    }
}

/// Error returned to the caller of an aggregation request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },
    #[error("permission denied ({status}): {message}")]
    PermissionDenied { status: u16, message: String },
    #[error("not found ({status}): {message}")]
    NotFound { status: u16, message: String },
    #[error("service unavailable ({status}): {message}")]
    ServiceUnavailable { status: u16, message: String },
    #[error("request failed ({status}): {message}")]
    GenericRequestFailed { status: u16, message: String },
    #[error("internal aggregation error: {0}")]
    InternalAggregationError(String),
}

impl AggregationError {
    pub fn internal(message: impl Into<String>) -> Self {
        AggregationError::InternalAggregationError(message.into())
    }

    /// Status to report upstream, 500 for local failures.
    pub fn status(&self) -> u16 {
        match self {
            AggregationError::Unauthorized { status, .. }
            | AggregationError::PermissionDenied { status, .. }
            | AggregationError::NotFound { status, .. }
            | AggregationError::ServiceUnavailable { status, .. }
            | AggregationError::GenericRequestFailed { status, .. } => *status,
            AggregationError::InternalAggregationError(_) => 500,
        }
    }

    /// A page that vanished between the first request and the fan-out is an
    /// infrastructure fault, not a caller error.
    pub fn remap_missing_page(self) -> Self {
        match self {
            AggregationError::NotFound { message, .. } => AggregationError::ServiceUnavailable {
                status: 500,
                message: format!("server error: {message}"),
            },
            other => other,
        }
    }
}

impl From<FetchError> for AggregationError {
    fn from(err: FetchError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            Some(401) => AggregationError::Unauthorized { status: 401, message },
            Some(403) => AggregationError::PermissionDenied { status: 403, message },
            Some(404) => AggregationError::NotFound { status: 404, message },
            Some(status) if status == 429 || (500..600).contains(&status) => {
                AggregationError::ServiceUnavailable { status, message }
            }
            Some(status) => AggregationError::GenericRequestFailed { status, message },
            None => AggregationError::GenericRequestFailed { status: 0, message },
        }
    }
}

impl From<tokio::task::JoinError> for AggregationError {
    fn from(err: tokio::task::JoinError) -> Self {
        AggregationError::internal(format!("worker task did not complete: {err}"))
    }
}
