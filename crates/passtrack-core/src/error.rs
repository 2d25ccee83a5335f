use thiserror::Error;

/// Top-level error type for passtrack.
#[derive(Debug, Error)]
pub enum PasstrackError {
    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Rejected input (bad UID format, per-user limits). Never reaches
    /// the network.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced order or user does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Storage error.
    #[error("store error: {0}")]
    Store(String),

    /// Error talking to the upstream status API.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome taxonomy for a single upstream status lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The upstream has no record for this UID (empty/null body).
    #[error("order not found upstream")]
    NotFound,

    /// The request exceeded the per-request deadline. Treated as a
    /// systemic signal by the autoupdate run, not a per-order error.
    #[error("upstream request timed out")]
    Timeout,

    /// Any other transport or HTTP failure.
    #[error("upstream request failed: {0}")]
    Request(String),
}

/// Kind tag for a failed engine update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateErrorKind {
    Timeout,
    NotFound,
    Request,
    Storage,
}

impl UpdateErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Request => "request",
            Self::Storage => "storage",
        }
    }
}

/// A failed update of one order, attributed to the endpoint that served
/// the lookup. The single failure channel of the update engine: expected
/// conditions travel here, never as panics.
#[derive(Debug, Clone, Error)]
#[error("update via {endpoint} failed ({}): {message}", .kind.as_str())]
pub struct UpdateFailure {
    pub kind: UpdateErrorKind,
    pub endpoint: String,
    pub message: String,
}

impl UpdateFailure {
    pub fn from_fetch(err: FetchError, endpoint: String) -> Self {
        let kind = match err {
            FetchError::NotFound => UpdateErrorKind::NotFound,
            FetchError::Timeout => UpdateErrorKind::Timeout,
            FetchError::Request(_) => UpdateErrorKind::Request,
        };
        Self {
            kind,
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn storage(err: PasstrackError, endpoint: String) -> Self {
        Self {
            kind: UpdateErrorKind::Storage,
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.kind == UpdateErrorKind::Timeout
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == UpdateErrorKind::NotFound
    }
}
