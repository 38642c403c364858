use thiserror::Error;

/// Which half of the platform binding was absent when an operation needed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    Context,
    Activity,
}

impl Missing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Activity => "activity",
        }
    }
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("context/activity not available ({missing} missing)")]
    Unbound { missing: Missing },

    #[error("review API unavailable")]
    ProviderUnavailable,

    #[error("provider reported {code}: {message}")]
    Provider { code: String, message: String },

    #[error("a request for code {request_code} is already awaiting its result")]
    AlreadyPending { request_code: i32 },

    #[error("cancelled")]
    Cancelled,

    #[error("timeout after {0}ms")]
    Timeout(u64),

    #[error("{0}")]
    Other(String),
}

impl ReviewError {
    /// Wire-level error code. Provider failures carry their numeric result code,
    /// everything else reports the generic "error".
    pub fn code(&self) -> &str {
        match self {
            Self::Provider { code, .. } => code,
            _ => "error",
        }
    }

    /// Message safe to hand back to the calling application.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unbound { missing } => {
                format!("context/activity not available: {missing} not attached")
            }
            Self::ProviderUnavailable => "review API unavailable".to_string(),
            Self::Provider { message, .. } => message.clone(),
            Self::AlreadyPending { .. } => {
                "a review request is already in progress".to_string()
            }
            Self::Cancelled => "review request cancelled".to_string(),
            Self::Timeout(ms) => format!("no review result after {ms}ms"),
            Self::Other(msg) => msg.clone(),
        }
    }
}

/// Failure reported by a boundary collaborator (provider, launcher, navigator).
///
/// Never surfaced to callers as-is: the coordinator converts it into one of the
/// `ReviewError` categories, or into a plain `false`, at the completion point.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}
