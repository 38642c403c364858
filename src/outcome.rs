//! Translation of alternate-provider activity results into typed outcomes.
//!
//! The alternate storefront reports back with nothing but an integer result code.
//! The code is decoded into `AlternateResult` the moment it arrives so that the
//! rest of the crate never branches on raw integers.

use crate::error::ReviewError;

/// Correlation code the alternate review flow is launched with.
pub const ALTERNATE_REVIEW_REQUEST_CODE: i32 = 1001;

/// Intent action understood by the alternate storefront.
pub const ALTERNATE_REVIEW_ACTION: &str = "com.huawei.appmarket.intent.action.guidecomment";

/// Package hosting the alternate review UI.
pub const ALTERNATE_REVIEW_PACKAGE: &str = "com.huawei.appmarket";

/// Decoded result of the alternate review flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlternateResult {
    /// The flow ran to completion (-1 = OK, 102 = rated, 103 = commented).
    Completed(i32),
    InternalError,
    NotReleased,
    SignInInvalid,
    ConditionsNotMet,
    CommentingDisabled,
    ServiceUnsupported,
    UserCanceled,
    Unexpected(i32),
}

impl AlternateResult {
    pub fn from_code(code: i32) -> Self {
        match code {
            -1 | 102 | 103 => Self::Completed(code),
            0 => Self::InternalError,
            101 => Self::NotReleased,
            104 => Self::SignInInvalid,
            105 => Self::ConditionsNotMet,
            106 => Self::CommentingDisabled,
            107 => Self::ServiceUnsupported,
            108 => Self::UserCanceled,
            other => Self::Unexpected(other),
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Completed(code) | Self::Unexpected(code) => *code,
            Self::InternalError => 0,
            Self::NotReleased => 101,
            Self::SignInInvalid => 104,
            Self::ConditionsNotMet => 105,
            Self::CommentingDisabled => 106,
            Self::ServiceUnsupported => 107,
            Self::UserCanceled => 108,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Human-readable failure text. `None` for successful completions.
    pub fn failure_message(&self) -> Option<String> {
        let msg = match self {
            Self::Completed(_) => return None,
            Self::InternalError => "Internal Error",
            Self::NotReleased => "app not released on the storefront",
            Self::SignInInvalid => "sign-in status invalid",
            Self::ConditionsNotMet => "user does not meet display conditions",
            Self::CommentingDisabled => "commenting disabled",
            Self::ServiceUnsupported => "service not supported",
            Self::UserCanceled => "user canceled",
            Self::Unexpected(code) => return Some(format!("unexpected result code: {code}")),
        };
        Some(msg.to_string())
    }

    pub fn into_outcome(self) -> Result<bool, ReviewError> {
        match self.failure_message() {
            None => Ok(true),
            Some(message) => Err(ReviewError::Provider {
                code: self.code().to_string(),
                message,
            }),
        }
    }
}

/// Map a raw result code straight to the caller-facing outcome.
pub fn translate(result_code: i32) -> Result<bool, ReviewError> {
    AlternateResult::from_code(result_code).into_outcome()
}
