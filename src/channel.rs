//! Caller-facing message boundary: method names in, `MethodReply` out.

use crate::response::MethodReply;
use crate::session::ReviewSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    IsAvailable,
    RequestReview,
    OpenStoreListing,
    RequestAlternateReview,
}

impl Method {
    /// Resolve a wire method name. `requestHuaweiReview` is the legacy name of
    /// the alternate review call.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "isAvailable" => Some(Self::IsAvailable),
            "requestReview" => Some(Self::RequestReview),
            "openStoreListing" => Some(Self::OpenStoreListing),
            "requestAlternateReview" | "requestHuaweiReview" => Some(Self::RequestAlternateReview),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IsAvailable => "isAvailable",
            Self::RequestReview => "requestReview",
            Self::OpenStoreListing => "openStoreListing",
            Self::RequestAlternateReview => "requestAlternateReview",
        }
    }
}

/// Dispatch one method call. Unknown names reply `NotImplemented`.
pub async fn handle(session: &ReviewSession, method: &str) -> MethodReply {
    tracing::info!(method, "method call");
    match Method::parse(method) {
        Some(m) => call(session, m).await,
        None => {
            tracing::warn!(method, "method not implemented");
            MethodReply::NotImplemented
        }
    }
}

pub async fn call(session: &ReviewSession, method: Method) -> MethodReply {
    match method {
        Method::IsAvailable => MethodReply::success(session.is_available().await),
        Method::RequestReview => session.request_review().await.into(),
        Method::OpenStoreListing => session.open_store_listing().await.into(),
        Method::RequestAlternateReview => session.request_alternate_review().await.into(),
    }
}
