use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, ReviewError};
use crate::outcome::{
    ALTERNATE_REVIEW_ACTION, ALTERNATE_REVIEW_PACKAGE, ALTERNATE_REVIEW_REQUEST_CODE,
    AlternateResult,
};
use crate::pending::{Delivery, Outcome, PendingRequests, RequestKind, Ticket};
use crate::platform::{
    AlternateIntent, AlternateLauncher, AppContext, Binding, ReviewProvider, StoreNavigator, Surface,
};
use crate::probe::EnvironmentProbe;
use crate::store::{DEFAULT_STOREFRONT_DOMAIN, listing_url};
use crate::token::TokenCache;

/// Tunables for a review session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub storefront_domain: String,
    /// Correlation code the alternate review flow is launched and answered with.
    pub alternate_request_code: i32,
    /// Give up on the alternate result after this long. `None` waits indefinitely.
    pub alternate_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            storefront_domain: DEFAULT_STOREFRONT_DOMAIN.to_string(),
            alternate_request_code: ALTERNATE_REVIEW_REQUEST_CODE,
            alternate_timeout: None,
        }
    }
}

/// External services the session drives.
#[derive(Clone)]
pub struct Collaborators {
    pub probe: Arc<dyn EnvironmentProbe>,
    pub review: Arc<dyn ReviewProvider>,
    pub alternate: Arc<dyn AlternateLauncher>,
    pub navigator: Arc<dyn StoreNavigator>,
}

/// Coordinates review requests for one attached application.
///
/// Owns the token cache and the pending-request slot; the lifecycle binding is
/// shared with the host, which toggles it on attach/detach. Every operation
/// re-reads the binding instead of caching it.
pub struct ReviewSession {
    binding: Arc<Binding>,
    probe: Arc<dyn EnvironmentProbe>,
    alternate: Arc<dyn AlternateLauncher>,
    navigator: Arc<dyn StoreNavigator>,
    review: Arc<dyn ReviewProvider>,
    tokens: TokenCache,
    pending: PendingRequests,
    cancel: Mutex<CancellationToken>,
    options: SessionOptions,
}

impl ReviewSession {
    pub fn new(binding: Arc<Binding>, collaborators: Collaborators, options: SessionOptions) -> Self {
        Self {
            binding,
            probe: collaborators.probe,
            alternate: collaborators.alternate,
            navigator: collaborators.navigator,
            tokens: TokenCache::new(Arc::clone(&collaborators.review)),
            review: collaborators.review,
            pending: PendingRequests::new(),
            cancel: Mutex::new(CancellationToken::new()),
            options,
        }
    }

    pub fn binding(&self) -> &Arc<Binding> {
        &self.binding
    }

    pub fn tokens(&self) -> &TokenCache {
        &self.tokens
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// True while an alternate review is waiting for its result callback.
    pub fn is_awaiting_alternate(&self) -> bool {
        self.pending.is_pending(self.options.alternate_request_code)
    }

    /// Whether the primary review service can be used right now.
    ///
    /// Never errors. A missing context or surface is an expected transient state
    /// (e.g. during teardown) and simply answers `false`. When the environment
    /// checks pass, a token is fetched eagerly so a later `request_review`
    /// launches without delay.
    pub async fn is_available(&self) -> bool {
        tracing::info!(kind = RequestKind::Probe.as_str(), "is_available: called");
        if let Err(missing) = self.binding.require() {
            tracing::error!("is_available: {missing} not available");
            return false;
        }

        let env = self.probe.probe();
        tracing::info!(
            package_installed = env.provider_package_installed,
            services_reachable = env.provider_services_reachable,
            version_sufficient = env.platform_version_sufficient,
            "is_available: environment probed"
        );
        if !env.is_satisfied() {
            tracing::warn!(
                "is_available: provider package, provider services and a supported platform version are all required"
            );
            return false;
        }

        self.tokens.ensure().await
    }

    /// Show the primary review UI. Resolves once the UI has been dismissed,
    /// whether or not the user left a review.
    pub async fn request_review(&self) -> Result<(), ReviewError> {
        tracing::info!(kind = RequestKind::RequestReview.as_str(), "request_review: called");
        self.require_binding()?;

        let token = self.tokens.take_or_fetch().await?;

        // The fetch may have awaited; the surface can be gone by now.
        let (_, surface) = self.require_binding()?;
        tracing::info!(surface = %surface.id, "request_review: launching review flow");
        if let Err(e) = self.review.launch_review_flow(&surface, token).await {
            tracing::warn!("request_review: review flow finished with error: {e}");
        }
        Ok(())
    }

    /// Hand the store listing URL to the navigator. Does not wait for it to open.
    pub async fn open_store_listing(&self) -> Result<(), ReviewError> {
        tracing::info!("open_store_listing: called");
        let (context, surface) = self.require_binding()?;
        let url = listing_url(&self.options.storefront_domain, &context.package_id);
        tracing::info!(%url, "open_store_listing: opening");
        self.navigator.open(&surface, &url).map_err(|e| {
            tracing::error!("open_store_listing: navigator failed: {e}");
            ReviewError::Other(format!("could not open store listing: {e}"))
        })
    }

    /// Launch the alternate storefront's review flow and wait for its result.
    ///
    /// The pending entry is installed before the launch, so a result delivered
    /// immediately afterwards always finds it. A launch that fails outright
    /// answers `Ok(false)`. A second call while one is waiting is rejected with
    /// `ReviewError::AlreadyPending`.
    pub async fn request_alternate_review(&self) -> Result<bool, ReviewError> {
        tracing::info!(
            kind = RequestKind::AlternateReview.as_str(),
            "request_alternate_review: called"
        );
        let request_code = self.options.alternate_request_code;
        // Taken before installing so a cancel issued right after install is seen.
        let cancel = self.cancel_token();
        let ticket = self.pending.install(request_code, RequestKind::AlternateReview)?;
        // Withdraws the entry on every exit path, including the caller dropping us.
        let _guard = self.pending.guard(&ticket);

        let launched = match self.binding.surface() {
            Some(surface) => {
                let intent = AlternateIntent {
                    action: ALTERNATE_REVIEW_ACTION.to_string(),
                    package: ALTERNATE_REVIEW_PACKAGE.to_string(),
                    request_code,
                };
                self.alternate.launch(&surface, &intent)
            }
            None => Err(ProviderError::new("activity not available")),
        };
        if let Err(e) = launched {
            tracing::error!("request_alternate_review: launch failed: {e}");
            return Ok(false);
        }
        tracing::info!(request_code, "request_alternate_review: activity started");

        self.await_ticket(ticket, cancel).await
    }

    /// Entry point for the host's activity-result callback.
    ///
    /// Returns `true` if the callback was consumed here; `false` leaves it for
    /// other handlers (unknown request code, or nothing waiting).
    pub fn on_activity_result(&self, request_code: i32, result_code: i32) -> bool {
        tracing::info!(request_code, result_code, "activity result received");
        if request_code != self.options.alternate_request_code {
            tracing::debug!(request_code, "activity result not ours, ignoring");
            return false;
        }

        let result = AlternateResult::from_code(result_code);
        match self.pending.resolve(request_code, result.into_outcome()) {
            Delivery::Delivered(kind) => {
                tracing::info!(
                    request_code,
                    result_code,
                    kind = kind.as_str(),
                    success = result.is_success(),
                    "alternate review resolved"
                );
                true
            }
            Delivery::Abandoned(_) => true,
            Delivery::Idle => {
                tracing::warn!(
                    request_code,
                    result_code,
                    "activity result arrived with no request waiting, dropping"
                );
                false
            }
        }
    }

    /// Engine teardown: drop the context, fail anything still waiting and
    /// forget the cached token.
    pub fn on_detached_from_engine(&self) {
        self.binding.on_detached_from_engine();
        self.cancel_pending();
        self.tokens.clear();
    }

    /// Fail every waiting request with `ReviewError::Cancelled`.
    pub fn cancel_pending(&self) {
        let previous = {
            let mut guard = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, CancellationToken::new())
        };
        tracing::info!(waiting = self.pending.len(), "cancelling pending review requests");
        previous.cancel();
    }

    fn cancel_token(&self) -> CancellationToken {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn await_ticket(&self, ticket: Ticket, cancel: CancellationToken) -> Outcome {
        let Ticket {
            request_code,
            id,
            mut receiver,
        } = ticket;
        let timeout = async {
            match self.options.alternate_timeout {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };

        let early_exit = tokio::select! {
            outcome = &mut receiver => {
                return outcome.unwrap_or(Err(ReviewError::Cancelled));
            }
            _ = cancel.cancelled() => ReviewError::Cancelled,
            _ = timeout => ReviewError::Timeout(
                self.options.alternate_timeout.map_or(0, |d| d.as_millis() as u64),
            ),
        };

        self.pending.withdraw(request_code, id);
        // The result may have landed between the wakeup and the withdrawal.
        match receiver.try_recv() {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(request_code, "alternate review abandoned: {early_exit}");
                Err(early_exit)
            }
        }
    }

    fn require_binding(&self) -> Result<(AppContext, Surface), ReviewError> {
        self.binding.require().map_err(|missing| {
            tracing::error!("{missing} not available");
            ReviewError::Unbound { missing }
        })
    }
}
