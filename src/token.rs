//! Review token cache with single-flight fetching.
//!
//! At most one token is held. While a fetch is outstanding every caller joins
//! that same fetch instead of starting another one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use crate::error::{ProviderError, ReviewError};
use crate::platform::ReviewProvider;

/// Opaque one-shot credential for launching the primary review UI.
#[derive(Clone, PartialEq, Eq)]
pub struct ReviewToken(Arc<str>);

impl ReviewToken {
    pub fn new(raw: impl Into<Arc<str>>) -> Self {
        Self(raw.into())
    }

    /// Raw handle, for providers that need to hand it back to their own UI.
    pub fn expose(&self) -> &str {
        &self.0
    }

    fn same_as(&self, other: &ReviewToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl std::fmt::Debug for ReviewToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReviewToken([REDACTED])")
    }
}

type FetchFuture = Shared<BoxFuture<'static, Result<ReviewToken, ProviderError>>>;

enum Slot {
    Empty,
    Fetching { id: u64, fetch: FetchFuture },
    Ready(ReviewToken),
}

pub struct TokenCache {
    provider: Arc<dyn ReviewProvider>,
    slot: Mutex<Slot>,
    next_fetch_id: AtomicU64,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn ReviewProvider>) -> Self {
        Self {
            provider,
            slot: Mutex::new(Slot::Empty),
            next_fetch_id: AtomicU64::new(0),
        }
    }

    /// True if a token is cached and ready for launch.
    pub fn is_warm(&self) -> bool {
        matches!(*self.lock(), Slot::Ready(_))
    }

    /// Warm the cache. `true` once a token is held, `false` if the provider declined.
    /// A decline is a normal negative answer, not an error.
    pub async fn ensure(&self) -> bool {
        match self.fetch().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!("review token fetch declined: {e}");
                false
            }
        }
    }

    /// Hand out the cached token (fetching one if needed) and clear the cache:
    /// a token is good for exactly one launch.
    /// Concurrent takers never share a token: whoever loses the race for a
    /// settled fetch starts another one.
    pub async fn take_or_fetch(&self) -> Result<ReviewToken, ReviewError> {
        loop {
            {
                let mut slot = self.lock();
                match std::mem::replace(&mut *slot, Slot::Empty) {
                    Slot::Ready(token) => return Ok(token),
                    other => *slot = other,
                }
            }

            let token = self.fetch().await.map_err(|e| {
                tracing::warn!("review token fetch failed: {e}");
                ReviewError::ProviderUnavailable
            })?;

            let mut slot = self.lock();
            if let Slot::Ready(cached) = &*slot
                && cached.same_as(&token)
            {
                *slot = Slot::Empty;
                return Ok(token);
            }
            tracing::debug!("review token taken by a concurrent launch, fetching another");
        }
    }

    /// Drop any cached token. An outstanding fetch is left to finish on its own.
    pub fn clear(&self) {
        let mut slot = self.lock();
        if matches!(*slot, Slot::Ready(_)) {
            *slot = Slot::Empty;
        }
    }

    async fn fetch(&self) -> Result<ReviewToken, ProviderError> {
        let (id, fetch) = {
            let mut slot = self.lock();
            match &*slot {
                Slot::Ready(token) => return Ok(token.clone()),
                Slot::Fetching { id, fetch } => {
                    tracing::debug!(fetch_id = id, "joining outstanding review token fetch");
                    (*id, fetch.clone())
                }
                Slot::Empty => {
                    let id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
                    let provider = Arc::clone(&self.provider);
                    let fetch = async move { provider.request_review_flow().await }
                        .boxed()
                        .shared();
                    tracing::info!(fetch_id = id, "requesting review flow");
                    *slot = Slot::Fetching {
                        id,
                        fetch: fetch.clone(),
                    };
                    (id, fetch)
                }
            }
        };

        let result = fetch.await;

        // Only the fetch still registered in the slot may settle it; a caller that
        // lost the race finds the slot already settled and leaves it alone.
        let mut slot = self.lock();
        if let Slot::Fetching { id: current, .. } = &*slot
            && *current == id
        {
            *slot = match &result {
                Ok(token) => Slot::Ready(token.clone()),
                Err(_) => Slot::Empty,
            };
        }
        result
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
