//! In-flight requests awaiting an out-of-band result, keyed by correlation code.
//!
//! The host's result callback carries nothing but the correlation code, so each
//! code may have at most one entry: a second request under the same code could
//! never be told apart from the first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;

use crate::error::ReviewError;

pub type Outcome = Result<bool, ReviewError>;

/// Which coordinator operation a request belongs to. Only `AlternateReview` is
/// ever parked here by the session; the other kinds tag the primary-path
/// operations in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Probe,
    RequestReview,
    AlternateReview,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Probe => "probe",
            Self::RequestReview => "request_review",
            Self::AlternateReview => "alternate_review",
        }
    }
}

struct Entry {
    id: u64,
    kind: RequestKind,
    sink: oneshot::Sender<Outcome>,
}

/// Handle returned by `PendingRequests::install`. Await `receiver` for the outcome.
pub struct Ticket {
    pub request_code: i32,
    pub id: u64,
    pub receiver: oneshot::Receiver<Outcome>,
}

/// Withdraws its entry when dropped, so a caller that stops waiting never
/// leaves the correlation code blocked. A no-op once the entry was resolved.
pub struct PendingGuard<'a> {
    pending: &'a PendingRequests,
    request_code: i32,
    id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.pending.withdraw(self.request_code, self.id) {
            tracing::debug!(request_code = self.request_code, "pending request withdrawn");
        }
    }
}

/// Result of offering an outcome to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Outcome handed to the waiting caller.
    Delivered(RequestKind),
    /// An entry existed but its caller had already gone away.
    Abandoned(RequestKind),
    /// Nothing pending under that code.
    Idle,
}

#[derive(Default)]
pub struct PendingRequests {
    entries: Mutex<HashMap<i32, Entry>>,
    next_id: AtomicU64,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a request under `request_code`. Fails if one is already waiting there.
    pub fn install(&self, request_code: i32, kind: RequestKind) -> Result<Ticket, ReviewError> {
        let mut entries = self.lock();
        if entries.contains_key(&request_code) {
            return Err(ReviewError::AlreadyPending { request_code });
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sink, receiver) = oneshot::channel();
        entries.insert(request_code, Entry { id, kind, sink });
        tracing::debug!(request_code, kind = kind.as_str(), "pending request installed");
        Ok(Ticket {
            request_code,
            id,
            receiver,
        })
    }

    /// Resolve and clear the entry under `request_code`.
    pub fn resolve(&self, request_code: i32, outcome: Outcome) -> Delivery {
        let Some(entry) = self.lock().remove(&request_code) else {
            return Delivery::Idle;
        };
        match entry.sink.send(outcome) {
            Ok(()) => Delivery::Delivered(entry.kind),
            Err(_) => {
                tracing::debug!(request_code, "pending caller dropped before its result arrived");
                Delivery::Abandoned(entry.kind)
            }
        }
    }

    /// Withdraw the entry with this `id`, leaving any newer entry under the code alone.
    pub fn withdraw(&self, request_code: i32, id: u64) -> bool {
        let mut entries = self.lock();
        match entries.get(&request_code) {
            Some(entry) if entry.id == id => {
                entries.remove(&request_code);
                true
            }
            _ => false,
        }
    }

    /// Tie the entry installed for `ticket` to the returned guard's lifetime.
    pub fn guard(&self, ticket: &Ticket) -> PendingGuard<'_> {
        PendingGuard {
            pending: self,
            request_code: ticket.request_code,
            id: ticket.id,
        }
    }

    pub fn is_pending(&self, request_code: i32) -> bool {
        self.lock().contains_key(&request_code)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<i32, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
