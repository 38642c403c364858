//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use store_review::error::ProviderError;
use store_review::platform::{
    AlternateIntent, AlternateLauncher, AppContext, Binding, ReviewProvider, StoreNavigator, Surface,
};
use store_review::probe::{EnvironmentSnapshot, FixedProbe};
use store_review::session::{Collaborators, ReviewSession, SessionOptions};
use store_review::token::ReviewToken;

pub const PACKAGE_ID: &str = "com.example.app";

/// Review provider counting fetches and launches. Fetches can be held open with a gate.
#[derive(Default)]
pub struct FakeProvider {
    pub fetches: AtomicUsize,
    pub launches: AtomicUsize,
    pub decline: AtomicBool,
    pub gate: Option<Semaphore>,
    pub launched_with: Mutex<Vec<(String, String)>>,
}

impl FakeProvider {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn declining() -> Self {
        let provider = Self::default();
        provider.decline.store(true, Ordering::SeqCst);
        provider
    }

    /// Fetches block until `release` is called.
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewProvider for FakeProvider {
    async fn request_review_flow(&self) -> Result<ReviewToken, ProviderError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ProviderError::new(e.to_string()))?
                .forget();
        }
        if self.decline.load(Ordering::SeqCst) {
            return Err(ProviderError::new("review flow unavailable"));
        }
        Ok(ReviewToken::new(format!("token-{n}")))
    }

    async fn launch_review_flow(
        &self,
        surface: &Surface,
        token: ReviewToken,
    ) -> Result<(), ProviderError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.launched_with
            .lock()
            .unwrap()
            .push((surface.id.clone(), token.expose().to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeLauncher {
    pub fail: AtomicBool,
    pub intents: Mutex<Vec<AlternateIntent>>,
}

impl AlternateLauncher for FakeLauncher {
    fn launch(&self, _surface: &Surface, intent: &AlternateIntent) -> Result<(), ProviderError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ProviderError::new("no activity found to handle intent"));
        }
        self.intents.lock().unwrap().push(intent.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeNavigator {
    pub urls: Mutex<Vec<String>>,
}

impl StoreNavigator for FakeNavigator {
    fn open(&self, _surface: &Surface, url: &str) -> Result<(), ProviderError> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub session: Arc<ReviewSession>,
    pub provider: Arc<FakeProvider>,
    pub launcher: Arc<FakeLauncher>,
    pub navigator: Arc<FakeNavigator>,
}

impl Harness {
    pub fn binding(&self) -> &Arc<Binding> {
        self.session.binding()
    }
}

/// Session with context and surface attached.
pub fn attached(provider: FakeProvider, env: EnvironmentSnapshot) -> Harness {
    build(provider, env, SessionOptions::default(), true)
}

pub fn build(
    provider: FakeProvider,
    env: EnvironmentSnapshot,
    options: SessionOptions,
    attach: bool,
) -> Harness {
    let binding = Arc::new(Binding::new());
    if attach {
        binding.on_attached_to_engine(AppContext {
            package_id: PACKAGE_ID.to_string(),
        });
        binding.on_attached_to_surface(Surface::new("main"));
    }
    let provider = Arc::new(provider);
    let launcher = Arc::new(FakeLauncher::default());
    let navigator = Arc::new(FakeNavigator::default());
    let session = Arc::new(ReviewSession::new(
        binding,
        Collaborators {
            probe: Arc::new(FixedProbe(env)),
            review: provider.clone(),
            alternate: launcher.clone(),
            navigator: navigator.clone(),
        },
        options,
    ));
    Harness {
        session,
        provider,
        launcher,
        navigator,
    }
}
