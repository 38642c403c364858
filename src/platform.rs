//! Boundary collaborators and the lifecycle binding the coordinator reads from.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{Missing, ProviderError};
use crate::token::ReviewToken;

/// Application context handed over when the host engine attaches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppContext {
    /// Identifier the app is published under (e.g. `com.example.app`).
    pub package_id: String,
}

/// Foreground interactive surface able to host a review UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    pub id: String,
}

impl Surface {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Explicit intent used to start the alternate storefront's review flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateIntent {
    pub action: String,
    pub package: String,
    pub request_code: i32,
}

/// Primary review service: fetches a one-shot token, then launches the UI with it.
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    async fn request_review_flow(&self) -> Result<ReviewToken, ProviderError>;

    /// Resolves once the review UI has been shown and dismissed. The provider
    /// never discloses whether a review was actually left.
    async fn launch_review_flow(
        &self,
        surface: &Surface,
        token: ReviewToken,
    ) -> Result<(), ProviderError>;
}

/// Fires the alternate storefront's review intent. Completion is reported later
/// through the activity-result callback, keyed by `intent.request_code`.
pub trait AlternateLauncher: Send + Sync {
    fn launch(&self, surface: &Surface, intent: &AlternateIntent) -> Result<(), ProviderError>;
}

/// Opens a URL in an external viewer. Fire-and-forget.
pub trait StoreNavigator: Send + Sync {
    fn open(&self, surface: &Surface, url: &str) -> Result<(), ProviderError>;
}

/// Context and surface as currently attached by the host lifecycle.
///
/// Both halves toggle independently: the engine attaches/detaches the context,
/// activities attach/detach/reattach the surface (including across config changes).
#[derive(Debug, Default)]
pub struct Binding {
    context: RwLock<Option<AppContext>>,
    surface: RwLock<Option<Surface>>,
}

impl Binding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_attached_to_engine(&self, context: AppContext) {
        tracing::debug!(package_id = %context.package_id, "engine attached");
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = Some(context);
    }

    pub fn on_detached_from_engine(&self) {
        tracing::debug!("engine detached");
        *self.context.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn on_attached_to_surface(&self, surface: Surface) {
        tracing::debug!(surface = %surface.id, "surface attached");
        *self.surface.write().unwrap_or_else(PoisonError::into_inner) = Some(surface);
    }

    pub fn on_detached_from_surface(&self) {
        tracing::debug!("surface detached");
        *self.surface.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn on_detached_for_config_changes(&self) {
        self.on_detached_from_surface();
    }

    pub fn on_reattached_for_config_changes(&self, surface: Surface) {
        self.on_attached_to_surface(surface);
    }

    pub fn context(&self) -> Option<AppContext> {
        self.context
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn surface(&self) -> Option<Surface> {
        self.surface
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot both halves, reporting the first one that is absent.
    /// Context is checked before the surface.
    pub fn require(&self) -> Result<(AppContext, Surface), Missing> {
        let context = self.context().ok_or(Missing::Context)?;
        let surface = self.surface().ok_or(Missing::Activity)?;
        Ok((context, surface))
    }
}
