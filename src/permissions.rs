//! Permission gate for camera and photo-library access.
//!
//! The OS permission subsystem is reached through [`PermissionProvider`].
//! [`PermissionGate`] keeps the last status it observed, mirrors every change
//! into the [`PreferenceStore`] (best-effort, never retried) and tells the
//! capture flow when to route to the explanation screen.

use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{PermissionKind, PermissionStatus};
use crate::preferences::PreferenceStore;

#[derive(Debug, thiserror::Error)]
pub enum PermissionError {
    #[error("Permission service unavailable: {0}")]
    Unavailable(String),
    #[error("Unable to open settings: {0}")]
    Settings(String),
}

/// OS-level permission access.
#[async_trait]
pub trait PermissionProvider: Send + Sync {
    /// Current status, without prompting.
    async fn status(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError>;

    /// Show the OS prompt (when the OS still allows it) and return the answer.
    async fn request(&self, kind: PermissionKind) -> Result<PermissionStatus, PermissionError>;

    /// Deep-link to the app's page in the OS settings.
    async fn open_settings(&self) -> Result<(), PermissionError>;
}

/// Provider for platforms without runtime permission prompts (desktop, CLI).
pub struct AlwaysGranted;

#[async_trait]
impl PermissionProvider for AlwaysGranted {
    async fn status(&self, _kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }

    async fn request(&self, _kind: PermissionKind) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }

    async fn open_settings(&self) -> Result<(), PermissionError> {
        Ok(())
    }
}

/// Cached permission state for one permission kind.
pub struct PermissionGate {
    kind: PermissionKind,
    provider: Arc<dyn PermissionProvider>,
    prefs: PreferenceStore,
    state: PermissionStatus,
    observed: bool,
}

impl PermissionGate {
    pub fn new(
        kind: PermissionKind,
        provider: Arc<dyn PermissionProvider>,
        prefs: PreferenceStore,
    ) -> Self {
        Self {
            kind,
            provider,
            prefs,
            state: PermissionStatus::Undetermined,
            observed: false,
        }
    }

    pub fn kind(&self) -> PermissionKind {
        self.kind
    }

    /// Last status observed from the OS (`Undetermined` before the first).
    pub fn state(&self) -> PermissionStatus {
        self.state
    }

    pub fn is_granted(&self) -> bool {
        self.state.is_granted()
    }

    /// Denied: the UI should show the explanation screen with a settings link.
    pub fn needs_explanation(&self) -> bool {
        self.state == PermissionStatus::Denied
    }

    /// Status persisted by a previous session, for cold-start UX branching.
    pub async fn last_persisted(&self) -> Option<PermissionStatus> {
        self.prefs.read_permission(self.kind).await
    }

    /// Prompt the user and return the resulting status.
    ///
    /// A provider failure leaves the state unchanged.
    pub async fn request(&mut self) -> PermissionStatus {
        match self.provider.request(self.kind).await {
            Ok(status) => self.observe(status).await,
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Permission request failed");
                self.state
            }
        }
    }

    /// Re-query the OS without prompting.
    pub async fn refresh(&mut self) -> PermissionStatus {
        match self.provider.status(self.kind).await {
            Ok(status) => self.observe(status).await,
            Err(e) => {
                tracing::warn!(kind = %self.kind, error = %e, "Permission refresh failed");
                self.state
            }
        }
    }

    /// True when already granted; otherwise prompt and report the answer.
    pub async fn ensure_granted(&mut self) -> bool {
        if self.is_granted() {
            return true;
        }
        self.request().await.is_granted()
    }

    /// Open the OS settings page. Failure is logged and otherwise ignored.
    pub async fn open_settings(&self) {
        if let Err(e) = self.provider.open_settings().await {
            tracing::debug!(kind = %self.kind, error = %e, "Failed to open app settings");
        }
    }

    async fn observe(&mut self, status: PermissionStatus) -> PermissionStatus {
        let changed = !self.observed || status != self.state;
        self.state = status;
        self.observed = true;
        if changed {
            tracing::debug!(kind = %self.kind, %status, "Permission status observed");
            self.prefs.save_permission(self.kind, status).await;
        }
        status
    }
}
