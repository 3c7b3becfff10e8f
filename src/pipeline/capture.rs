//! Capture sources: camera shutter and photo-library picker.
//!
//! Device access sits behind [`CameraDevice`] and [`GalleryPicker`].
//! [`CapturePipeline`] never surfaces device failures to the caller: a failed
//! shutter simply yields no image, and a broken picker reads as a cancel.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::permissions::PermissionGate;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),
    #[error("Photo library unavailable: {0}")]
    GalleryUnavailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Camera hardware. Returns the path of a freshly written photo.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn take_picture(&self) -> Result<PathBuf, CaptureError>;
}

/// Photo-library picker. `Ok(None)` means the user dismissed it.
#[async_trait]
pub trait GalleryPicker: Send + Sync {
    async fn pick_image(&self) -> Result<Option<PathBuf>, CaptureError>;
}

/// Outcome of a gallery pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryPick {
    Picked(PathBuf),
    Cancelled,
    PermissionDenied,
}

// ═══════════════════════════════════════════════════════════
// File-backed sources
// ═══════════════════════════════════════════════════════════

/// Camera stand-in that "shoots" an existing file by copying it into the
/// capture directory, so a retake never touches the source.
pub struct FileCamera {
    source: PathBuf,
    captures_dir: PathBuf,
}

impl FileCamera {
    pub fn new(source: impl Into<PathBuf>, captures_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            captures_dir: captures_dir.into(),
        }
    }
}

#[async_trait]
impl CameraDevice for FileCamera {
    async fn take_picture(&self) -> Result<PathBuf, CaptureError> {
        if !tokio::fs::try_exists(&self.source).await? {
            return Err(CaptureError::CameraUnavailable(format!(
                "{} does not exist",
                self.source.display()
            )));
        }
        tokio::fs::create_dir_all(&self.captures_dir).await?;

        let ext = self
            .source
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg");
        let dest = self.captures_dir.join(format!("{}.{ext}", Uuid::new_v4()));
        tokio::fs::copy(&self.source, &dest).await?;
        Ok(dest)
    }
}

/// Picker stand-in returning a preselected file (or nothing, for a cancel).
pub struct FileGallery {
    selection: Option<PathBuf>,
}

impl FileGallery {
    pub fn new(selection: Option<PathBuf>) -> Self {
        Self { selection }
    }
}

#[async_trait]
impl GalleryPicker for FileGallery {
    async fn pick_image(&self) -> Result<Option<PathBuf>, CaptureError> {
        let Some(path) = &self.selection else {
            return Ok(None);
        };
        if !tokio::fs::try_exists(path).await? {
            return Err(CaptureError::GalleryUnavailable(format!(
                "{} does not exist",
                path.display()
            )));
        }
        Ok(Some(path.clone()))
    }
}

// ═══════════════════════════════════════════════════════════
// CapturePipeline
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct CapturePipeline {
    camera: Arc<dyn CameraDevice>,
    gallery: Arc<dyn GalleryPicker>,
}

impl CapturePipeline {
    pub fn new(camera: Arc<dyn CameraDevice>, gallery: Arc<dyn GalleryPicker>) -> Self {
        Self { camera, gallery }
    }

    /// Take a picture. `None` when the camera failed; the failure is only
    /// logged.
    pub async fn capture_from_camera(&self) -> Option<PathBuf> {
        match self.camera.take_picture().await {
            Ok(path) => {
                debug!(path = %path.display(), "Photo captured");
                Some(path)
            }
            Err(e) => {
                debug!(error = %e, "Camera capture failed");
                None
            }
        }
    }

    /// Pick from the photo library, prompting for access first when needed.
    pub async fn pick_from_gallery(&self, gate: &mut PermissionGate) -> GalleryPick {
        if !gate.ensure_granted().await {
            return GalleryPick::PermissionDenied;
        }
        match self.gallery.pick_image().await {
            Ok(Some(path)) => GalleryPick::Picked(path),
            Ok(None) => GalleryPick::Cancelled,
            Err(e) => {
                debug!(error = %e, "Gallery pick failed");
                GalleryPick::Cancelled
            }
        }
    }

    /// Discard the current capture so the camera can be shown again.
    pub async fn retake(&self, previous: Option<&Path>) {
        if let Some(path) = previous {
            discard_capture(path).await;
        }
    }
}

/// Delete a capture file. Missing files and delete failures are ignored.
pub async fn discard_capture(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Capture discarded"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "Failed to discard capture"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PermissionKind, PermissionStatus};
    use crate::permissions::{AlwaysGranted, PermissionError, PermissionProvider};
    use crate::preferences::PreferenceStore;

    struct BrokenCamera;

    #[async_trait]
    impl CameraDevice for BrokenCamera {
        async fn take_picture(&self) -> Result<PathBuf, CaptureError> {
            Err(CaptureError::CameraUnavailable("lens cap on".into()))
        }
    }

    struct DenyAll;

    #[async_trait]
    impl PermissionProvider for DenyAll {
        async fn status(&self, _: PermissionKind) -> Result<PermissionStatus, PermissionError> {
            Ok(PermissionStatus::Denied)
        }
        async fn request(&self, _: PermissionKind) -> Result<PermissionStatus, PermissionError> {
            Ok(PermissionStatus::Denied)
        }
        async fn open_settings(&self) -> Result<(), PermissionError> {
            Ok(())
        }
    }

    fn gallery_gate(provider: Arc<dyn PermissionProvider>) -> PermissionGate {
        PermissionGate::new(PermissionKind::Gallery, provider, PreferenceStore::in_memory())
    }

    fn pipeline(camera: Arc<dyn CameraDevice>, selection: Option<PathBuf>) -> CapturePipeline {
        CapturePipeline::new(camera, Arc::new(FileGallery::new(selection)))
    }

    #[tokio::test]
    async fn camera_capture_copies_into_capture_dir() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("shot.jpg");
        std::fs::write(&source, b"jpeg").unwrap();
        let captures = dir.path().join("captures");

        let p = pipeline(Arc::new(FileCamera::new(&source, &captures)), None);
        let path = p.capture_from_camera().await.unwrap();

        assert!(path.starts_with(&captures));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn camera_failure_yields_none() {
        let p = pipeline(Arc::new(BrokenCamera), None);
        assert_eq!(p.capture_from_camera().await, None);
    }

    #[tokio::test]
    async fn missing_camera_source_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let camera = FileCamera::new(dir.path().join("gone.jpg"), dir.path());
        let p = pipeline(Arc::new(camera), None);
        assert_eq!(p.capture_from_camera().await, None);
    }

    #[tokio::test]
    async fn gallery_pick_returns_selection() {
        let dir = tempfile::tempdir().unwrap();
        let picked = dir.path().join("meal.png");
        std::fs::write(&picked, b"png").unwrap();

        let p = pipeline(Arc::new(BrokenCamera), Some(picked.clone()));
        let mut gate = gallery_gate(Arc::new(AlwaysGranted));
        assert_eq!(p.pick_from_gallery(&mut gate).await, GalleryPick::Picked(picked));
    }

    #[tokio::test]
    async fn gallery_dismissal_is_cancel() {
        let p = pipeline(Arc::new(BrokenCamera), None);
        let mut gate = gallery_gate(Arc::new(AlwaysGranted));
        assert_eq!(p.pick_from_gallery(&mut gate).await, GalleryPick::Cancelled);
    }

    #[tokio::test]
    async fn gallery_failure_is_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let p = pipeline(Arc::new(BrokenCamera), Some(dir.path().join("missing.jpg")));
        let mut gate = gallery_gate(Arc::new(AlwaysGranted));
        assert_eq!(p.pick_from_gallery(&mut gate).await, GalleryPick::Cancelled);
    }

    #[tokio::test]
    async fn gallery_denied_never_opens_picker() {
        let dir = tempfile::tempdir().unwrap();
        let picked = dir.path().join("meal.png");
        std::fs::write(&picked, b"png").unwrap();

        let p = pipeline(Arc::new(BrokenCamera), Some(picked));
        let mut gate = gallery_gate(Arc::new(DenyAll));
        assert_eq!(
            p.pick_from_gallery(&mut gate).await,
            GalleryPick::PermissionDenied
        );
        assert!(gate.needs_explanation());
    }

    #[tokio::test]
    async fn retake_deletes_previous_capture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.jpg");
        std::fs::write(&path, b"x").unwrap();

        let p = pipeline(Arc::new(BrokenCamera), None);
        p.retake(Some(&path)).await;
        assert!(!path.exists());

        // Already gone, and nothing to discard: both are no-ops.
        p.retake(Some(&path)).await;
        p.retake(None).await;
    }
}
