//! Capture screen state machine and the session that drives it.
//!
//! [`CaptureFlow`] is the single source of truth for what the capture screen
//! shows. Every user action is a [`FlowEvent`]; [`CaptureFlow::next`] either
//! yields the following state or rejects the event with [`FlowError`].
//! [`CaptureSession`] performs the side effects (permission prompts, camera,
//! normalization, uploads, preference writes) around those transitions.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::capture::{discard_capture, CapturePipeline, GalleryPick};
use super::normalize::ImageNormalizer;
use crate::api::ApiError;
use crate::models::{
    EquipmentSelection, PermissionStatus, RecipeCard, UploadRecipePayload, UploadWorkoutPayload,
    WorkoutCard, WorkoutLevel,
};
use crate::permissions::PermissionGate;
use crate::preferences::PreferenceStore;
use crate::query::{FitnessQueries, RecipeUpload, WorkoutUpload};

/// Shown when photo-library access is refused.
pub const GALLERY_PERMISSION_MESSAGE: &str =
    "We need photo library access so you can pick existing photos of your equipment or ingredients.";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("Cannot {event} while {state}")]
    InvalidTransition {
        state: &'static str,
        event: &'static str,
    },
    #[error("Results for {got} cannot complete a {expected} upload")]
    TargetMismatch {
        expected: UploadTarget,
        got: UploadTarget,
    },
}

// ═══════════════════════════════════════════════════════════
// Results
// ═══════════════════════════════════════════════════════════

/// Which endpoint an upload goes to, and which results tab it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UploadTarget {
    #[default]
    Workouts,
    Recipes,
}

impl fmt::Display for UploadTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UploadTarget::Workouts => "workouts",
            UploadTarget::Recipes => "recipes",
        })
    }
}

/// One upload's cards.
#[derive(Debug, Clone, PartialEq)]
pub enum TabResults {
    Workouts(Vec<WorkoutCard>),
    Recipes(Vec<RecipeCard>),
}

impl TabResults {
    pub fn target(&self) -> UploadTarget {
        match self {
            TabResults::Workouts(_) => UploadTarget::Workouts,
            TabResults::Recipes(_) => UploadTarget::Recipes,
        }
    }
}

/// Results for the current image, kept per tab.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureResults {
    pub workouts: Vec<WorkoutCard>,
    pub recipes: Vec<RecipeCard>,
    pub active: UploadTarget,
}

impl CaptureResults {
    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty() && self.recipes.is_empty()
    }

    fn store(&mut self, results: TabResults) {
        self.active = results.target();
        match results {
            TabResults::Workouts(cards) => self.workouts = cards,
            TabResults::Recipes(cards) => self.recipes = cards,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// State machine
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CaptureFlow {
    /// Camera permission not yet answered.
    #[default]
    AwaitingPermission,
    /// Camera permission refused; the explanation screen is up.
    PermissionDenied,
    /// Live camera, nothing captured.
    Camera,
    /// Photo taken; the equipment sheet is open.
    SelectingEquipment {
        image: PathBuf,
        last_choice: Option<EquipmentSelection>,
    },
    /// An image is ready to upload.
    Ready {
        image: PathBuf,
        equipment: Option<EquipmentSelection>,
    },
    Processing {
        image: PathBuf,
        equipment: Option<EquipmentSelection>,
        target: UploadTarget,
        results: CaptureResults,
    },
    Results {
        image: PathBuf,
        equipment: Option<EquipmentSelection>,
        results: CaptureResults,
    },
}

/// User actions and async completions that move the flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    PermissionResolved(PermissionStatus),
    Captured {
        image: PathBuf,
        last_choice: Option<EquipmentSelection>,
    },
    Picked {
        image: PathBuf,
        equipment: Option<EquipmentSelection>,
    },
    /// `None` is a skip: the previous choice stays.
    EquipmentChosen(Option<EquipmentSelection>),
    UploadStarted(UploadTarget),
    UploadSucceeded(TabResults),
    UploadFailed,
    TabSelected(UploadTarget),
    Retake,
}

impl FlowEvent {
    pub fn name(&self) -> &'static str {
        match self {
            FlowEvent::PermissionResolved(_) => "resolve permission",
            FlowEvent::Captured { .. } => "capture",
            FlowEvent::Picked { .. } => "pick from gallery",
            FlowEvent::EquipmentChosen(_) => "choose equipment",
            FlowEvent::UploadStarted(_) => "start upload",
            FlowEvent::UploadSucceeded(_) => "finish upload",
            FlowEvent::UploadFailed => "fail upload",
            FlowEvent::TabSelected(_) => "select tab",
            FlowEvent::Retake => "retake",
        }
    }
}

impl CaptureFlow {
    pub fn name(&self) -> &'static str {
        match self {
            CaptureFlow::AwaitingPermission => "awaiting permission",
            CaptureFlow::PermissionDenied => "permission denied",
            CaptureFlow::Camera => "on camera",
            CaptureFlow::SelectingEquipment { .. } => "selecting equipment",
            CaptureFlow::Ready { .. } => "ready",
            CaptureFlow::Processing { .. } => "processing",
            CaptureFlow::Results { .. } => "showing results",
        }
    }

    /// Current image, if any.
    pub fn image(&self) -> Option<&Path> {
        match self {
            CaptureFlow::SelectingEquipment { image, .. }
            | CaptureFlow::Ready { image, .. }
            | CaptureFlow::Processing { image, .. }
            | CaptureFlow::Results { image, .. } => Some(image),
            _ => None,
        }
    }

    pub fn is_processing(&self) -> bool {
        matches!(self, CaptureFlow::Processing { .. })
    }

    /// Whether `event` is legal here.
    pub fn accepts(&self, event: &FlowEvent) -> bool {
        self.next(event.clone()).is_ok()
    }

    /// The state after `event`.
    pub fn next(&self, event: FlowEvent) -> Result<CaptureFlow, FlowError> {
        use CaptureFlow as S;
        use FlowEvent as E;

        let invalid = |event: &FlowEvent| FlowError::InvalidTransition {
            state: self.name(),
            event: event.name(),
        };

        match (self, event) {
            (S::AwaitingPermission | S::PermissionDenied | S::Camera, E::PermissionResolved(status)) => {
                Ok(match status {
                    PermissionStatus::Granted => S::Camera,
                    PermissionStatus::Denied => S::PermissionDenied,
                    PermissionStatus::Undetermined => S::AwaitingPermission,
                })
            }

            (S::Camera, E::Captured { image, last_choice }) => {
                Ok(S::SelectingEquipment { image, last_choice })
            }

            (
                S::AwaitingPermission
                | S::PermissionDenied
                | S::Camera
                | S::Ready { .. }
                | S::Results { .. },
                E::Picked { image, equipment },
            ) => Ok(S::Ready { image, equipment }),

            (S::SelectingEquipment { image, last_choice }, E::EquipmentChosen(choice)) => {
                Ok(S::Ready {
                    image: image.clone(),
                    equipment: choice.or(*last_choice),
                })
            }

            (S::Ready { image, equipment }, E::UploadStarted(target)) => Ok(S::Processing {
                image: image.clone(),
                equipment: *equipment,
                target,
                results: CaptureResults::default(),
            }),
            (S::Results { image, equipment, results }, E::UploadStarted(target)) => {
                Ok(S::Processing {
                    image: image.clone(),
                    equipment: *equipment,
                    target,
                    results: results.clone(),
                })
            }

            (
                S::Processing { image, equipment, target, results },
                E::UploadSucceeded(tab),
            ) => {
                if tab.target() != *target {
                    return Err(FlowError::TargetMismatch {
                        expected: *target,
                        got: tab.target(),
                    });
                }
                let mut results = results.clone();
                results.store(tab);
                Ok(S::Results {
                    image: image.clone(),
                    equipment: *equipment,
                    results,
                })
            }

            (S::Processing { image, equipment, results, .. }, E::UploadFailed) => {
                if results.is_empty() {
                    Ok(S::Ready {
                        image: image.clone(),
                        equipment: *equipment,
                    })
                } else {
                    Ok(S::Results {
                        image: image.clone(),
                        equipment: *equipment,
                        results: results.clone(),
                    })
                }
            }

            (S::Results { image, equipment, results }, E::TabSelected(tab)) => {
                let mut results = results.clone();
                results.active = tab;
                Ok(S::Results {
                    image: image.clone(),
                    equipment: *equipment,
                    results,
                })
            }

            (S::SelectingEquipment { .. } | S::Ready { .. } | S::Results { .. }, E::Retake) => {
                Ok(S::Camera)
            }

            (_, event) => Err(invalid(&event)),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// CaptureSession
// ═══════════════════════════════════════════════════════════

/// Workout metadata for an upload; `None` when there is nothing to send.
fn workout_metadata(
    filters: &UploadWorkoutPayload,
    equipment: Option<EquipmentSelection>,
) -> Option<UploadWorkoutPayload> {
    let payload = UploadWorkoutPayload {
        equipment: equipment.map(|choice| vec![choice.as_str().to_string()]),
        ..filters.clone()
    };
    if payload.equipment.is_none() && payload.level.is_none() && payload.duration_minutes.is_none() {
        None
    } else {
        Some(payload)
    }
}

fn recipe_payload(ingredients: &[String]) -> Option<UploadRecipePayload> {
    if ingredients.is_empty() {
        None
    } else {
        Some(UploadRecipePayload {
            ingredients: Some(ingredients.to_vec()),
        })
    }
}

/// Drives the capture screen end to end.
pub struct CaptureSession {
    flow: CaptureFlow,
    camera_gate: PermissionGate,
    gallery_gate: PermissionGate,
    capture: CapturePipeline,
    normalizer: ImageNormalizer,
    queries: FitnessQueries,
    prefs: PreferenceStore,
    equipment: Option<EquipmentSelection>,
    error_message: Option<String>,
    /// Image file this session wrote and may delete. Never a library file.
    owned: Option<PathBuf>,
    workout_filters: UploadWorkoutPayload,
    ingredients: Vec<String>,
}

impl CaptureSession {
    pub fn new(
        camera_gate: PermissionGate,
        gallery_gate: PermissionGate,
        capture: CapturePipeline,
        normalizer: ImageNormalizer,
        queries: FitnessQueries,
        prefs: PreferenceStore,
    ) -> Self {
        Self {
            flow: CaptureFlow::default(),
            camera_gate,
            gallery_gate,
            capture,
            normalizer,
            queries,
            prefs,
            equipment: None,
            error_message: None,
            owned: None,
            workout_filters: UploadWorkoutPayload::default(),
            ingredients: Vec::new(),
        }
    }

    pub fn flow(&self) -> &CaptureFlow {
        &self.flow
    }

    /// Equipment choice that the next workout upload will send.
    pub fn equipment(&self) -> Option<EquipmentSelection> {
        self.equipment
    }

    /// Message from the last failed upload, cleared on the next success.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Level and duration hints sent with every workout upload.
    pub fn with_workout_filters(mut self, level: Option<WorkoutLevel>, duration: Option<u32>) -> Self {
        self.workout_filters.level = level;
        self.workout_filters.duration_minutes = duration;
        self
    }

    /// Known ingredients sent with every recipe upload.
    pub fn with_ingredients(mut self, ingredients: Vec<String>) -> Self {
        self.ingredients = ingredients;
        self
    }

    pub fn queries(&self) -> &FitnessQueries {
        &self.queries
    }

    fn apply(&mut self, event: FlowEvent) -> Result<(), FlowError> {
        let next = self.flow.next(event)?;
        debug!(from = self.flow.name(), to = next.name(), "Capture flow transition");
        self.flow = next;
        Ok(())
    }

    fn ensure_accepts(&self, event: &FlowEvent) -> Result<(), FlowError> {
        if self.flow.accepts(event) {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                state: self.flow.name(),
                event: event.name(),
            })
        }
    }

    /// Screen mount: restore the saved equipment choice and read the camera
    /// permission without prompting.
    pub async fn start(&mut self) -> Result<&CaptureFlow, FlowError> {
        if self.equipment.is_none() {
            self.equipment = self.prefs.read_equipment().await;
        }
        let status = self.camera_gate.refresh().await;
        self.apply(FlowEvent::PermissionResolved(status))?;
        Ok(&self.flow)
    }

    /// Prompt for camera access.
    pub async fn request_camera(&mut self) -> Result<&CaptureFlow, FlowError> {
        self.ensure_accepts(&FlowEvent::PermissionResolved(PermissionStatus::Granted))?;
        let status = self.camera_gate.request().await;
        if status.is_granted() {
            self.error_message = None;
        }
        self.apply(FlowEvent::PermissionResolved(status))?;
        Ok(&self.flow)
    }

    pub async fn open_settings(&self) {
        self.camera_gate.open_settings().await;
    }

    /// Take a photo and open the equipment sheet. `Ok(false)` when the
    /// camera produced nothing; the state is then unchanged.
    pub async fn take_photo(&mut self) -> Result<bool, FlowError> {
        let probe = FlowEvent::Captured {
            image: PathBuf::new(),
            last_choice: None,
        };
        self.ensure_accepts(&probe)?;

        let Some(raw) = self.capture.capture_from_camera().await else {
            return Ok(false);
        };
        let image = self.prepare(&raw).await;
        self.apply(FlowEvent::Captured {
            image: image.clone(),
            last_choice: self.equipment,
        })?;
        self.owned = Some(image);
        Ok(true)
    }

    /// Pick an image from the photo library. A picked image skips the
    /// equipment sheet.
    pub async fn pick_from_gallery(&mut self) -> Result<GalleryPick, FlowError> {
        let probe = FlowEvent::Picked {
            image: PathBuf::new(),
            equipment: None,
        };
        self.ensure_accepts(&probe)?;

        match self.capture.pick_from_gallery(&mut self.gallery_gate).await {
            GalleryPick::Picked(path) => {
                let image = self.normalizer.normalize_or_original(&path).await;
                self.apply(FlowEvent::Picked {
                    image: image.clone(),
                    equipment: self.equipment,
                })?;
                // Normalization failed: the path is the user's library file.
                self.owned = (image != path).then(|| image.clone());
                Ok(GalleryPick::Picked(image))
            }
            GalleryPick::PermissionDenied => {
                self.error_message = Some(GALLERY_PERMISSION_MESSAGE.to_string());
                Ok(GalleryPick::PermissionDenied)
            }
            GalleryPick::Cancelled => Ok(GalleryPick::Cancelled),
        }
    }

    /// Close the equipment sheet. `Some` persists the new choice; `None`
    /// (skip) keeps the previous one.
    pub async fn choose_equipment(
        &mut self,
        choice: Option<EquipmentSelection>,
    ) -> Result<(), FlowError> {
        self.apply(FlowEvent::EquipmentChosen(choice))?;
        if let Some(choice) = choice {
            self.equipment = Some(choice);
            self.prefs.save_equipment(choice).await;
        }
        Ok(())
    }

    /// Upload the current image. API failures land in
    /// [`error_message`](Self::error_message), not in the return value.
    pub async fn upload(&mut self, target: UploadTarget) -> Result<(), FlowError> {
        self.apply(FlowEvent::UploadStarted(target))?;
        let (image, equipment) = match &self.flow {
            CaptureFlow::Processing { image, equipment, .. } => (image.clone(), *equipment),
            other => {
                return Err(FlowError::InvalidTransition {
                    state: other.name(),
                    event: "upload",
                })
            }
        };

        let outcome = match target {
            UploadTarget::Workouts => {
                let metadata = workout_metadata(&self.workout_filters, equipment);
                self.queries
                    .upload_workout()
                    .mutate_async(WorkoutUpload { image, metadata })
                    .await
                    .map(TabResults::Workouts)
            }
            UploadTarget::Recipes => self
                .queries
                .upload_recipe()
                .mutate_async(RecipeUpload {
                    image,
                    payload: recipe_payload(&self.ingredients),
                })
                .await
                .map(TabResults::Recipes),
        };

        match outcome {
            Ok(results) => {
                info!(%target, "Upload returned results");
                self.error_message = None;
                self.apply(FlowEvent::UploadSucceeded(results))
            }
            Err(e) => {
                debug!(%target, error = %e, "Upload failed");
                self.error_message = Some(e.to_string());
                self.apply(FlowEvent::UploadFailed)
            }
        }
    }

    pub fn select_tab(&mut self, tab: UploadTarget) -> Result<(), FlowError> {
        self.apply(FlowEvent::TabSelected(tab))
    }

    /// Go back to the camera. The current image is deleted only when this
    /// session created it.
    pub async fn retake(&mut self) -> Result<(), FlowError> {
        self.apply(FlowEvent::Retake)?;
        self.discard_image().await;
        self.error_message = None;
        Ok(())
    }

    /// Delete the image this session wrote, whatever the flow state. A
    /// library photo picked as-is is left alone.
    pub async fn discard_image(&mut self) {
        let owned = self.owned.take();
        self.capture.retake(owned.as_deref()).await;
    }

    pub async fn save_workout(&self, id: &str) -> Result<bool, ApiError> {
        self.queries.save_workout().mutate_async(id.to_string()).await
    }

    pub async fn save_recipe(&self, id: &str) -> Result<bool, ApiError> {
        self.queries.save_recipe().mutate_async(id.to_string()).await
    }

    /// Normalize a fresh camera capture; the raw file is dropped once a
    /// normalized copy exists.
    async fn prepare(&self, raw: &Path) -> PathBuf {
        let image = self.normalizer.normalize_or_original(raw).await;
        if image != raw {
            discard_capture(raw).await;
        }
        image
    }
}
