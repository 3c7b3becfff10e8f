//! FitSnap command line.
//!
//! Runs the capture pipeline against an image file: the file stands in for
//! the camera, goes through normalization and upload, and the returned cards
//! are printed.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};

use fitsnap_lib::api::{ApiError, FitnessApiClient};
use fitsnap_lib::config::{self, ClientConfig};
use fitsnap_lib::format::{capitalize, format_difficulty, format_minutes, format_number, format_tag};
use fitsnap_lib::models::{
    EquipmentSelection, PermissionKind, RecipeCard, WorkoutCard, WorkoutLevel,
};
use fitsnap_lib::permissions::{AlwaysGranted, PermissionGate, PermissionProvider};
use fitsnap_lib::pipeline::{
    CaptureFlow, CapturePipeline, CaptureResults, CaptureSession, FileCamera, FileGallery, FlowError,
    ImageNormalizer, UploadTarget,
};
use fitsnap_lib::preferences::PreferenceStore;
use fitsnap_lib::query::{FitnessQueries, QueryCache};

/// Turn a photo of your equipment or ingredients into workouts and recipes
#[derive(Parser, Debug)]
#[command(name = "fitsnap", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find workouts for a photo of your equipment
    Workouts {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// bodyweight, dumbbells or mat. Remembered for next time.
        #[arg(long)]
        equipment: Option<EquipmentSelection>,

        /// beginner, intermediate or advanced
        #[arg(long)]
        level: Option<WorkoutLevel>,

        /// Target workout length
        #[arg(long, value_name = "MINUTES")]
        duration: Option<u32>,
    },
    /// Find recipes for a photo of your ingredients
    Recipes {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Ingredient you already know you have (repeatable)
        #[arg(long = "ingredient", value_name = "NAME")]
        ingredients: Vec<String>,
    },
    /// Save a workout to your library
    SaveWorkout { id: String },
    /// Save a recipe to your library
    SaveRecipe { id: String },
    /// List saved workouts or recipes
    Saved {
        #[arg(value_enum)]
        kind: SavedKind,
    },
    /// Show stored preferences
    Prefs {
        /// Forget the remembered equipment choice
        #[arg(long)]
        clear_equipment: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SavedKind {
    Workouts,
    Recipes,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    Flow(#[from] FlowError),
    #[error("{0}")]
    Upload(String),
    #[error("Unable to read {}", .0.display())]
    Capture(PathBuf),
}

#[tokio::main]
async fn main() -> ExitCode {
    fitsnap_lib::init_tracing();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    let prefs = open_preferences();

    match command {
        Command::Workouts {
            image,
            equipment,
            level,
            duration,
        } => {
            let session = build_session(&image, prefs)?.with_workout_filters(level, duration);
            let results = capture_and_upload(session, &image, equipment, UploadTarget::Workouts).await?;
            print_workouts(&results.workouts);
        }
        Command::Recipes { image, ingredients } => {
            let session = build_session(&image, prefs)?.with_ingredients(ingredients);
            let results = capture_and_upload(session, &image, None, UploadTarget::Recipes).await?;
            print_recipes(&results.recipes);
        }
        Command::SaveWorkout { id } => {
            let saved = queries()?.save_workout().mutate_async(id.clone()).await?;
            print_saved("Workout", &id, saved);
        }
        Command::SaveRecipe { id } => {
            let saved = queries()?.save_recipe().mutate_async(id.clone()).await?;
            print_saved("Recipe", &id, saved);
        }
        Command::Saved { kind } => {
            let queries = queries()?;
            match kind {
                SavedKind::Workouts => {
                    let state = queries.saved_workouts().fetch().await;
                    if let Some(e) = state.error {
                        return Err(CliError::Upload(e.to_string()));
                    }
                    print_workouts(state.data.as_deref().map(Vec::as_slice).unwrap_or_default());
                }
                SavedKind::Recipes => {
                    let state = queries.saved_recipes().fetch().await;
                    if let Some(e) = state.error {
                        return Err(CliError::Upload(e.to_string()));
                    }
                    print_recipes(state.data.as_deref().map(Vec::as_slice).unwrap_or_default());
                }
            }
        }
        Command::Prefs { clear_equipment } => {
            if clear_equipment {
                prefs.clear_equipment().await;
            }
            print_prefs(&prefs).await;
        }
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Wiring
// ═══════════════════════════════════════════════════════════

/// Preferences are advisory: an unusable database degrades to memory.
fn open_preferences() -> PreferenceStore {
    let path = config::preferences_db_path();
    match PreferenceStore::open(&path) {
        Ok(prefs) => prefs,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Preferences unavailable, using memory");
            PreferenceStore::in_memory()
        }
    }
}

fn queries() -> Result<FitnessQueries, CliError> {
    let client = FitnessApiClient::new(&ClientConfig::from_env())?;
    Ok(FitnessQueries::new(Arc::new(client), Arc::new(QueryCache::new())))
}

fn build_session(image: &Path, prefs: PreferenceStore) -> Result<CaptureSession, CliError> {
    let provider: Arc<dyn PermissionProvider> = Arc::new(AlwaysGranted);
    let captures = config::captures_dir();

    Ok(CaptureSession::new(
        PermissionGate::new(PermissionKind::Camera, provider.clone(), prefs.clone()),
        PermissionGate::new(PermissionKind::Gallery, provider, prefs.clone()),
        CapturePipeline::new(
            Arc::new(FileCamera::new(image, &captures)),
            Arc::new(FileGallery::new(None)),
        ),
        ImageNormalizer::new(captures),
        queries()?,
        prefs,
    ))
}

/// Shutter, equipment sheet, upload. The capture is discarded on every
/// path out.
async fn capture_and_upload(
    mut session: CaptureSession,
    source: &Path,
    equipment: Option<EquipmentSelection>,
    target: UploadTarget,
) -> Result<CaptureResults, CliError> {
    session.start().await?;
    if !session.take_photo().await? {
        return Err(CliError::Capture(source.to_path_buf()));
    }

    let outcome = upload_capture(&mut session, equipment, target).await;
    session.discard_image().await;
    outcome
}

async fn upload_capture(
    session: &mut CaptureSession,
    equipment: Option<EquipmentSelection>,
    target: UploadTarget,
) -> Result<CaptureResults, CliError> {
    if let Some(image) = session.flow().image() {
        tracing::debug!(image = %image.display(), "Prepared capture");
    }

    session.choose_equipment(equipment).await?;
    session.upload(target).await?;

    match (session.flow(), session.error_message()) {
        (_, Some(message)) => Err(CliError::Upload(message.to_string())),
        (CaptureFlow::Results { results, .. }, None) => Ok(results.clone()),
        (other, None) => Err(CliError::Flow(FlowError::InvalidTransition {
            state: other.name(),
            event: "show results",
        })),
    }
}

// ═══════════════════════════════════════════════════════════
// Output
// ═══════════════════════════════════════════════════════════

fn print_workouts(cards: &[WorkoutCard]) {
    if cards.is_empty() {
        println!("No workouts found.");
        return;
    }
    for card in cards {
        let equipment: Vec<String> = card.equipment.iter().map(|e| format_tag(e)).collect();
        println!("{}  [{}]", card.title, card.id);
        println!(
            "  {} · {} · {}",
            format_minutes(Some(card.duration_minutes)),
            format_tag(&card.level),
            if equipment.is_empty() {
                "No equipment".to_string()
            } else {
                equipment.join(", ")
            }
        );
        if let Some(channel) = &card.channel_title {
            println!("  {channel} · {} views", format_number(card.view_count));
        }
        if let Some(video) = &card.youtube_id {
            println!("  https://www.youtube.com/watch?v={video}");
        }
    }
}

fn print_recipes(cards: &[RecipeCard]) {
    if cards.is_empty() {
        println!("No recipes found.");
        return;
    }
    for card in cards {
        println!("{}  [{}]", card.title, card.id);
        let calories = card
            .calories
            .map(|c| format!(" · {c} kcal"))
            .unwrap_or_default();
        println!(
            "  {} · {}{calories}",
            format_minutes(Some(card.time_minutes)),
            format_difficulty(Some(&card.difficulty)),
        );
        if let Some(summary) = &card.nutrition_summary {
            let parts: Vec<String> = summary.iter().map(|(k, v)| format!("{k} {v}")).collect();
            println!("  {}", parts.join(", "));
        }
        if let Some(tags) = card.tags.as_ref().filter(|t| !t.is_empty()) {
            println!("  #{}", tags.join(" #"));
        }
    }
}

fn print_saved(kind: &str, id: &str, saved: bool) {
    if saved {
        println!("{kind} {id} saved to your library.");
    } else {
        println!("{kind} {id} was not saved.");
    }
}

async fn print_prefs(prefs: &PreferenceStore) {
    let show = |value: Option<String>| value.unwrap_or_else(|| "not set".to_string());
    println!(
        "Equipment: {}",
        show(prefs.read_equipment().await.map(|e| capitalize(e.as_str())))
    );
    for kind in PermissionKind::all() {
        println!(
            "{} permission: {}",
            capitalize(kind.as_str()),
            show(prefs.read_permission(*kind).await.map(|s| s.to_string()))
        );
    }
}
