//! FitSnap queries and mutations over the shared [`QueryCache`].

use std::path::PathBuf;
use std::sync::Arc;

use futures_util::FutureExt;

use super::cache::{Fetcher, Mutation, Query, QueryCache, QueryKey};
use crate::api::FitnessApiClient;
use crate::models::{RecipeCard, UploadRecipePayload, UploadWorkoutPayload, WorkoutCard};

/// Cache key for the saved-workouts list.
pub fn saved_workouts_key() -> QueryKey {
    QueryKey::new(&["workouts", "saved"])
}

/// Cache key for the saved-recipes list.
pub fn saved_recipes_key() -> QueryKey {
    QueryKey::new(&["recipes", "saved"])
}

/// Input to the workout upload mutation.
#[derive(Debug, Clone)]
pub struct WorkoutUpload {
    pub image: PathBuf,
    pub metadata: Option<UploadWorkoutPayload>,
}

/// Input to the recipe upload mutation.
#[derive(Debug, Clone)]
pub struct RecipeUpload {
    pub image: PathBuf,
    pub payload: Option<UploadRecipePayload>,
}

/// Entry point for every server-state operation the app performs.
#[derive(Clone)]
pub struct FitnessQueries {
    client: Arc<FitnessApiClient>,
    cache: Arc<QueryCache>,
}

impl FitnessQueries {
    pub fn new(client: Arc<FitnessApiClient>, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn saved_workouts(&self) -> Query<Vec<WorkoutCard>> {
        let client = Arc::clone(&self.client);
        let fetcher: Fetcher<Vec<WorkoutCard>> = Arc::new(move || {
            let client = Arc::clone(&client);
            async move { client.get_saved_workouts().await }.boxed()
        });
        self.cache.query(saved_workouts_key(), fetcher)
    }

    pub fn saved_recipes(&self) -> Query<Vec<RecipeCard>> {
        let client = Arc::clone(&self.client);
        let fetcher: Fetcher<Vec<RecipeCard>> = Arc::new(move || {
            let client = Arc::clone(&client);
            async move { client.get_saved_recipes().await }.boxed()
        });
        self.cache.query(saved_recipes_key(), fetcher)
    }

    pub fn upload_workout(&self) -> Mutation<WorkoutUpload, Vec<WorkoutCard>> {
        let client = Arc::clone(&self.client);
        Mutation::new(Arc::new(move |input: WorkoutUpload| {
            let client = Arc::clone(&client);
            async move {
                client
                    .upload_workout_image(&input.image, input.metadata.as_ref())
                    .await
            }
            .boxed()
        }))
    }

    pub fn upload_recipe(&self) -> Mutation<RecipeUpload, Vec<RecipeCard>> {
        let client = Arc::clone(&self.client);
        Mutation::new(Arc::new(move |input: RecipeUpload| {
            let client = Arc::clone(&client);
            async move {
                client
                    .upload_recipe_image(&input.image, input.payload.as_ref())
                    .await
            }
            .boxed()
        }))
    }

    /// Save a workout by id. Does not refresh the saved list on its own.
    pub fn save_workout(&self) -> Mutation<String, bool> {
        let client = Arc::clone(&self.client);
        Mutation::new(Arc::new(move |id: String| {
            let client = Arc::clone(&client);
            async move { client.save_workout(&id).await }.boxed()
        }))
    }

    pub fn save_recipe(&self) -> Mutation<String, bool> {
        let client = Arc::clone(&self.client);
        Mutation::new(Arc::new(move |id: String| {
            let client = Arc::clone(&client);
            async move { client.save_recipe(&id).await }.boxed()
        }))
    }
}
