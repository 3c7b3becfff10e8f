use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::form::{build_image_form, metadata_fields, IMAGE_FIELD};
use super::ApiError;
use crate::config::ClientConfig;
use crate::models::{
    ApiResponse, RecipeCard, SaveRecipeRequest, SaveResult, SaveWorkoutRequest,
    UploadRecipePayload, UploadWorkoutPayload, WorkoutCard,
};

const WORKOUTS_FROM_IMAGE: &str = "/api/v1/workouts/from-image";
const RECIPES_FROM_IMAGE: &str = "/api/v1/recipes/from-image";
const SAVE_WORKOUT: &str = "/api/v1/workouts/save";
const SAVE_RECIPE: &str = "/api/v1/recipes/save";
const SAVED_WORKOUTS: &str = "/api/v1/workouts/saved";
const SAVED_RECIPES: &str = "/api/v1/recipes/saved";

/// Header carrying the key for the backend's video-search integration.
pub const YOUTUBE_KEY_HEADER: &str = "X-YouTube-Key";

/// User agent announced on every request, e.g. `FitSnapMobile/linux`.
pub fn user_agent() -> String {
    format!("FitSnapMobile/{}", std::env::consts::OS)
}

/// HTTP client for the FitSnap backend.
///
/// Construct once from a [`ClientConfig`] and pass it by reference (or in an
/// `Arc`) to whatever needs it. Every call carries the configured timeout and
/// is attempted exactly once.
#[derive(Clone)]
pub struct FitnessApiClient {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl FitnessApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&config.youtube_api_key)
            .map_err(|e| ApiError::Setup(format!("invalid YouTube key header: {e}")))?;
        headers.insert(YOUTUBE_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(user_agent())
            .default_headers(headers)
            .build()
            .map_err(|e| ApiError::Setup(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    // ── Image classification ─────────────────────────────

    /// Upload a workout photo and return matching workout cards.
    pub async fn upload_workout_image(
        &self,
        image: &Path,
        metadata: Option<&UploadWorkoutPayload>,
    ) -> Result<Vec<WorkoutCard>, ApiError> {
        let form = build_image_form(image, IMAGE_FIELD, metadata_fields(metadata)).await?;
        let request = self.request(Method::POST, WORKOUTS_FROM_IMAGE).multipart(form);
        self.execute(request, Method::POST, WORKOUTS_FROM_IMAGE).await
    }

    /// Upload an ingredients photo and return matching recipe cards.
    pub async fn upload_recipe_image(
        &self,
        image: &Path,
        payload: Option<&UploadRecipePayload>,
    ) -> Result<Vec<RecipeCard>, ApiError> {
        let form = build_image_form(image, IMAGE_FIELD, metadata_fields(payload)).await?;
        let request = self.request(Method::POST, RECIPES_FROM_IMAGE).multipart(form);
        self.execute(request, Method::POST, RECIPES_FROM_IMAGE).await
    }

    // ── Saved items ──────────────────────────────────────

    pub async fn save_workout(&self, workout_id: &str) -> Result<bool, ApiError> {
        let result: SaveResult = self
            .post_json(SAVE_WORKOUT, &SaveWorkoutRequest { workout_id })
            .await?;
        Ok(result.success)
    }

    pub async fn save_recipe(&self, recipe_id: &str) -> Result<bool, ApiError> {
        let result: SaveResult = self
            .post_json(SAVE_RECIPE, &SaveRecipeRequest { recipe_id })
            .await?;
        Ok(result.success)
    }

    pub async fn get_saved_workouts(&self) -> Result<Vec<WorkoutCard>, ApiError> {
        self.get_json(SAVED_WORKOUTS).await
    }

    pub async fn get_saved_recipes(&self) -> Result<Vec<RecipeCard>, ApiError> {
        self.get_json(SAVED_RECIPES).await
    }

    // ── Plumbing ─────────────────────────────────────────

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}{}", self.base_url, path))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.request(Method::GET, path);
        self.execute(request, Method::GET, path).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.request(Method::POST, path).json(body);
        self.execute(request, Method::POST, path).await
    }

    /// Send, normalize failures, and unwrap the `data` field of the envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        method: Method,
        path: &str,
    ) -> Result<T, ApiError> {
        tracing::debug!(%method, url = %format!("{}{}", self.base_url, path), "API request");

        let response = request.send().await.map_err(|e| {
            tracing::debug!(%method, path, error = %e, "API transport failure");
            ApiError::from_transport(&e)
        })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_transport(&e))?;

        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "API request rejected");
            return Err(ApiError::from_status(status, &body));
        }

        let envelope: ApiResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(%method, path, error = %e, "API response did not match envelope");
            ApiError::Decode(e.to_string())
        })?;

        Ok(envelope.data)
    }
}
