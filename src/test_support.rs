//! Shared helpers for tests that talk to an in-process backend.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use serde_json::{json, Value};

use crate::api::FitnessApiClient;
use crate::config::ClientConfig;

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_backend(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn client_for(base_url: &str, timeout: Duration) -> FitnessApiClient {
    let config = ClientConfig::new(base_url, timeout).with_youtube_key("yt-test-key");
    FitnessApiClient::new(&config).unwrap()
}

/// A few JPEG-looking bytes. Enough for upload tests that never decode.
pub fn write_image(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0, 1, 2, 3, 4]).unwrap();
    path
}

pub fn workout_json(id: &str) -> Value {
    json!({
        "id": id, "title": "Dumbbell basics", "durationMinutes": 20,
        "level": "beginner", "equipment": ["dumbbells"]
    })
}

pub fn recipe_json(id: &str) -> Value {
    json!({
        "id": id, "title": "Egg fried rice", "timeMinutes": 15,
        "difficulty": "easy", "calories": 420, "tags": ["quick"]
    })
}
