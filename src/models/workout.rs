use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::WorkoutLevel;

/// A workout suggestion returned by the backend.
///
/// `level` and `equipment` stay as the backend's strings: its tag set is
/// wider than what the client sends (`mat`, `resistance_bands`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutCard {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
    pub duration_minutes: u32,
    pub level: String,
    #[serde(default)]
    pub equipment: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_part: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_validated_at: Option<DateTime<Utc>>,
}

impl PartialEq for WorkoutCard {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for WorkoutCard {}

/// Optional metadata sent alongside a workout image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadWorkoutPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<WorkoutLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_minimal_card() {
        let card: WorkoutCard = serde_json::from_str(
            r#"{"id":"w1","title":"Dumbbell basics","durationMinutes":20,"level":"beginner","equipment":["dumbbells"]}"#,
        )
        .unwrap();
        assert_eq!(card.id, "w1");
        assert_eq!(card.level, "beginner");
        assert_eq!(card.equipment, vec!["dumbbells".to_string()]);
        assert!(card.youtube_id.is_none());
        assert!(card.last_validated_at.is_none());
    }

    #[test]
    fn deserializes_full_card() {
        let card: WorkoutCard = serde_json::from_str(
            r#"{
                "id":"w2","title":"HIIT","youtubeId":"abc123","durationMinutes":45,
                "level":"advanced","equipment":["bodyweight","bands"],"bodyPart":["legs"],
                "thumbnailUrl":"https://img/1.jpg","channelTitle":"FitTube","viewCount":15400,
                "lastValidatedAt":"2024-05-01T10:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(card.youtube_id.as_deref(), Some("abc123"));
        assert_eq!(card.body_part, Some(vec!["legs".to_string()]));
        assert_eq!(card.view_count, Some(15400));
        assert!(card.last_validated_at.is_some());
    }

    #[test]
    fn accepts_equipment_tags_outside_the_selection_set() {
        let card: WorkoutCard = serde_json::from_str(
            r#"{"id":"w3","title":"Mobility flow","durationMinutes":15,"level":"All Levels","equipment":["mat","resistance_bands"]}"#,
        )
        .unwrap();
        assert_eq!(card.equipment, vec!["mat".to_string(), "resistance_bands".to_string()]);
        assert_eq!(card.level, "All Levels");
    }

    #[test]
    fn identity_is_id() {
        let a: WorkoutCard = serde_json::from_str(
            r#"{"id":"same","title":"A","durationMinutes":10,"level":"beginner"}"#,
        )
        .unwrap();
        let mut b = a.clone();
        b.title = "B".into();
        b.duration_minutes = 99;
        assert_eq!(a, b);
    }

    #[test]
    fn payload_skips_absent_fields() {
        let payload = UploadWorkoutPayload {
            duration_minutes: Some(30),
            ..Default::default()
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "durationMinutes": 30 }));
    }
}
