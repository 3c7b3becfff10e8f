//! Multipart body construction for the image-classification endpoints.

use std::path::Path;

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// Form field carrying the image file.
pub const IMAGE_FIELD: &str = "image";

/// File name used when the path has no final segment.
pub const DEFAULT_FILE_NAME: &str = "upload.jpg";

/// File name and content type announced for the image part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePart {
    pub file_name: String,
    pub mime_type: &'static str,
}

impl ImagePart {
    /// Derive the part header from the local path.
    /// PNG only when the extension says so; everything else is sent as JPEG.
    pub fn for_path(path: &Path) -> Self {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_FILE_NAME)
            .to_string();

        let is_png = Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));

        Self {
            file_name,
            mime_type: if is_png { "image/png" } else { "image/jpeg" },
        }
    }
}

/// Flatten an upload payload into text form fields.
///
/// Arrays (and nested objects) are sent as compact JSON text, strings as-is,
/// numbers and booleans in their display form. Null / absent fields are
/// omitted entirely.
pub fn metadata_fields<T: Serialize>(payload: Option<&T>) -> Vec<(String, String)> {
    let Some(payload) = payload else {
        return Vec::new();
    };

    let object = match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            tracing::debug!(kind = ?other, "Upload payload is not an object, ignoring");
            return Vec::new();
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to serialize upload payload, ignoring");
            return Vec::new();
        }
    };

    object
        .into_iter()
        .filter_map(|(key, value)| field_text(value).map(|text| (key, text)))
        .collect()
}

fn field_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        composite @ (Value::Array(_) | Value::Object(_)) => Some(composite.to_string()),
    }
}

/// Read the image and assemble the multipart form.
pub(crate) async fn build_image_form(
    path: &Path,
    field: &str,
    fields: Vec<(String, String)>,
) -> Result<Form, ApiError> {
    let bytes = tokio::fs::read(path).await.map_err(ApiError::Image)?;
    let header = ImagePart::for_path(path);

    let part = Part::bytes(bytes)
        .file_name(header.file_name)
        .mime_str(header.mime_type)
        .map_err(|e| ApiError::Image(std::io::Error::new(std::io::ErrorKind::InvalidInput, e)))?;

    let form = fields
        .into_iter()
        .fold(Form::new().part(field.to_string(), part), |form, (key, value)| {
            form.text(key, value)
        });

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UploadRecipePayload, UploadWorkoutPayload, WorkoutLevel};

    fn field<'a>(fields: &'a [(String, String)], name: &str) -> Option<&'a str> {
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn workout_metadata_arrays_are_json_and_scalars_are_text() {
        let payload = UploadWorkoutPayload {
            equipment: Some(vec!["bands".into(), "mat".into()]),
            level: Some(WorkoutLevel::Beginner),
            duration_minutes: Some(45),
        };
        let fields = metadata_fields(Some(&payload));

        assert_eq!(field(&fields, "level"), Some("beginner"));
        assert_eq!(field(&fields, "durationMinutes"), Some("45"));
        assert_eq!(field(&fields, "equipment"), Some(r#"["bands","mat"]"#));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn absent_fields_are_omitted() {
        let payload = UploadWorkoutPayload {
            equipment: Some(vec!["dumbbells".into()]),
            ..Default::default()
        };
        let fields = metadata_fields(Some(&payload));
        assert_eq!(fields, vec![("equipment".to_string(), r#"["dumbbells"]"#.to_string())]);
    }

    #[test]
    fn explicit_nulls_are_omitted() {
        let payload = serde_json::json!({ "level": null, "note": "x", "flag": true });
        let fields = metadata_fields(Some(&payload));
        assert_eq!(field(&fields, "level"), None);
        assert_eq!(field(&fields, "note"), Some("x"));
        assert_eq!(field(&fields, "flag"), Some("true"));
    }

    #[test]
    fn no_payload_means_no_fields() {
        assert!(metadata_fields::<UploadRecipePayload>(None).is_empty());
        assert!(metadata_fields(Some(&UploadRecipePayload::default())).is_empty());
    }

    #[test]
    fn empty_array_is_still_sent() {
        let payload = UploadRecipePayload {
            ingredients: Some(vec![]),
        };
        let fields = metadata_fields(Some(&payload));
        assert_eq!(field(&fields, "ingredients"), Some("[]"));
    }

    #[test]
    fn image_part_uses_last_segment() {
        let part = ImagePart::for_path(Path::new("/tmp/captures/photo.jpg"));
        assert_eq!(part.file_name, "photo.jpg");
        assert_eq!(part.mime_type, "image/jpeg");
    }

    #[test]
    fn image_part_png_only_for_png_extension() {
        assert_eq!(ImagePart::for_path(Path::new("/a/b.PNG")).mime_type, "image/png");
        assert_eq!(ImagePart::for_path(Path::new("/a/b.png")).mime_type, "image/png");
        assert_eq!(ImagePart::for_path(Path::new("/a/b.heic")).mime_type, "image/jpeg");
        assert_eq!(ImagePart::for_path(Path::new("/a/png")).mime_type, "image/jpeg");
    }

    #[test]
    fn image_part_falls_back_to_default_name() {
        let part = ImagePart::for_path(Path::new("/"));
        assert_eq!(part.file_name, DEFAULT_FILE_NAME);
        assert_eq!(part.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn build_form_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = build_image_form(&dir.path().join("gone.jpg"), IMAGE_FIELD, Vec::new()).await;
        assert!(matches!(result, Err(ApiError::Image(_))));
    }
}
