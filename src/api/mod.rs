//! Backend client for the FitSnap REST API.
//!
//! One explicitly constructed [`FitnessApiClient`] owns the HTTP connection
//! pool, default headers and timeout. Image uploads are sent as multipart
//! forms; every failure is normalized into an [`ApiError`] whose `Display`
//! is the message shown to the user.

pub mod client;
pub mod error;
pub mod form;

pub use client::{user_agent, FitnessApiClient, YOUTUBE_KEY_HEADER};
pub use error::ApiError;
pub use form::{metadata_fields, ImagePart, DEFAULT_FILE_NAME, IMAGE_FIELD};
