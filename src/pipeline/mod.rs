//! Capture-to-results pipeline.
//!
//! Camera or gallery produces a local image, the normalizer bounds and
//! re-encodes it, and the session uploads it and keeps the results per tab.

pub mod capture;
pub mod flow;
pub mod normalize;

pub use capture::{
    discard_capture, CameraDevice, CaptureError, CapturePipeline, FileCamera, FileGallery,
    GalleryPick, GalleryPicker,
};
pub use flow::{
    CaptureFlow, CaptureResults, CaptureSession, FlowError, FlowEvent, TabResults, UploadTarget,
    GALLERY_PERMISSION_MESSAGE,
};
pub use normalize::{
    file_size, to_data_uri, ImageNormalizer, NormalizeError, NormalizeOptions, NormalizedImage,
};
