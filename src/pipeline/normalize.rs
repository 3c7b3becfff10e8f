//! Image normalization before upload.
//!
//! Captures straight off a phone camera are large. Before upload they are
//! bounded to `max_dimension` on their longest edge (aspect ratio preserved)
//! and always re-encoded as JPEG at the configured quality. Normalization is
//! an optimization only: [`ImageNormalizer::normalize_or_original`] falls back
//! to the untouched capture when anything goes wrong.

use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::path::{Path, PathBuf};

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, RgbImage};
use tracing::debug;
use uuid::Uuid;

use crate::config::{DEFAULT_JPEG_QUALITY, MAX_IMAGE_DIMENSION};

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

/// Maximum input image size (in bytes) before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: u64 = 50 * 1024 * 1024; // 50 MB

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image too large: {0} bytes")]
    TooLarge(u64),
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Normalization task failed: {0}")]
    Task(String),
}

/// Size bound and JPEG quality applied to every capture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizeOptions {
    /// Longest edge, in pixels, after normalization.
    pub max_dimension: u32,
    /// JPEG quality in `0.0..=1.0`.
    pub quality: f32,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: MAX_IMAGE_DIMENSION,
            quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl NormalizeOptions {
    /// Quality as the 1..=100 scale the JPEG encoder expects.
    pub fn jpeg_quality(&self) -> u8 {
        let q = if self.quality.is_finite() {
            self.quality.clamp(0.0, 1.0)
        } else {
            DEFAULT_JPEG_QUALITY
        };
        ((q * 100.0).round() as u8).max(1)
    }
}

/// A single resize instruction: the longer side is pinned to the bound and
/// the other side follows the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resize {
    Width(u32),
    Height(u32),
}

impl Resize {
    /// `None` when the image already fits. Square images constrain width.
    pub fn for_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<Self> {
        if width.max(height) <= max_dimension {
            return None;
        }
        if width >= height {
            Some(Resize::Width(max_dimension))
        } else {
            Some(Resize::Height(max_dimension))
        }
    }

    /// Output dimensions for an input of `width` x `height`.
    pub fn apply(&self, width: u32, height: u32) -> (u32, u32) {
        let scale = |other: u32, bound: u32, along: u32| -> u32 {
            ((other as f64 * bound as f64 / along as f64).round() as u32).max(1)
        };
        match *self {
            Resize::Width(w) => (w, scale(height, w, width)),
            Resize::Height(h) => (scale(width, h, height), h),
        }
    }
}

/// Output of a successful normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// Freshly written JPEG, distinct from the source path.
    pub path: PathBuf,
    /// Size of `path` in bytes.
    pub size: u64,
    pub width: u32,
    pub height: u32,
    pub resized: bool,
}

// ═══════════════════════════════════════════════════════════
// Orientation
// ═══════════════════════════════════════════════════════════

/// EXIF orientation (tag 0x0112) of an encoded image, 1 when absent.
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()
        .and_then(|data| {
            data.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
                .and_then(|f| f.value.get_uint(0))
        })
        .unwrap_or(1)
}

/// Rotate / mirror so pixels read upright. Phone portraits come in as 6 or 8.
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

// ═══════════════════════════════════════════════════════════
// ImageNormalizer
// ═══════════════════════════════════════════════════════════

/// Resizes and re-encodes captures into `output_dir`.
#[derive(Clone)]
pub struct ImageNormalizer {
    output_dir: PathBuf,
    options: NormalizeOptions,
}

impl ImageNormalizer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            options: NormalizeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    /// Bound and re-encode `source`. Decoding and encoding run on the
    /// blocking pool.
    pub async fn normalize(&self, source: &Path) -> Result<NormalizedImage, NormalizeError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let dest = self.output_dir.join(format!("{}.jpg", Uuid::new_v4()));

        let source = source.to_path_buf();
        let options = self.options;
        tokio::task::spawn_blocking(move || normalize_file(&source, &dest, options))
        .await
        .map_err(|e| NormalizeError::Task(e.to_string()))?
    }

    /// Normalize, or hand back the original path when normalization fails.
    pub async fn normalize_or_original(&self, source: &Path) -> PathBuf {
        match self.normalize(source).await {
            Ok(normalized) => normalized.path,
            Err(e) => {
                debug!(source = %source.display(), error = %e, "Failed to resize image, uploading original");
                source.to_path_buf()
            }
        }
    }
}

fn normalize_file(
    source: &Path,
    dest: &Path,
    options: NormalizeOptions,
) -> Result<NormalizedImage, NormalizeError> {
    let len = std::fs::metadata(source)?.len();
    if len > MAX_IMAGE_BYTES {
        return Err(NormalizeError::TooLarge(len));
    }

    let bytes = std::fs::read(source)?;
    let img = image::load_from_memory(&bytes).map_err(|e| NormalizeError::Decode(e.to_string()))?;
    let img = apply_orientation(img, read_exif_orientation(&bytes));
    let (orig_w, orig_h) = img.dimensions();

    let resize = Resize::for_dimensions(orig_w, orig_h, options.max_dimension);
    let img = match resize {
        Some(instruction) => {
            let (w, h) = instruction.apply(orig_w, orig_h);
            img.resize_exact(w, h, FilterType::CatmullRom)
        }
        None => img,
    };

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let size = write_jpeg(&rgb, dest, options.jpeg_quality()).inspect_err(|_| {
        let _ = std::fs::remove_file(dest);
    })?;

    debug!(
        original = format!("{orig_w}x{orig_h}"),
        output = format!("{width}x{height}"),
        input_size = len,
        output_size = size,
        "Image normalized for upload"
    );

    Ok(NormalizedImage {
        path: dest.to_path_buf(),
        size,
        width,
        height,
        resized: resize.is_some(),
    })
}

/// Encode to `dest` and return the written size. Flush errors count.
fn write_jpeg(rgb: &RgbImage, dest: &Path, quality: u8) -> Result<u64, NormalizeError> {
    let mut writer = BufWriter::new(File::create(dest)?);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(file.metadata()?.len())
}

// ═══════════════════════════════════════════════════════════
// File helpers
// ═══════════════════════════════════════════════════════════

/// Size of the file at `path`, or 0 when it cannot be read.
pub async fn file_size(path: &Path) -> u64 {
    tokio::fs::metadata(path).await.map(|m| m.len()).unwrap_or(0)
}

/// `data:image/jpeg;base64,...` for inline previews.
pub async fn to_data_uri(path: &Path) -> Result<String, NormalizeError> {
    let bytes = tokio::fs::read(path).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    Ok(format!("data:image/jpeg;base64,{encoded}"))
}
