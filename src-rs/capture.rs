//! Capture pipeline: render the marker, encode, degrade if oversized.
//!
//! The pipeline is a ladder of graceful degradations. Readable pixels give
//! the real photo with the marker baked in; tainted pixels give the
//! marker-only stand-in; payloads over the size ceiling are re-encoded
//! smaller. Every rung is tagged in the artifact metadata, never silent.

use std::io::Cursor;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::Utc;
use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbImage, RgbaImage};
use log::{debug, warn};

use crate::error::CaptureError;
use crate::raster;
use crate::selection::{CapturedArtifact, Selection, SelectionMetadata, SelectionMethod};
use crate::source::SourceImage;

pub const DATA_URI_JPEG_PREFIX: &str = "data:image/jpeg;base64,";

/// Tuning for the encode/degrade ladder. The defaults match the production
/// handoff limits; tests and the CLI can override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOptions {
    /// Baseline JPEG quality for the first encode.
    pub jpeg_quality: u8,
    /// Maximum data-URI length, in characters, before degrading.
    pub size_ceiling: usize,
    /// Long-edge cap for the degraded re-encode.
    pub degrade_max_dimension: u32,
    pub degrade_quality: u8,
    /// Harsher second step used by the storage-quota retry.
    pub retry_max_dimension: u32,
    pub retry_quality: u8,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            size_ceiling: 500_000,
            degrade_max_dimension: 800,
            degrade_quality: 60,
            retry_max_dimension: 480,
            retry_quality: 45,
        }
    }
}

/// What a confirmed surface hands to the pipeline.
#[derive(Debug, Clone)]
pub enum CaptureSubject {
    /// Render this marker onto the source and encode the result.
    Marked(Selection),
    /// The user's own photo; the bytes are the artifact, no marker pass.
    Upload(Vec<u8>),
}

#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub subject: CaptureSubject,
    pub method: SelectionMethod,
    pub product_name: Option<String>,
    pub source_path: String,
}

/// Run the full pipeline for one confirmed request.
pub fn capture(
    source: &SourceImage,
    request: &CaptureRequest,
    opts: &CaptureOptions,
) -> Result<CapturedArtifact, CaptureError> {
    match &request.subject {
        CaptureSubject::Marked(selection) => capture_marked(source, *selection, request, opts),
        CaptureSubject::Upload(bytes) => {
            upload_artifact(bytes, request.product_name.clone(), &request.source_path)
        }
    }
}

fn capture_marked(
    source: &SourceImage,
    selection: Selection,
    request: &CaptureRequest,
    opts: &CaptureOptions,
) -> Result<CapturedArtifact, CaptureError> {
    let (rendered, fallback) = match source.read_pixels() {
        Ok(pixels) => (raster::render_marked(pixels, &selection), false),
        Err(err) => {
            warn!("{err}; rendering marker-only stand-in");
            (raster::render_fallback(&selection), true)
        }
    };

    let mut encoded = encode_jpeg_data_uri(&rendered, opts.jpeg_quality)?;
    let mut compressed = false;
    if encoded.len() > opts.size_ceiling {
        debug!(
            "payload {} chars over the {} ceiling, re-encoding at {}px/q{}",
            encoded.len(),
            opts.size_ceiling,
            opts.degrade_max_dimension,
            opts.degrade_quality
        );
        let reduced = shrink_to_fit(&rendered, opts.degrade_max_dimension);
        encoded = encode_jpeg_data_uri(&reduced, opts.degrade_quality)?;
        compressed = true;
    }

    Ok(CapturedArtifact {
        encoded_image: encoded,
        metadata: SelectionMetadata {
            product_name: request.product_name.clone(),
            selection: Some(selection),
            timestamp: Utc::now().to_rfc3339(),
            source_path: request.source_path.clone(),
            selection_method: request.method,
            is_fallback_render: fallback,
            is_compressed: compressed,
        },
    })
}

/// Wrap the user's own photo as the artifact. The bytes pass through
/// verbatim in their original format; only decodability is checked, so
/// corrupt files bounce here and not downstream.
pub fn upload_artifact(
    bytes: &[u8],
    product_name: Option<String>,
    source_path: &str,
) -> Result<CapturedArtifact, CaptureError> {
    let format = image::guess_format(bytes).map_err(CaptureError::ImageLoad)?;
    image::load_from_memory(bytes).map_err(CaptureError::ImageLoad)?;
    let encoded = format!("data:{};base64,{}", mime_for(format), BASE64.encode(bytes));
    Ok(CapturedArtifact {
        encoded_image: encoded,
        metadata: SelectionMetadata {
            product_name,
            selection: None,
            timestamp: Utc::now().to_rfc3339(),
            source_path: source_path.to_string(),
            selection_method: SelectionMethod::FileUpload,
            is_fallback_render: false,
            is_compressed: false,
        },
    })
}

/// One more deterministic size step, used when the handoff store rejects
/// the artifact. Works on any of our data-URI formats; the result is
/// always JPEG.
pub fn recompress_artifact(
    artifact: &CapturedArtifact,
    opts: &CaptureOptions,
) -> Result<CapturedArtifact, CaptureError> {
    let (_, bytes) = decode_data_uri(&artifact.encoded_image)?;
    let pixels = image::load_from_memory(&bytes)
        .map_err(CaptureError::ImageLoad)?
        .to_rgba8();
    let reduced = shrink_to_fit(&pixels, opts.retry_max_dimension);
    let encoded = encode_jpeg_data_uri(&reduced, opts.retry_quality)?;
    let mut metadata = artifact.metadata.clone();
    metadata.is_compressed = true;
    Ok(CapturedArtifact {
        encoded_image: encoded,
        metadata,
    })
}

/// Split a `data:` URI into its MIME type and decoded bytes.
pub fn decode_data_uri(encoded: &str) -> Result<(String, Vec<u8>), CaptureError> {
    let rest = encoded
        .strip_prefix("data:")
        .ok_or_else(|| CaptureError::Encoding("artifact payload is not a data URI".into()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| CaptureError::Encoding("artifact payload is not base64".into()))?;
    let bytes = BASE64
        .decode(payload)
        .map_err(|err| CaptureError::Encoding(format!("artifact base64: {err}")))?;
    Ok((mime.to_string(), bytes))
}

fn encode_jpeg_data_uri(image: &RgbaImage, quality: u8) -> Result<String, CaptureError> {
    // JPEG carries no alpha; markers were already composited
    let rgb: RgbImage = image.convert();
    let mut cursor = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
    encoder
        .write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| CaptureError::Encoding(err.to_string()))?;
    Ok(format!(
        "{DATA_URI_JPEG_PREFIX}{}",
        BASE64.encode(cursor.get_ref())
    ))
}

/// Cap the long edge at `max_dimension`, preserving aspect ratio. Images
/// already inside the cap come back unchanged.
fn shrink_to_fit(image: &RgbaImage, max_dimension: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    let long = w.max(h);
    if long <= max_dimension {
        return image.clone();
    }
    let scale = f64::from(max_dimension) / f64::from(long);
    let nw = ((f64::from(w) * scale).round() as u32).max(1);
    let nh = ((f64::from(h) * scale).round() as u32).max(1);
    imageops::resize(image, nw, nh, FilterType::Lanczos3)
}

fn mime_for(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        _ => "application/octet-stream",
    }
}
