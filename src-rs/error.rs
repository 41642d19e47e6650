//! Failure taxonomy for the selection/capture pipeline.
//!
//! Only two failures ever reach the user: a source image that never loads
//! and an encoder that gives up. Cross-origin pixel taint and storage quota
//! overruns are absorbed inside the pipeline and show up solely as metadata
//! tags on the produced artifact.

use thiserror::Error;

/// Failures surfaced to the caller. Both leave the surface closable; the
/// host page stays functional.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The source image never reached a ready state. User-retriable.
    #[error("image failed to load: {0}")]
    ImageLoad(#[source] image::ImageError),

    /// The encoder itself failed; there is no further fallback.
    #[error("image encoding failed: {0}")]
    Encoding(String),
}

/// Pixel read-back was blocked because the source is cross-origin without
/// permissive access headers. Recovered automatically by the marker-only
/// fallback render; never user-visible.
#[derive(Debug, Clone, Copy, Error)]
#[error("pixel read-back blocked: source image is cross-origin")]
pub struct UnreadablePixels;

/// The session store cannot hold the payload. Recovered by the
/// recompress-then-direct-handoff chain.
#[derive(Debug, Clone, Copy, Error)]
#[error("session storage quota exceeded: need {needed} bytes, {available} available")]
pub struct QuotaExceeded {
    pub needed: usize,
    pub available: usize,
}

/// Query-string transport failures. The stored path does not share these;
/// a caller getting `UrlTooLong` simply uses the store instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("handoff URL would be {length} characters, over the {limit} limit")]
    UrlTooLong { length: usize, limit: usize },

    #[error("handoff query string is missing or malformed: {0}")]
    Malformed(String),
}
