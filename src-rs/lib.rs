//! Part-selection and image-capture pipeline.
//!
//! A customer marks the part of a product photo they are asking about:
//! drag a circle around it, tap it, or zoom-and-tap on touch screens. The
//! marker is rasterized onto a copy of the photo, encoded as a compact
//! JPEG data URI, and handed to the contact workflow through a
//! session-scoped store, degrading gracefully when pixels are unreadable,
//! the payload is oversized, or the store is full.
//!
//! The flow end to end:
//!
//! 1. [`source::SourceImage`] loads the photo and fixes the pixel policy.
//! 2. A surface in [`surfaces`] turns gestures into a [`selection::Selection`]
//!    via [`geometry::Mapper`], guarded by [`state::SelectionMachine`].
//! 3. [`capture::capture`] renders the marker ([`raster`]) and encodes it.
//! 4. [`store::deliver`] parks the artifact for the contact workflow, or
//!    hands it straight back when quota is exhausted; [`transport`] covers
//!    the tiny-payload query-string path.

pub mod capture;
pub mod error;
pub mod geometry;
pub mod raster;
pub mod selection;
pub mod source;
pub mod state;
pub mod store;
pub mod surfaces;
pub mod transport;

pub use capture::{
    capture, decode_data_uri, recompress_artifact, upload_artifact, CaptureOptions,
    CaptureRequest, CaptureSubject,
};
pub use error::{CaptureError, QuotaExceeded, TransportError, UnreadablePixels};
pub use geometry::{
    DisplayPoint, Mapper, NaturalPoint, NaturalSize, RenderBox, ViewTransform, MAX_ZOOM, MIN_ZOOM,
};
pub use selection::{CapturedArtifact, Selection, SelectionMetadata, SelectionMethod};
pub use source::{PixelAccess, SourceImage};
pub use state::{GestureEvent, InteractionState, SelectionMachine, MIN_DRAG_RADIUS};
pub use store::{deliver, Delivery, HandoffStore, SessionStore, IMAGE_KEY, METADATA_KEY};
pub use surfaces::{PreciseSurface, SurfaceCore, TapOutcome, TapSurface, TouchSurface};
pub use transport::{build_handoff_url, parse_handoff_query, MAX_URL_LENGTH};
