//! Selection geometry and the metadata that travels with a capture.
//!
//! Everything here is wire-shaped: the JSON forms persist in the handoff
//! store and in sidecar files, so field names are pinned to camelCase and
//! the selection enum is tagged with `kind`.

use serde::{Deserialize, Serialize};

use crate::geometry::NaturalPoint;

/// A committed mark on the product photo, in natural-pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Selection {
    #[serde(rename_all = "camelCase")]
    Circle {
        center_x: f64,
        center_y: f64,
        radius: f64,
    },
    #[serde(rename_all = "camelCase")]
    Point { x: f64, y: f64 },
}

impl Selection {
    pub fn circle(center: NaturalPoint, radius: f64) -> Self {
        Self::Circle {
            center_x: center.x,
            center_y: center.y,
            radius,
        }
    }

    pub fn point(at: NaturalPoint) -> Self {
        Self::Point { x: at.x, y: at.y }
    }

    pub fn center(&self) -> NaturalPoint {
        match *self {
            Self::Circle {
                center_x, center_y, ..
            } => NaturalPoint::new(center_x, center_y),
            Self::Point { x, y } => NaturalPoint::new(x, y),
        }
    }

    /// Geometry sanity gate applied before a selection is committed:
    /// coordinates finite, circle radius strictly positive.
    pub fn is_valid(&self) -> bool {
        match *self {
            Self::Circle {
                center_x,
                center_y,
                radius,
            } => center_x.is_finite() && center_y.is_finite() && radius.is_finite() && radius > 0.0,
            Self::Point { x, y } => x.is_finite() && y.is_finite(),
        }
    }
}

/// The gesture vocabulary that produced a selection. Serialized verbatim
/// into metadata so the receiving workflow can tell the paths apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionMethod {
    CircleDraw,
    TapPoint,
    ZoomTap,
    FileUpload,
}

impl SelectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CircleDraw => "circle-draw",
            Self::TapPoint => "tap-point",
            Self::ZoomTap => "zoom-tap",
            Self::FileUpload => "file-upload",
        }
    }
}

/// Everything the receiving workflow needs to interpret the image:
/// what was marked, where it came from, and which degradations fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// `None` for file uploads, which carry no marked geometry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    /// RFC 3339 capture time.
    pub timestamp: String,
    pub source_path: String,
    pub selection_method: SelectionMethod,
    /// True when pixel read-back was blocked and the artifact is the
    /// synthetic marker-only render.
    pub is_fallback_render: bool,
    /// True when a size-ceiling or quota degradation re-encoded the image.
    pub is_compressed: bool,
}

impl SelectionMetadata {
    /// Canonical JSON form, as stored next to the image. Plain struct of
    /// strings, bools and finite-or-null numbers; serialization cannot fail.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("metadata serializes")
    }
}

/// The finished product of a confirmed selection: an encoded image ready to
/// transmit plus the metadata describing it. The two only ever travel
/// together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturedArtifact {
    /// `data:` URI, JPEG for rendered captures, original format for uploads.
    pub encoded_image: String,
    pub metadata: SelectionMetadata,
}
