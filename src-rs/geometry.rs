//! Display/natural coordinate mapping.
//!
//! Two pixel spaces flow through every surface: *display* space, the
//! on-screen render box the user points at, and *natural* space, the source
//! image's intrinsic pixel grid that markers are committed in. The two never
//! mix silently: each gets its own point type, and [`Mapper`] is the only
//! way across.
//!
//! The render pipeline is letterbox-fit (uniform scale, centered) with an
//! optional zoom/pan applied on top for the touch surface. A display point
//! maps to natural space by first undoing zoom/pan, then undoing the fit.

use serde::{Deserialize, Serialize};

/// Zoom bounds for the touch surface. 1x means fit-to-box.
pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 4.0;

/// A point in the on-screen render box, in CSS-style pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: DisplayPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// A point in the source image's intrinsic pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NaturalPoint {
    pub x: f64,
    pub y: f64,
}

impl NaturalPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: NaturalPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Intrinsic pixel size of a decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NaturalSize {
    pub width: u32,
    pub height: u32,
}

impl NaturalSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The on-screen box the image is rendered into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderBox {
    pub width: f64,
    pub height: f64,
}

impl RenderBox {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> DisplayPoint {
        DisplayPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Scale-to-fit placement of a natural-sized image inside a render box:
/// uniform scale on the tighter axis, centered on the looser one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFit {
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl RenderFit {
    pub fn compute(render_box: RenderBox, natural: NaturalSize) -> Self {
        let width = f64::from(natural.width.max(1));
        let height = f64::from(natural.height.max(1));
        let scale = (render_box.width / width).min(render_box.height / height);
        Self {
            scale,
            offset_x: (render_box.width - width * scale) / 2.0,
            offset_y: (render_box.height - height * scale) / 2.0,
        }
    }
}

/// Zoom/pan state for the touch surface.
///
/// `pan_x`/`pan_y` are the unzoomed display-space coordinates of the render
/// box's visible top-left corner, so a display point maps into pre-zoom
/// (content) space as `display / zoom + pan`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl ViewTransform {
    /// Fit-to-box view: 1x zoom, no pan.
    pub fn identity() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn is_zoomed(&self) -> bool {
        self.zoom > MIN_ZOOM + f64::EPSILON
    }

    /// Clamps zoom to [`MIN_ZOOM`]..[`MAX_ZOOM`] and pan so the visible
    /// window never leaves the render box. At 1x the pan collapses to zero.
    pub fn clamped(zoom: f64, pan_x: f64, pan_y: f64, render_box: RenderBox) -> Self {
        let zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let max_pan_x = render_box.width * (1.0 - 1.0 / zoom);
        let max_pan_y = render_box.height * (1.0 - 1.0 / zoom);
        Self {
            zoom,
            pan_x: pan_x.clamp(0.0, max_pan_x),
            pan_y: pan_y.clamp(0.0, max_pan_y),
        }
    }

    /// Undo zoom/pan: display-space point to pre-zoom content space.
    pub fn to_content(&self, p: DisplayPoint) -> DisplayPoint {
        DisplayPoint::new(p.x / self.zoom + self.pan_x, p.y / self.zoom + self.pan_y)
    }

    /// Apply zoom/pan: pre-zoom content point back to display space.
    pub fn to_display(&self, c: DisplayPoint) -> DisplayPoint {
        DisplayPoint::new((c.x - self.pan_x) * self.zoom, (c.y - self.pan_y) * self.zoom)
    }

    /// Rezoom keeping the content under `anchor` stationary, clamps
    /// permitting. Used for tap-to-zoom and the +/- controls.
    pub fn zoom_at(&self, target_zoom: f64, anchor: DisplayPoint, render_box: RenderBox) -> Self {
        let zoom = target_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let focus = self.to_content(anchor);
        Self::clamped(
            zoom,
            focus.x - anchor.x / zoom,
            focus.y - anchor.y / zoom,
            render_box,
        )
    }

    /// Shift the visible window by a drag delta in display pixels. Content
    /// follows the finger, so the window moves against the drag.
    pub fn pan_by(&self, dx: f64, dy: f64, render_box: RenderBox) -> Self {
        Self::clamped(
            self.zoom,
            self.pan_x - dx / self.zoom,
            self.pan_y - dy / self.zoom,
            render_box,
        )
    }
}

/// Maps pointer positions in the render box to natural image pixels and
/// back. Only constructible with a known natural size, so coordinates can
/// never be produced for an image that has not finished decoding.
#[derive(Debug, Clone, Copy)]
pub struct Mapper {
    render_box: RenderBox,
    natural: NaturalSize,
    fit: RenderFit,
}

impl Mapper {
    pub fn new(render_box: RenderBox, natural: NaturalSize) -> Self {
        Self {
            render_box,
            natural,
            fit: RenderFit::compute(render_box, natural),
        }
    }

    pub fn render_box(&self) -> RenderBox {
        self.render_box
    }

    pub fn natural_size(&self) -> NaturalSize {
        self.natural
    }

    pub fn fit(&self) -> RenderFit {
        self.fit
    }

    /// Display point to natural pixels under the given view.
    pub fn to_natural(&self, p: DisplayPoint, view: ViewTransform) -> NaturalPoint {
        let c = view.to_content(p);
        NaturalPoint::new(
            (c.x - self.fit.offset_x) / self.fit.scale,
            (c.y - self.fit.offset_y) / self.fit.scale,
        )
    }

    /// Natural pixels back to a display point under the given view.
    pub fn to_display(&self, p: NaturalPoint, view: ViewTransform) -> DisplayPoint {
        let c = DisplayPoint::new(
            p.x * self.fit.scale + self.fit.offset_x,
            p.y * self.fit.scale + self.fit.offset_y,
        );
        view.to_display(c)
    }

    /// Convert a display-space length (a drag radius) to natural pixels.
    pub fn to_natural_len(&self, display_len: f64, view: ViewTransform) -> f64 {
        display_len / (self.fit.scale * view.zoom)
    }

    /// True when the display point lands on the rendered image itself,
    /// not the letterbox margins around it.
    pub fn hits_image(&self, p: DisplayPoint, view: ViewTransform) -> bool {
        let c = view.to_content(p);
        let w = f64::from(self.natural.width) * self.fit.scale;
        let h = f64::from(self.natural.height) * self.fit.scale;
        c.x >= self.fit.offset_x
            && c.x <= self.fit.offset_x + w
            && c.y >= self.fit.offset_y
            && c.y <= self.fit.offset_y + h
    }

    /// Clamp a natural point into the image bounds. Pointer positions a few
    /// fractional pixels outside (rounding at the box edge) snap to the rim.
    pub fn clamp_natural(&self, p: NaturalPoint) -> NaturalPoint {
        NaturalPoint::new(
            p.x.clamp(0.0, f64::from(self.natural.width)),
            p.y.clamp(0.0, f64::from(self.natural.height)),
        )
    }
}
