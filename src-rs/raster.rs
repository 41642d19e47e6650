//! Marker rasterization.
//!
//! Markers are baked into a copy of the source pixels with plain CPU
//! drawing, no GPU or vector layer involved, so the encoded artifact shows
//! exactly what the user saw. Circle selections get a translucent orange
//! disc with a solid stroke; point selections get a smaller solid badge
//! with a "PART" label.

use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgba, RgbaImage};

use crate::selection::Selection;

/// Translucent interior of the circle marker, roughly 30% orange.
pub const MARKER_FILL: Rgba<u8> = Rgba([255, 140, 0, 77]);
/// Solid stroke around both marker kinds.
pub const MARKER_STROKE: Rgba<u8> = Rgba([234, 88, 12, 255]);
/// Solid interior of the point badge.
pub const POINT_FILL: Rgba<u8> = Rgba([255, 140, 0, 255]);
pub const LABEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Point selections render at a fixed natural-pixel badge size.
pub const POINT_MARKER_RADIUS: f64 = 28.0;
pub const POINT_LABEL: &str = "PART";

const STROKE_WIDTH: f64 = 4.0;
const FALLBACK_PAD: f64 = 24.0;
const FALLBACK_BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Draw the marker onto a copy of the source pixels. The source itself is
/// never written to.
pub fn render_marked(source: &RgbaImage, selection: &Selection) -> RgbaImage {
    let mut out = source.clone();
    draw_marker(&mut out, selection);
    out
}

/// Marker-only stand-in for sources whose pixels cannot be read back: the
/// same marker, centered on a white canvas sized to its padded extent.
pub fn render_fallback(selection: &Selection) -> RgbaImage {
    let extent = marker_extent(selection) + FALLBACK_PAD;
    let side = (extent * 2.0).ceil().max(1.0) as u32;
    let mut canvas = RgbaImage::from_pixel(side, side, FALLBACK_BACKGROUND);
    let center = selection.center();
    let mid = f64::from(side) / 2.0;
    let local = translate(selection, mid - center.x, mid - center.y);
    draw_marker(&mut canvas, &local);
    canvas
}

fn draw_marker(img: &mut RgbaImage, selection: &Selection) {
    match *selection {
        Selection::Circle {
            center_x,
            center_y,
            radius,
        } => {
            draw_disc(img, center_x, center_y, radius, MARKER_FILL);
            draw_ring(img, center_x, center_y, radius, STROKE_WIDTH, MARKER_STROKE);
        }
        Selection::Point { x, y } => {
            draw_disc(img, x, y, POINT_MARKER_RADIUS, POINT_FILL);
            draw_ring(img, x, y, POINT_MARKER_RADIUS, STROKE_WIDTH, MARKER_STROKE);
            draw_label(img, POINT_LABEL, x, y, 1, LABEL_COLOR);
        }
    }
}

fn marker_extent(selection: &Selection) -> f64 {
    let radius = match *selection {
        Selection::Circle { radius, .. } => radius,
        Selection::Point { .. } => POINT_MARKER_RADIUS,
    };
    radius + STROKE_WIDTH / 2.0
}

fn translate(selection: &Selection, dx: f64, dy: f64) -> Selection {
    match *selection {
        Selection::Circle {
            center_x,
            center_y,
            radius,
        } => Selection::Circle {
            center_x: center_x + dx,
            center_y: center_y + dy,
            radius,
        },
        Selection::Point { x, y } => Selection::Point {
            x: x + dx,
            y: y + dy,
        },
    }
}

/// Alpha-blend one pixel. Out-of-bounds coordinates are ignored, so callers
/// can draw markers that overhang the canvas edge.
fn blend_pixel(img: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    let (w, h) = img.dimensions();
    if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
        return;
    }
    let alpha = f32::from(color.0[3]) / 255.0;
    if alpha <= 0.0 {
        return;
    }
    let px = img.get_pixel_mut(x as u32, y as u32);
    for c in 0..3 {
        let base = f32::from(px.0[c]);
        let over = f32::from(color.0[c]);
        px.0[c] = (over * alpha + base * (1.0 - alpha)).round() as u8;
    }
    px.0[3] = 255;
}

fn draw_disc(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, color: Rgba<u8>) {
    if radius <= 0.0 {
        return;
    }
    let x_min = (cx - radius).floor() as i64;
    let x_max = (cx + radius).ceil() as i64;
    let y_min = (cy - radius).floor() as i64;
    let y_max = (cy + radius).ceil() as i64;
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            // sample at the pixel center
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            if dx * dx + dy * dy <= radius * radius {
                blend_pixel(img, x, y, color);
            }
        }
    }
}

fn draw_ring(img: &mut RgbaImage, cx: f64, cy: f64, radius: f64, width: f64, color: Rgba<u8>) {
    if radius <= 0.0 {
        return;
    }
    let half = width / 2.0;
    let outer = radius + half;
    let x_min = (cx - outer).floor() as i64;
    let x_max = (cx + outer).ceil() as i64;
    let y_min = (cy - outer).floor() as i64;
    let y_max = (cy + outer).ceil() as i64;
    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let dx = x as f64 + 0.5 - cx;
            let dy = y as f64 + 0.5 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            if (dist - radius).abs() <= half {
                blend_pixel(img, x, y, color);
            }
        }
    }
}

fn draw_label(img: &mut RgbaImage, text: &str, cx: f64, cy: f64, scale: u32, color: Rgba<u8>) {
    let scale = scale.max(1) as i64;
    let glyph = 8 * scale;
    let text_width = glyph * text.chars().count() as i64;
    let origin_x = (cx - text_width as f64 / 2.0).round() as i64;
    let origin_y = (cy - glyph as f64 / 2.0).round() as i64;
    for (index, ch) in text.chars().enumerate() {
        let Some(bitmap) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let char_x = origin_x + index as i64 * glyph;
        for (row, bits) in bitmap.iter().enumerate() {
            for col in 0..8i64 {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        blend_pixel(
                            img,
                            char_x + col * scale + sx,
                            origin_y + row as i64 * scale + sy,
                            color,
                        );
                    }
                }
            }
        }
    }
}
