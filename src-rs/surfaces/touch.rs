//! Touch surface: zoom for aim, tap to mark.
//!
//! Fat fingers cannot place a precise point at fit-to-box scale, so the
//! first tap zooms in around the finger and the next tap, now on a 2.5x
//! view, commits the marker and snaps back out. Manual +/- controls and
//! drag panning cover the in-between adjustments.

use log::debug;

use crate::capture::CaptureRequest;
use crate::error::CaptureError;
use crate::geometry::{DisplayPoint, Mapper, NaturalSize, RenderBox, ViewTransform};
use crate::selection::{CapturedArtifact, Selection, SelectionMethod};
use crate::state::{GestureEvent, InteractionState};

use super::SurfaceCore;

/// Zoom applied by the first tap.
pub const TAP_ZOOM: f64 = 2.5;
/// Increment of the manual +/- controls.
pub const ZOOM_STEP: f64 = 0.5;

/// What a tap did, so the host can animate accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Zoomed in around the finger; no mark yet.
    Zoomed,
    /// Committed a point selection and snapped the view back out.
    Marked,
    /// Landed on the letterbox or arrived while busy.
    Ignored,
}

#[derive(Debug)]
pub struct TouchSurface {
    core: SurfaceCore,
    view: ViewTransform,
}

impl TouchSurface {
    pub fn new(
        render_box: RenderBox,
        natural: NaturalSize,
        product_name: Option<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            core: SurfaceCore::new(
                Mapper::new(render_box, natural),
                SelectionMethod::ZoomTap,
                product_name,
                source_path.into(),
            ),
            view: ViewTransform::identity(),
        }
    }

    pub fn view(&self) -> ViewTransform {
        self.view
    }

    /// First tap zooms in around the finger; a tap while zoomed commits
    /// the point under it and returns to the fit view.
    pub fn tap(&mut self, at: DisplayPoint) -> TapOutcome {
        if self.core.is_busy() {
            return TapOutcome::Ignored;
        }
        if !self.core.mapper.hits_image(at, self.view) {
            return TapOutcome::Ignored;
        }
        if !self.view.is_zoomed() {
            self.view = self
                .view
                .zoom_at(TAP_ZOOM, at, self.core.mapper.render_box());
            debug!("tap zoomed to {:.1}x", self.view.zoom);
            return TapOutcome::Zoomed;
        }
        let natural = self
            .core
            .mapper
            .clamp_natural(self.core.mapper.to_natural(at, self.view));
        if !self.core.machine.apply(GestureEvent::PlacePoint(natural)) {
            return TapOutcome::Ignored;
        }
        // show the committed mark in context
        self.view = ViewTransform::identity();
        TapOutcome::Marked
    }

    pub fn zoom_in(&mut self) {
        self.adjust_zoom(ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.adjust_zoom(-ZOOM_STEP);
    }

    fn adjust_zoom(&mut self, delta: f64) {
        if self.core.is_busy() {
            return;
        }
        let render_box = self.core.mapper.render_box();
        // +/- controls pivot on the box center
        self.view = self
            .view
            .zoom_at(self.view.zoom + delta, render_box.center(), render_box);
    }

    /// Drag delta in display pixels. Only meaningful while zoomed; at 1x
    /// the clamps hold the view still.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if self.core.is_busy() {
            return;
        }
        self.view = self.view.pan_by(dx, dy, self.core.mapper.render_box());
    }

    pub fn state(&self) -> &InteractionState {
        self.core.state()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.core.selection()
    }

    pub fn is_busy(&self) -> bool {
        self.core.is_busy()
    }

    pub fn confirm(&mut self) -> Option<CaptureRequest> {
        self.core.confirm()
    }

    pub fn complete(&mut self, result: Result<CapturedArtifact, CaptureError>) -> bool {
        self.core.complete(result)
    }

    pub fn cancel(&mut self) -> bool {
        self.core.cancel()
    }

    pub fn reset(&mut self) -> bool {
        self.core.reset()
    }

    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        self.core.artifact()
    }

    pub fn failure(&self) -> Option<&str> {
        self.core.failure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{NaturalPoint, MAX_ZOOM, MIN_ZOOM};

    fn surface() -> TouchSurface {
        TouchSurface::new(
            RenderBox::new(400.0, 300.0),
            NaturalSize::new(800, 600),
            None,
            "photos/lamp.jpg",
        )
    }

    #[test]
    fn first_tap_zooms_around_the_finger() {
        let mut s = surface();
        assert_eq!(s.tap(DisplayPoint::new(110.0, 50.0)), TapOutcome::Zoomed);
        let view = s.view();
        assert!((view.zoom - TAP_ZOOM).abs() < 1e-9);
        assert!((view.pan_x - 66.0).abs() < 1e-9);
        assert!((view.pan_y - 30.0).abs() < 1e-9);
        assert!(s.selection().is_none());
    }

    #[test]
    fn tap_while_zoomed_marks_through_the_pan_and_snaps_out() {
        let mut s = surface();
        s.tap(DisplayPoint::new(110.0, 50.0));
        // drag the window to pan (20, 0)
        s.pan_by((66.0 - 20.0) * TAP_ZOOM, 30.0 * TAP_ZOOM);
        let view = s.view();
        assert!((view.pan_x - 20.0).abs() < 1e-9);
        assert!((view.pan_y - 0.0).abs() < 1e-9);

        assert_eq!(s.tap(DisplayPoint::new(110.0, 50.0)), TapOutcome::Marked);
        assert_eq!(
            s.selection(),
            Some(Selection::point(NaturalPoint::new(128.0, 40.0)))
        );
        assert!(!s.view().is_zoomed());
    }

    #[test]
    fn manual_zoom_steps_clamp_at_both_ends() {
        let mut s = surface();
        for _ in 0..12 {
            s.zoom_in();
        }
        assert!((s.view().zoom - MAX_ZOOM).abs() < 1e-9);
        for _ in 0..12 {
            s.zoom_out();
        }
        assert!((s.view().zoom - MIN_ZOOM).abs() < 1e-9);
        // back at 1x the pan has collapsed too
        assert_eq!(s.view().pan_x, 0.0);
        assert_eq!(s.view().pan_y, 0.0);
    }

    #[test]
    fn pan_at_fit_scale_holds_still() {
        let mut s = surface();
        s.pan_by(80.0, -40.0);
        assert_eq!(s.view(), ViewTransform::identity());
    }

    #[test]
    fn letterbox_taps_are_ignored() {
        // tall image: dead margins left and right
        let mut s = TouchSurface::new(
            RenderBox::new(600.0, 400.0),
            NaturalSize::new(400, 800),
            None,
            "tall.jpg",
        );
        assert_eq!(s.tap(DisplayPoint::new(30.0, 200.0)), TapOutcome::Ignored);
        assert_eq!(*s.state(), InteractionState::Idle);
    }

    #[test]
    fn surface_goes_inert_while_processing() {
        let mut s = surface();
        s.tap(DisplayPoint::new(200.0, 150.0));
        assert_eq!(s.tap(DisplayPoint::new(200.0, 150.0)), TapOutcome::Marked);
        s.confirm().unwrap();

        assert_eq!(s.tap(DisplayPoint::new(100.0, 100.0)), TapOutcome::Ignored);
        let before = s.view();
        s.zoom_in();
        s.pan_by(50.0, 50.0);
        assert_eq!(s.view(), before);
    }

    #[test]
    fn confirmed_zoom_tap_reports_the_method() {
        let mut s = surface();
        s.tap(DisplayPoint::new(200.0, 150.0));
        s.tap(DisplayPoint::new(200.0, 150.0));
        let request = s.confirm().unwrap();
        assert_eq!(request.method, SelectionMethod::ZoomTap);
    }
}
