//! Pointer-driven drag-circle surface.

use crate::capture::CaptureRequest;
use crate::error::CaptureError;
use crate::geometry::{DisplayPoint, Mapper, NaturalPoint, NaturalSize, RenderBox, ViewTransform};
use crate::selection::{CapturedArtifact, Selection, SelectionMethod};
use crate::state::{DraftCircle, GestureEvent, InteractionState};

use super::SurfaceCore;

/// Press on the part, drag outward to size the circle, release to commit.
/// Pressing again while something is selected discards it and starts over.
#[derive(Debug)]
pub struct PreciseSurface {
    core: SurfaceCore,
}

impl PreciseSurface {
    pub fn new(
        render_box: RenderBox,
        natural: NaturalSize,
        product_name: Option<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            core: SurfaceCore::new(
                Mapper::new(render_box, natural),
                SelectionMethod::CircleDraw,
                product_name,
                source_path.into(),
            ),
        }
    }

    /// Anchor a new circle. Presses on the letterbox margins, or while a
    /// capture is in flight, do nothing.
    pub fn pointer_down(&mut self, at: DisplayPoint) -> bool {
        if self.core.is_busy() {
            return false;
        }
        let view = ViewTransform::identity();
        if !self.core.mapper.hits_image(at, view) {
            return false;
        }
        let natural = self.natural_at(at);
        self.core
            .machine
            .apply(GestureEvent::Begin { display: at, natural })
    }

    /// Grow the draft toward the pointer. The drag may leave the render
    /// box; the natural coordinate clamps to the image rim.
    pub fn pointer_move(&mut self, at: DisplayPoint) -> bool {
        let natural = self.natural_at(at);
        self.core
            .machine
            .apply(GestureEvent::Update { display: at, natural })
    }

    /// Release. Commits the circle if the drag was deliberate, otherwise
    /// falls back to no selection at all.
    pub fn pointer_up(&mut self) -> bool {
        self.core.machine.apply(GestureEvent::Finish)
    }

    /// The in-flight draft, for the live rubber-band overlay.
    pub fn draft(&self) -> Option<&DraftCircle> {
        match self.core.state() {
            InteractionState::Drawing(draft) => Some(draft),
            _ => None,
        }
    }

    pub fn restart(&mut self) -> bool {
        self.core.machine.apply(GestureEvent::Restart)
    }

    fn natural_at(&self, at: DisplayPoint) -> NaturalPoint {
        let view = ViewTransform::identity();
        self.core
            .mapper
            .clamp_natural(self.core.mapper.to_natural(at, view))
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
    use crate::capture::{capture, CaptureOptions, CaptureSubject};
    use crate::source::SourceImage;
    use image::{Rgba, RgbaImage};

    fn surface() -> PreciseSurface {
        PreciseSurface::new(
            RenderBox::new(500.0, 500.0),
            NaturalSize::new(1000, 1000),
            Some("Meridian Desk Lamp".into()),
            "photos/lamp.jpg",
        )
    }

    #[test]
    fn drag_maps_half_scale_display_into_natural_pixels() {
        let mut s = surface();
        assert!(s.pointer_down(DisplayPoint::new(100.0, 100.0)));
        assert!(s.pointer_move(DisplayPoint::new(130.0, 100.0)));
        assert!(s.pointer_up());
        match s.selection() {
            Some(Selection::Circle {
                center_x,
                center_y,
                radius,
            }) => {
                assert_eq!(center_x, 200.0);
                assert_eq!(center_y, 200.0);
                assert!((radius - 60.0).abs() < 1e-9);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn letterbox_presses_are_inert() {
        // tall image centered in a square box: margins on the left/right
        let mut s = PreciseSurface::new(
            RenderBox::new(500.0, 500.0),
            NaturalSize::new(250, 1000),
            None,
            "tall.jpg",
        );
        assert!(!s.pointer_down(DisplayPoint::new(20.0, 250.0)));
        assert_eq!(*s.state(), InteractionState::Idle);
        assert!(s.pointer_down(DisplayPoint::new(250.0, 250.0)));
    }

    #[test]
    fn drag_leaving_the_box_clamps_to_the_image_rim() {
        let mut s = surface();
        s.pointer_down(DisplayPoint::new(480.0, 250.0));
        s.pointer_move(DisplayPoint::new(620.0, 250.0));
        s.pointer_up();
        match s.selection() {
            Some(Selection::Circle { radius, .. }) => {
                // natural cursor pinned to x=1000, so the radius is capped
                assert!((radius - 40.0).abs() < 1e-9);
            }
            other => panic!("expected circle, got {other:?}"),
        }
    }

    #[test]
    fn micro_drag_leaves_idle_and_tiny_circles_never_commit() {
        let mut s = surface();
        s.pointer_down(DisplayPoint::new(100.0, 100.0));
        s.pointer_move(DisplayPoint::new(102.0, 101.0));
        s.pointer_up();
        assert_eq!(*s.state(), InteractionState::Idle);
    }

    #[test]
    fn full_flow_from_drag_to_completed_artifact() {
        let source = SourceImage::from_pixels(RgbaImage::from_pixel(
            1000,
            1000,
            Rgba([90, 90, 90, 255]),
        ));
        let mut s = surface();
        s.pointer_down(DisplayPoint::new(100.0, 100.0));
        s.pointer_move(DisplayPoint::new(130.0, 100.0));
        s.pointer_up();

        let request = s.confirm().expect("selected circle confirms");
        assert!(matches!(request.subject, CaptureSubject::Marked(_)));
        assert!(s.is_busy());
        assert!(!s.pointer_down(DisplayPoint::new(300.0, 300.0)));

        let artifact = capture(&source, &request, &CaptureOptions::default()).unwrap();
        assert!(s.complete(Ok(artifact)));
        let done = s.artifact().expect("completed artifact");
        assert_eq!(done.metadata.selection_method, SelectionMethod::CircleDraw);
        assert_eq!(done.metadata.product_name.as_deref(), Some("Meridian Desk Lamp"));
    }

    #[test]
    fn press_while_selected_discards_and_redraws() {
        let mut s = surface();
        s.pointer_down(DisplayPoint::new(100.0, 100.0));
        s.pointer_move(DisplayPoint::new(150.0, 100.0));
        s.pointer_up();
        assert!(s.selection().is_some());

        assert!(s.pointer_down(DisplayPoint::new(300.0, 300.0)));
        assert!(s.draft().is_some());
        assert!(s.selection().is_none());
    }

    #[test]
    fn restart_and_cancel_drop_the_selection() {
        let mut s = surface();
        s.pointer_down(DisplayPoint::new(100.0, 100.0));
        s.pointer_move(DisplayPoint::new(150.0, 100.0));
        s.pointer_up();
        assert!(s.restart());
        assert_eq!(*s.state(), InteractionState::Idle);

        s.pointer_down(DisplayPoint::new(100.0, 100.0));
        assert!(s.cancel());
        assert_eq!(*s.state(), InteractionState::Idle);
    }
}
