//! Interaction surfaces.
//!
//! Three gesture vocabularies over one machine: [`PreciseSurface`] for
//! pointer drags, [`TapSurface`] for single taps plus the file-upload
//! alternate, [`TouchSurface`] for zoom-then-tap on small screens. Each is
//! a thin adapter; selection rules, busy gating and capture plumbing live
//! in the shared [`SurfaceCore`].

mod precise;
mod tap;
mod touch;

pub use precise::PreciseSurface;
pub use tap::TapSurface;
pub use touch::{TapOutcome, TouchSurface, TAP_ZOOM, ZOOM_STEP};

use crate::capture::{CaptureRequest, CaptureSubject};
use crate::error::CaptureError;
use crate::geometry::Mapper;
use crate::selection::{CapturedArtifact, Selection, SelectionMethod};
use crate::state::{GestureEvent, InteractionState, SelectionMachine};

/// The machinery every surface composes: coordinate mapping, the selection
/// machine, and the confirm/complete handshake with the capture pipeline.
#[derive(Debug)]
pub struct SurfaceCore {
    mapper: Mapper,
    machine: SelectionMachine,
    method: SelectionMethod,
    product_name: Option<String>,
    source_path: String,
}

impl SurfaceCore {
    fn new(
        mapper: Mapper,
        method: SelectionMethod,
        product_name: Option<String>,
        source_path: String,
    ) -> Self {
        Self {
            mapper,
            machine: SelectionMachine::new(),
            method,
            product_name,
            source_path,
        }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn state(&self) -> &InteractionState {
        self.machine.state()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.machine.selection()
    }

    pub fn is_busy(&self) -> bool {
        self.machine.is_busy()
    }

    /// Hand the current selection to the pipeline. The machine parks in
    /// `Processing` and the returned request is the host's job to run;
    /// feed the outcome back through [`SurfaceCore::complete`]. `None` when
    /// there is nothing to confirm or a capture is already in flight.
    pub fn confirm(&mut self) -> Option<CaptureRequest> {
        if self.machine.is_busy() {
            return None;
        }
        let selection = self.machine.selection()?;
        if !self.machine.apply(GestureEvent::Confirm) {
            return None;
        }
        Some(CaptureRequest {
            subject: CaptureSubject::Marked(selection),
            method: self.method,
            product_name: self.product_name.clone(),
            source_path: self.source_path.clone(),
        })
    }

    /// The pipeline's answer to a confirmed request.
    pub fn complete(&mut self, result: Result<CapturedArtifact, CaptureError>) -> bool {
        match result {
            Ok(artifact) => self.machine.apply(GestureEvent::CaptureDone(artifact)),
            Err(err) => self.machine.apply(GestureEvent::CaptureFailed(err.to_string())),
        }
    }

    pub fn cancel(&mut self) -> bool {
        self.machine.apply(GestureEvent::Cancel)
    }

    pub fn reset(&mut self) -> bool {
        self.machine.apply(GestureEvent::Reset)
    }

    pub fn artifact(&self) -> Option<&CapturedArtifact> {
        match self.machine.state() {
            InteractionState::Completed(artifact) => Some(artifact),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self.machine.state() {
            InteractionState::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    fn request_for(&self, subject: CaptureSubject, method: SelectionMethod) -> CaptureRequest {
        CaptureRequest {
            subject,
            method,
            product_name: self.product_name.clone(),
            source_path: self.source_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{NaturalPoint, NaturalSize, RenderBox};
    use crate::selection::SelectionMetadata;

    fn core() -> SurfaceCore {
        SurfaceCore::new(
            Mapper::new(RenderBox::new(100.0, 100.0), NaturalSize::new(100, 100)),
            SelectionMethod::TapPoint,
            None,
            "photo.jpg".into(),
        )
    }

    fn artifact() -> CapturedArtifact {
        CapturedArtifact {
            encoded_image: "data:image/jpeg;base64,AAAA".into(),
            metadata: SelectionMetadata {
                product_name: None,
                selection: Some(Selection::point(NaturalPoint::new(5.0, 5.0))),
                timestamp: "2025-03-14T09:26:53Z".into(),
                source_path: "photo.jpg".into(),
                selection_method: SelectionMethod::TapPoint,
                is_fallback_render: false,
                is_compressed: false,
            },
        }
    }

    #[test]
    fn confirm_needs_a_selection_and_yields_one_request() {
        let mut core = core();
        assert!(core.confirm().is_none());

        core.machine
            .apply(GestureEvent::PlacePoint(NaturalPoint::new(10.0, 10.0)));
        let request = core.confirm().expect("selection should confirm");
        assert!(matches!(request.subject, CaptureSubject::Marked(_)));
        assert!(core.is_busy());

        // second confirm while in flight is refused
        assert!(core.confirm().is_none());
    }

    #[test]
    fn complete_routes_ok_and_err_to_terminal_states() {
        let mut core = core();
        core.machine
            .apply(GestureEvent::PlacePoint(NaturalPoint::new(10.0, 10.0)));
        core.confirm().unwrap();
        assert!(core.complete(Ok(artifact())));
        assert!(core.artifact().is_some());
        assert!(core.failure().is_none());

        assert!(core.reset());
        core.machine
            .apply(GestureEvent::PlacePoint(NaturalPoint::new(10.0, 10.0)));
        core.confirm().unwrap();
        assert!(core.complete(Err(CaptureError::Encoding("boom".into()))));
        assert_eq!(core.failure(), Some("image encoding failed: boom"));
    }

    #[test]
    fn complete_without_a_pending_capture_is_rejected() {
        let mut core = core();
        assert!(!core.complete(Ok(artifact())));
    }
}
