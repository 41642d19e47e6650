//! Simplified tap-to-mark surface.
//!
//! One tap places the point marker; no drawing, no zoom. The surface also
//! carries the alternate path where the user supplies their own photo, in
//! which case the uploaded file becomes the artifact and no marker is
//! rendered at all.

use crate::capture::{CaptureRequest, CaptureSubject};
use crate::error::CaptureError;
use crate::geometry::{DisplayPoint, Mapper, NaturalSize, RenderBox, ViewTransform};
use crate::selection::{CapturedArtifact, Selection, SelectionMethod};
use crate::state::{GestureEvent, InteractionState};

use super::SurfaceCore;

#[derive(Debug)]
pub struct TapSurface {
    core: SurfaceCore,
    upload: Option<Upload>,
}

#[derive(Debug)]
struct Upload {
    name: String,
    bytes: Vec<u8>,
}

impl TapSurface {
    pub fn new(
        render_box: RenderBox,
        natural: NaturalSize,
        product_name: Option<String>,
        source_path: impl Into<String>,
    ) -> Self {
        Self {
            core: SurfaceCore::new(
                Mapper::new(render_box, natural),
                SelectionMethod::TapPoint,
                product_name,
                source_path.into(),
            ),
            upload: None,
        }
    }

    /// Place the point marker under the tap. Replaces any prior point and
    /// drops an attached upload; the two paths never mix.
    pub fn tap(&mut self, at: DisplayPoint) -> bool {
        if self.core.is_busy() {
            return false;
        }
        let view = ViewTransform::identity();
        if !self.core.mapper.hits_image(at, view) {
            return false;
        }
        let natural = self
            .core
            .mapper
            .clamp_natural(self.core.mapper.to_natural(at, view));
        if !self.core.machine.apply(GestureEvent::PlacePoint(natural)) {
            return false;
        }
        self.upload = None;
        true
    }

    /// Choose the user's own photo instead of marking the catalog image.
    /// Sticky like a file input: it survives until replaced or a tap
    /// switches back to the marking path.
    pub fn attach_upload(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> bool {
        if self.core.is_busy() {
            return false;
        }
        // drop a tapped point; the upload takes over
        self.core.machine.apply(GestureEvent::Cancel);
        self.upload = Some(Upload {
            name: name.into(),
            bytes,
        });
        true
    }

    pub fn has_upload(&self) -> bool {
        self.upload.is_some()
    }

    /// Confirm whichever path is active: the uploaded file when one is
    /// attached, the tapped point otherwise.
    pub fn confirm(&mut self) -> Option<CaptureRequest> {
        let Some(upload) = &self.upload else {
            return self.core.confirm();
        };
        if self.core.is_busy() || !self.core.machine.apply(GestureEvent::ConfirmUpload) {
            return None;
        }
        let mut request = self.core.request_for(
            CaptureSubject::Upload(upload.bytes.clone()),
            SelectionMethod::FileUpload,
        );
        request.source_path = upload.name.clone();
        Some(request)
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

    pub fn complete(&mut self, result: Result<CapturedArtifact, CaptureError>) -> bool {
        self.core.complete(result)
    }

    pub fn cancel(&mut self) -> bool {
        self.upload = None;
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
