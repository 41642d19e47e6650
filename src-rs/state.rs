//! Interaction lifecycle for one open selection surface.
//!
//! One machine instance lives for the lifetime of a surface. Gestures and
//! pipeline callbacks arrive as [`GestureEvent`]s; illegal events are
//! rejected without touching the state, which is what makes double-submit
//! and draw-while-busy impossible by construction.

use log::debug;

use crate::geometry::{DisplayPoint, NaturalPoint};
use crate::selection::{CapturedArtifact, Selection};

/// Drags whose display-space radius stays under this commit nothing; the
/// press was noise, not a selection.
pub const MIN_DRAG_RADIUS: f64 = 5.0;

/// An in-progress circle drag, tracked in both coordinate spaces: the
/// display pair gates the minimum-radius rule, the natural pair becomes the
/// committed geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DraftCircle {
    pub anchor_display: DisplayPoint,
    pub cursor_display: DisplayPoint,
    pub anchor_natural: NaturalPoint,
    pub cursor_natural: NaturalPoint,
}

impl DraftCircle {
    fn anchored(display: DisplayPoint, natural: NaturalPoint) -> Self {
        Self {
            anchor_display: display,
            cursor_display: display,
            anchor_natural: natural,
            cursor_natural: natural,
        }
    }

    pub fn display_radius(&self) -> f64 {
        self.anchor_display.distance_to(self.cursor_display)
    }

    pub fn natural_radius(&self) -> f64 {
        self.anchor_natural.distance_to(self.cursor_natural)
    }

    fn selection(&self) -> Selection {
        Selection::circle(self.anchor_natural, self.natural_radius())
    }
}

/// Where the surface is in its life. `Processing` is the suspension point:
/// the machine parks there while the host runs the capture pipeline, then
/// resumes through `CaptureDone`/`CaptureFailed`.
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionState {
    Idle,
    Drawing(DraftCircle),
    Selected(Selection),
    Processing,
    Completed(CapturedArtifact),
    Failed(String),
}

/// Every input the machine understands, across all three surfaces.
#[derive(Debug, Clone)]
pub enum GestureEvent {
    /// Pointer pressed on the image; starts (or restarts) a circle drag.
    Begin {
        display: DisplayPoint,
        natural: NaturalPoint,
    },
    /// Pointer moved while drawing.
    Update {
        display: DisplayPoint,
        natural: NaturalPoint,
    },
    /// Pointer released; commits if the draft passes the radius rule.
    Finish,
    /// Tap surfaces commit a point selection in one step.
    PlacePoint(NaturalPoint),
    /// Explicit start-over while something is selected.
    Restart,
    /// Escape hatch from any pre-processing state.
    Cancel,
    /// Hand the selection to the capture pipeline.
    Confirm,
    /// Hand an uploaded file to the pipeline; no geometry required.
    ConfirmUpload,
    CaptureDone(CapturedArtifact),
    CaptureFailed(String),
    /// Leave a terminal state and start fresh.
    Reset,
}

#[derive(Debug)]
pub struct SelectionMachine {
    state: InteractionState,
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self {
            state: InteractionState::Idle,
        }
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// The committed geometry awaiting confirmation, if any.
    pub fn selection(&self) -> Option<Selection> {
        match self.state {
            InteractionState::Selected(sel) => Some(sel),
            _ => None,
        }
    }

    /// True while a confirm is being processed. Surfaces go inert here:
    /// no new gesture may start until the pipeline reports back.
    pub fn is_busy(&self) -> bool {
        matches!(self.state, InteractionState::Processing)
    }

    /// Applies one event, returning whether it was accepted. Rejected
    /// events leave the state untouched.
    pub fn apply(&mut self, event: GestureEvent) -> bool {
        use GestureEvent as E;
        use InteractionState as S;

        let next = match (&self.state, event) {
            // A press starts drawing from scratch, and while something is
            // selected it discards that selection and starts over.
            (S::Idle | S::Selected(_), E::Begin { display, natural }) => {
                S::Drawing(DraftCircle::anchored(display, natural))
            }
            (S::Drawing(draft), E::Update { display, natural }) => {
                let mut draft = *draft;
                draft.cursor_display = display;
                draft.cursor_natural = natural;
                S::Drawing(draft)
            }
            // Release commits only a deliberate drag; micro-drags vanish.
            (S::Drawing(draft), E::Finish) => {
                if draft.display_radius() >= MIN_DRAG_RADIUS && draft.selection().is_valid() {
                    S::Selected(draft.selection())
                } else {
                    debug!(
                        "drag radius {:.1} under threshold, discarding",
                        draft.display_radius()
                    );
                    S::Idle
                }
            }
            (S::Idle | S::Selected(_), E::PlacePoint(at)) => {
                let sel = Selection::point(at);
                if !sel.is_valid() {
                    return self.reject("place-point with non-finite coordinates");
                }
                S::Selected(sel)
            }
            (S::Selected(_), E::Restart) => S::Idle,
            (S::Idle | S::Drawing(_) | S::Selected(_), E::Cancel) => S::Idle,
            (S::Completed(_) | S::Failed(_), E::Cancel | E::Reset) => S::Idle,
            (S::Selected(_), E::Confirm) => S::Processing,
            // Uploads skip geometry entirely but still hold the busy lock.
            (S::Idle | S::Selected(_), E::ConfirmUpload) => S::Processing,
            (S::Processing, E::CaptureDone(artifact)) => S::Completed(artifact),
            (S::Processing, E::CaptureFailed(reason)) => S::Failed(reason),
            (state, event) => {
                debug!("event {event:?} rejected in state {state:?}");
                return false;
            }
        };
        self.state = next;
        true
    }

    fn reject(&self, why: &str) -> bool {
        debug!("event rejected: {why}");
        false
    }
}
