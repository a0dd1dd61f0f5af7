//! The per-session context object.
//!
//! [`Session`] owns the one [`ParameterState`] and the one [`Synthesis`]
//! machine for the lifetime of a viewing session. It is mutated from a
//! single place (the controller task) and observed through cloned
//! [`SessionSnapshot`]s.

use tracing::{debug, info};

use crate::error::SubmissionError;
use crate::geometry::{self, GeometryDescriptor};
use crate::params::ParameterState;
use crate::synthesis::{Synthesis, SynthesisEvent, SynthesisStatus};
use crate::texture::{ImageSubmission, Texture};

/// What the renderer receives every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    pub geometry: GeometryDescriptor,
    pub wireframe: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub status: SynthesisStatus,
    pub log: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub frame: FrameInput,
    pub progress: Progress,
    pub quality: u8,
    pub intensity: f32,
    /// A submission has been accepted and is still decoding.
    pub decoding: bool,
}

#[derive(Debug, Default)]
pub struct Session {
    params: ParameterState,
    synthesis: Synthesis,
    decoding: Option<String>,
}

impl Session {
    pub fn new(params: ParameterState) -> Self {
        Self {
            params,
            synthesis: Synthesis::new(),
            decoding: None,
        }
    }

    pub fn params(&self) -> &ParameterState {
        &self.params
    }

    pub fn synthesis(&self) -> &Synthesis {
        &self.synthesis
    }

    /// A run is in progress or a decode that will start one is in flight.
    /// Quality, intensity and submissions are locked while busy.
    pub fn is_busy(&self) -> bool {
        self.synthesis.is_running() || self.decoding.is_some()
    }

    /// Name of the submission currently being decoded.
    pub fn decoding(&self) -> Option<&str> {
        self.decoding.as_deref()
    }

    /// Returns whether the edit was applied.
    pub fn set_quality(&mut self, value: i64) -> bool {
        if self.is_busy() {
            debug!(value, "quality edit ignored during synthesis");
            return false;
        }
        self.params.set_quality(value);
        true
    }

    /// Returns whether the edit was applied.
    pub fn set_intensity(&mut self, value: f32) -> bool {
        if self.is_busy() {
            debug!(value, "intensity edit ignored during synthesis");
            return false;
        }
        self.params.set_intensity(value);
        true
    }

    /// Always applied; wireframe is a render mode and never touches a run.
    pub fn set_wireframe(&mut self, on: bool) {
        self.params.set_wireframe(on);
    }

    /// Gate a submission before it is decoded.
    ///
    /// On success the session is marked busy until [`Session::on_decoded`]
    /// is called with the decode result.
    pub fn accept_submission(
        &mut self,
        submission: &ImageSubmission,
    ) -> Result<(), SubmissionError> {
        if self.is_busy() {
            return Err(SubmissionError::Busy);
        }
        if !submission.is_image() {
            return Err(SubmissionError::NotAnImage {
                mime: submission.mime.clone(),
            });
        }
        self.decoding = Some(submission.name.clone());
        Ok(())
    }

    /// Finish the decode started by [`Session::accept_submission`]. A
    /// successful decode starts the run; a failure returns to Idle.
    pub fn on_decoded(
        &mut self,
        decoded: Result<Texture, SubmissionError>,
    ) -> Result<(), SubmissionError> {
        let Some(name) = self.decoding.take() else {
            debug!("decode result without a pending submission; dropping");
            return Err(SubmissionError::Busy);
        };
        let texture = decoded?;
        if !self.synthesis.begin(texture) {
            return Err(SubmissionError::Busy);
        }
        info!(image = %name, "synthesis started");
        Ok(())
    }

    /// Advance the running synthesis by one tick.
    ///
    /// On the completion tick the pending image becomes the active image
    /// and the machine settles back to Idle before this returns.
    pub fn tick(&mut self) -> Option<SynthesisEvent> {
        let event = self.synthesis.on_tick()?;
        if let SynthesisEvent::Completed(texture) = &event {
            self.params.set_active_image(texture.clone());
            self.synthesis.reset();
        }
        Some(event)
    }

    /// Discard any run or pending decode, e.g. when the session ends.
    pub fn abandon(&mut self) {
        self.decoding = None;
        self.synthesis.abandon();
    }

    pub fn geometry(&self) -> GeometryDescriptor {
        geometry::select_geometry(&self.params)
    }

    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            geometry: self.geometry(),
            wireframe: self.params.wireframe(),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            frame: self.frame_input(),
            progress: Progress {
                status: self.synthesis.status(),
                log: self.synthesis.log().to_vec(),
            },
            quality: self.params.quality(),
            intensity: self.params.intensity(),
            decoding: self.decoding.is_some(),
        }
    }
}
