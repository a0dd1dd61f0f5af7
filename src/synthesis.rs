//! Scripted synthesis run.
//!
//! The run is a fixed narrative: seven labels emitted one per timer tick,
//! followed by a completion tick that hands the pending image back to the
//! caller. Image content has no influence on the script or its pacing.

use crate::texture::Texture;

pub const STAGES: [&str; 7] = [
    "Initializing Quantum Neural Fabric...",
    "Scanning Grayscale Luminance Map...",
    "Triangulating Dense Vertex Mesh...",
    "Reducing Surface Entropy...",
    "Injecting PBR Micro-Shaders...",
    "Stabilizing Displacement Buffer...",
    "Neural Mesh Online.",
];

/// Percentage shown next to the stage at `index` in the progress overlay.
pub fn progress_percent(index: usize) -> u32 {
    (index as u32 + 1) * 10
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisStatus {
    Idle,
    Running,
    Completed,
}

#[derive(Debug, Clone)]
pub enum SynthesisEvent {
    StageEmitted { index: usize, label: &'static str },
    Completed(Texture),
}

#[derive(Debug, Clone)]
struct SynthesisRun {
    pending_image: Texture,
    emitted: usize,
}

#[derive(Debug, Clone)]
pub struct Synthesis {
    status: SynthesisStatus,
    run: Option<SynthesisRun>,
    log: Vec<&'static str>,
}

impl Default for Synthesis {
    fn default() -> Self {
        Self::new()
    }
}

impl Synthesis {
    pub fn new() -> Self {
        Self {
            status: SynthesisStatus::Idle,
            run: None,
            log: Vec::with_capacity(STAGES.len()),
        }
    }

    pub fn status(&self) -> SynthesisStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status == SynthesisStatus::Running
    }

    /// Stage labels emitted so far by the current run, in order.
    pub fn log(&self) -> &[&'static str] {
        &self.log
    }

    pub fn emitted_count(&self) -> usize {
        self.run.as_ref().map_or(0, |r| r.emitted)
    }

    pub fn pending_image(&self) -> Option<&Texture> {
        self.run.as_ref().map(|r| &r.pending_image)
    }

    /// Start a run. Returns `false` and leaves the current run untouched
    /// unless the machine is Idle.
    pub fn begin(&mut self, image: Texture) -> bool {
        if self.status != SynthesisStatus::Idle {
            return false;
        }
        self.log.clear();
        self.run = Some(SynthesisRun {
            pending_image: image,
            emitted: 0,
        });
        self.status = SynthesisStatus::Running;
        true
    }

    /// Advance by one timer tick. Ticks outside Running are ignored.
    pub fn on_tick(&mut self) -> Option<SynthesisEvent> {
        if self.status != SynthesisStatus::Running {
            return None;
        }
        let run = self.run.as_mut()?;
        if let Some(&label) = STAGES.get(run.emitted) {
            let index = run.emitted;
            self.log.push(label);
            run.emitted += 1;
            return Some(SynthesisEvent::StageEmitted { index, label });
        }
        self.status = SynthesisStatus::Completed;
        self.run
            .take()
            .map(|run| SynthesisEvent::Completed(run.pending_image))
    }

    /// Completed -> Idle: clears the log so the next run starts fresh.
    pub fn reset(&mut self) {
        if self.status == SynthesisStatus::Completed {
            self.status = SynthesisStatus::Idle;
            self.log.clear();
        }
    }

    /// Drop any in-flight run without adopting its image.
    pub fn abandon(&mut self) {
        self.run = None;
        self.log.clear();
        self.status = SynthesisStatus::Idle;
    }
}
