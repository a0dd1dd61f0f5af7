use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::events::ExportRequest;
use crate::export;
use crate::render::Renderer;
use crate::session::SessionSnapshot;

/// Redraw loop. Reads the latest snapshot once per frame and hands it to
/// the renderer; never waits on the controller. Export requests are served
/// between frames, after redrawing the latest snapshot so a capture never
/// lags the state it was requested against.
///
/// Returns the renderer so callers can inspect or reuse it.
pub async fn run<R: Renderer>(
    mut renderer: R,
    mut frames: watch::Receiver<SessionSnapshot>,
    mut exports: Receiver<ExportRequest>,
    cancel: CancellationToken,
    frame_interval: Duration,
) -> Result<R> {
    let started = Instant::now();
    let mut ticker = interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut drawn: u64 = 0;
    let mut failed: u64 = 0;

    loop {
        select! {
            _ = cancel.cancelled() => break,

            _ = ticker.tick() => {
                let input = frames.borrow_and_update().frame.clone();
                match renderer.draw(&input, started.elapsed()) {
                    Ok(()) => drawn += 1,
                    Err(err) => {
                        failed += 1;
                        // first failure, then roughly once a minute at 60 Hz
                        if failed % 3600 == 1 {
                            warn!(failed, "frame draw failed: {err:?}");
                        }
                    }
                }
            }

            Some(ExportRequest { path, reply }) = exports.recv() => {
                let input = frames.borrow_and_update().frame.clone();
                let result = match renderer.draw(&input, started.elapsed()) {
                    Ok(()) => {
                        drawn += 1;
                        export::export_capture(&renderer, &path)
                    }
                    Err(err) => Err(err.context("redrawing before export")),
                };
                if let Err(err) = &result {
                    warn!(path = %path.display(), "export failed: {err:?}");
                }
                let _ = reply.send(result);
            }
        }
    }

    info!(drawn, failed, "viewer stopped");
    Ok(renderer)
}
