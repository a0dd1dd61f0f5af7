use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::{Receiver, Sender};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::SubmissionError;
use crate::events::{SessionCommand, SessionNotice};
use crate::session::{Session, SessionSnapshot};
use crate::synthesis::{SynthesisEvent, progress_percent};
use crate::texture::{Texture, decode_submission};

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub stage_interval: Duration,
    pub max_texture_dim: u32,
}

/// Sole owner and mutator of the session.
///
/// Rules:
/// - Commands are applied in arrival order; edits and submissions are
///   ignored while a decode or synthesis run is in flight.
/// - At most one decode runs at a time, off the executor.
/// - A successful decode starts the stage ticker; the ticker is dropped on
///   completion or cancellation, so no tick can outlive its run.
/// - A fresh snapshot is published after every state change, and always
///   before the notice describing that change.
#[instrument(skip_all, fields(stage_interval = ?opts.stage_interval))]
pub async fn run(
    mut session: Session,
    mut commands: Receiver<SessionCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    notices: Sender<SessionNotice>,
    cancel: CancellationToken,
    opts: ControllerOptions,
) -> Result<()> {
    let mut decodes: JoinSet<Result<Texture, SubmissionError>> = JoinSet::new();
    let mut ticker: Option<Interval> = None;
    publish(&snapshots, &session);

    loop {
        select! {
            _ = cancel.cancelled() => {
                if session.is_busy() {
                    info!("session ending mid-synthesis; discarding run");
                }
                decodes.abort_all();
                session.abandon();
                publish(&snapshots, &session);
                break;
            }

            Some(cmd) = commands.recv() => {
                apply_command(&mut session, cmd, &mut decodes, &notices, opts.max_texture_dim);
                publish(&snapshots, &session);
            }

            Some(joined) = decodes.join_next() => {
                let name = session.decoding().unwrap_or_default().to_owned();
                let decoded = joined.unwrap_or_else(|err| {
                    warn!(image = %name, %err, "decode task failed");
                    Err(SubmissionError::Interrupted)
                });
                let outcome = session.on_decoded(decoded);
                publish(&snapshots, &session);
                match outcome {
                    Ok(()) => {
                        ticker = Some(stage_ticker(opts.stage_interval));
                        notify(&notices, SessionNotice::Started { name });
                    }
                    Err(err) => {
                        info!(image = %name, %err, "image could not be used");
                        notify(&notices, SessionNotice::DecodeFailed { name, error: err.to_string() });
                    }
                }
            }

            _ = next_tick(&mut ticker) => {
                let event = session.tick();
                publish(&snapshots, &session);
                match event {
                    Some(SynthesisEvent::StageEmitted { index, label }) => {
                        info!(stage = index + 1, percent = progress_percent(index), "> {label}");
                        notify(&notices, SessionNotice::Stage { index, label });
                    }
                    Some(SynthesisEvent::Completed(texture)) => {
                        ticker = None;
                        info!(
                            width = texture.width(),
                            height = texture.height(),
                            "synthesis complete; displacement mesh active"
                        );
                        notify(&notices, SessionNotice::Completed {
                            width: texture.width(),
                            height: texture.height(),
                        });
                    }
                    None => ticker = None,
                }
            }
        }
    }

    Ok(())
}

fn apply_command(
    session: &mut Session,
    cmd: SessionCommand,
    decodes: &mut JoinSet<Result<Texture, SubmissionError>>,
    notices: &Sender<SessionNotice>,
    max_texture_dim: u32,
) {
    match cmd {
        SessionCommand::SetQuality(v) => {
            if session.set_quality(v) {
                debug!(quality = session.params().quality(), "quality set");
            }
        }
        SessionCommand::SetIntensity(v) => {
            if session.set_intensity(v) {
                debug!(intensity = session.params().intensity(), "intensity set");
            }
        }
        SessionCommand::SetWireframe(on) => session.set_wireframe(on),
        SessionCommand::ToggleWireframe => {
            let on = !session.params().wireframe();
            session.set_wireframe(on);
        }
        SessionCommand::Submit(submission) => match session.accept_submission(&submission) {
            Ok(()) => {
                debug!(image = %submission.name, mime = %submission.mime, "decoding submission");
                decodes.spawn_blocking(move || decode_submission(&submission, max_texture_dim));
            }
            Err(err) => {
                debug!(image = %submission.name, %err, "submission rejected");
                notify(
                    notices,
                    SessionNotice::Rejected {
                        name: submission.name,
                        reason: err.to_string(),
                    },
                );
            }
        },
    }
}

/// First tick fires one full period after the run starts.
fn stage_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(t) => {
            t.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn publish(snapshots: &watch::Sender<SessionSnapshot>, session: &Session) {
    snapshots.send_replace(session.snapshot());
}

// Never blocks the state machine on a slow observer.
fn notify(notices: &Sender<SessionNotice>, notice: SessionNotice) {
    if let Err(err) = notices.try_send(notice) {
        debug!(%err, "session notice dropped");
    }
}
