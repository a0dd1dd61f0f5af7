//! Binary entrypoint for holo-sculpt.
//!
//! Wires the controller and viewer tasks together and drives them from the
//! command line (and optionally stdin). All sculpting logic lives in the
//! library crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::{ArgAction, Parser};
use holo_sculpt::commands::{self, Command};
use holo_sculpt::config::Configuration;
use holo_sculpt::events::{ExportRequest, SessionCommand, SessionNotice};
use holo_sculpt::geometry::GeometryKind;
use holo_sculpt::render::preview::PreviewRenderer;
use holo_sculpt::session::{Session, SessionSnapshot};
use holo_sculpt::tasks::{controller, viewer};
use holo_sculpt::texture::read_submission;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "holo-sculpt",
    version,
    about = "Turn a single image into a displacement-mapped digital sculpture"
)]
struct Args {
    /// Path to YAML config
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Image to sculpt (repeatable; submitted one after another)
    #[arg(long = "image", value_name = "PATH")]
    images: Vec<PathBuf>,
    /// Override initial quality (1-100)
    #[arg(long, value_name = "N")]
    quality: Option<i64>,
    /// Override initial depth intensity (0.0-3.0)
    #[arg(long, value_name = "X")]
    intensity: Option<f32>,
    /// Start in wireframe mode
    #[arg(long)]
    wireframe: bool,
    /// Write a PNG capture after the images are sculpted
    #[arg(long, value_name = "PATH")]
    export: Option<PathBuf>,
    /// Keep rendering this long before exiting (e.g. "10s")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    hold: Option<Duration>,
    /// Read control commands from stdin
    #[arg(short, long)]
    interactive: bool,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"))
        .add_directive(
            format!("holo_sculpt={level}")
                .parse()
                .context("building log filter")?,
        );
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let mut cfg = match &args.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => Configuration::default(),
    };
    if let Some(q) = args.quality {
        cfg.quality = q;
    }
    if let Some(i) = args.intensity {
        cfg.intensity = i;
    }
    cfg.wireframe |= args.wireframe;
    let cfg = cfg.validated().context("invalid configuration values")?;
    info!("configuration:\n{:#?}", cfg);

    let session = Session::new(cfg.initial_params());
    let (command_tx, command_rx) = mpsc::channel::<SessionCommand>(32); // Driver -> Controller
    let (notice_tx, notice_rx) = mpsc::channel::<SessionNotice>(64); // Controller -> Driver
    let (export_tx, export_rx) = mpsc::channel::<ExportRequest>(4); // Driver -> Viewer
    let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot()); // Controller -> Viewer/Driver

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("ctrl-c handler failed: {err}");
                return;
            }
            info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    tasks.spawn({
        let cancel = cancel.clone();
        let opts = controller::ControllerOptions {
            stage_interval: cfg.stage_interval,
            max_texture_dim: cfg.max_texture_dim,
        };
        async move {
            controller::run(session, command_rx, snapshot_tx, notice_tx, cancel, opts)
                .await
                .context("controller task failed")
        }
    });

    let renderer = PreviewRenderer::new(cfg.capture.width, cfg.capture.height)?;
    tasks.spawn({
        let cancel = cancel.clone();
        let frames = snapshot_rx.clone();
        let frame_interval = cfg.frame_interval();
        async move {
            viewer::run(renderer, frames, export_rx, cancel, frame_interval)
                .await
                .map(|_| ())
                .context("viewer task failed")
        }
    });

    let mut driver = Driver {
        commands: command_tx,
        notices: notice_rx,
        exports: export_tx,
        snapshots: snapshot_rx,
        cancel: cancel.clone(),
        default_export: cfg.export_path.clone(),
    };

    if let Err(e) = drive(&mut driver, &args).await {
        tracing::error!("{e:?}");
    }

    if let Some(hold) = args.hold {
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(hold) => {}
        }
    }
    cancel.cancel();

    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
    }

    Ok(())
}

async fn drive(driver: &mut Driver, args: &Args) -> Result<()> {
    for path in &args.images {
        if driver.cancel.is_cancelled() {
            return Ok(());
        }
        driver.sculpt(path).await?;
    }
    if args.interactive {
        driver.interactive().await?;
    }
    if let Some(path) = &args.export {
        driver.export(path).await?;
    }
    Ok(())
}

/// Front-end standing in for the viewer's controls.
struct Driver {
    commands: mpsc::Sender<SessionCommand>,
    notices: mpsc::Receiver<SessionNotice>,
    exports: mpsc::Sender<ExportRequest>,
    snapshots: watch::Receiver<SessionSnapshot>,
    cancel: CancellationToken,
    default_export: PathBuf,
}

impl Driver {
    async fn send(&self, cmd: SessionCommand) -> Result<()> {
        self.commands
            .send(cmd)
            .await
            .map_err(|_| anyhow!("controller stopped"))
    }

    /// Submit one image and wait until it is adopted or refused.
    async fn sculpt(&mut self, path: &Path) -> Result<()> {
        let submission = match read_submission(path).await {
            Ok(sub) => sub,
            Err(err) => {
                warn!(path = %path.display(), %err, "cannot read image");
                return Ok(());
            }
        };
        // forget notices from earlier runs
        while self.notices.try_recv().is_ok() {}

        info!(path = %path.display(), mime = %submission.mime, "submitting image");
        self.send(SessionCommand::Submit(submission)).await?;

        loop {
            let notice = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                n = self.notices.recv() => n.ok_or_else(|| anyhow!("controller stopped"))?,
            };
            match notice {
                SessionNotice::Completed { .. } => return Ok(()),
                SessionNotice::Rejected { name, reason } => {
                    warn!(image = %name, %reason, "image ignored");
                    return Ok(());
                }
                SessionNotice::DecodeFailed { name, error } => {
                    warn!(image = %name, %error, "image could not be decoded");
                    return Ok(());
                }
                SessionNotice::Started { .. } | SessionNotice::Stage { .. } => {}
            }
        }
    }

    async fn export(&self, path: &Path) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.exports
            .send(ExportRequest {
                path: path.to_path_buf(),
                reply,
            })
            .await
            .map_err(|_| anyhow!("viewer stopped"))?;
        let written = rx.await.context("viewer dropped export request")??;
        println!("exported {}", written.display());
        Ok(())
    }

    fn print_status(&self) {
        let snap = self.snapshots.borrow().clone();
        let mode = match snap.frame.geometry.kind {
            GeometryKind::Demo => "demo",
            GeometryKind::Displacement => "displacement",
        };
        println!(
            "mode={mode} quality={} segments={} intensity={:.1} depth={:.2} wireframe={} synthesis={:?} decoding={}",
            snap.quality,
            snap.frame.geometry.segments,
            snap.intensity,
            snap.frame.geometry.displacement_scale,
            snap.frame.wireframe,
            snap.progress.status,
            snap.decoding,
        );
    }

    async fn interactive(&mut self) -> Result<()> {
        println!("{}", commands::HELP);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let line = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                line = lines.next_line() => line.context("reading stdin")?,
            };
            let Some(line) = line else {
                info!("stdin closed");
                return Ok(());
            };
            let cmd = match commands::parse(&line) {
                Ok(Some(cmd)) => cmd,
                Ok(None) => continue,
                Err(err) => {
                    println!("{err:#}");
                    continue;
                }
            };
            match cmd {
                Command::Quality(v) => self.send(SessionCommand::SetQuality(v)).await?,
                Command::Intensity(v) => self.send(SessionCommand::SetIntensity(v)).await?,
                Command::Wireframe(None) => self.send(SessionCommand::ToggleWireframe).await?,
                Command::Wireframe(Some(on)) => {
                    self.send(SessionCommand::SetWireframe(on)).await?
                }
                Command::Load(path) => self.sculpt(&path).await?,
                Command::Export(path) => {
                    let path = path.unwrap_or_else(|| self.default_export.clone());
                    if let Err(err) = self.export(&path).await {
                        println!("{err:#}");
                    }
                }
                Command::Status => self.print_status(),
                Command::Quit => return Ok(()),
            }
        }
    }
}
