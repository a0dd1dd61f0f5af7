use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use holo_sculpt::events::{ExportRequest, SessionCommand, SessionNotice};
use holo_sculpt::geometry::GeometryKind;
use holo_sculpt::render::Renderer;
use holo_sculpt::session::{FrameInput, Session};
use holo_sculpt::tasks::controller::{self, ControllerOptions};
use holo_sculpt::tasks::viewer;
use holo_sculpt::texture::ImageSubmission;
use image::RgbaImage;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Recorded {
    draws: usize,
    last: Option<FrameInput>,
}

struct RecordingRenderer {
    seen: Arc<Mutex<Recorded>>,
}

impl Renderer for RecordingRenderer {
    fn draw(&mut self, input: &FrameInput, _elapsed: Duration) -> Result<()> {
        let mut seen = self.seen.lock().unwrap();
        seen.draws += 1;
        seen.last = Some(input.clone());
        Ok(())
    }

    fn capture(&self) -> Result<RgbaImage> {
        Ok(RgbaImage::from_pixel(2, 2, image::Rgba([9, 8, 7, 255])))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn viewer_redraws_latest_snapshot_and_exports() {
    let mut session = Session::default();
    let (snap_tx, snap_rx) = watch::channel(session.snapshot());
    let (export_tx, export_rx) = mpsc::channel(2);
    let cancel = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Recorded::default()));

    let handle = tokio::spawn(viewer::run(
        RecordingRenderer { seen: seen.clone() },
        snap_rx,
        export_rx,
        cancel.clone(),
        Duration::from_millis(5),
    ));

    session.set_wireframe(true);
    snap_tx.send_replace(session.snapshot());
    tokio::time::sleep(Duration::from_millis(50)).await;
    {
        let seen = seen.lock().unwrap();
        assert!(seen.draws >= 2, "expected continuous redraws");
        assert!(seen.last.as_ref().unwrap().wireframe);
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("capture.png");
    let (reply, rx) = oneshot::channel();
    export_tx
        .send(ExportRequest {
            path: path.clone(),
            reply,
        })
        .await
        .unwrap();
    let written = tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .expect("timeout waiting for export")
        .unwrap()
        .unwrap();
    assert_eq!(written, path);
    let back = image::open(&path).unwrap().to_rgba8();
    assert_eq!(back.dimensions(), (2, 2));
    assert_eq!(back.get_pixel(0, 0).0, [9, 8, 7, 255]);

    cancel.cancel();
    let renderer = handle.await.unwrap().unwrap();
    assert!(renderer.seen.lock().unwrap().draws >= 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_export_is_reported_not_fatal() {
    let session = Session::default();
    let (_snap_tx, snap_rx) = watch::channel(session.snapshot());
    let (export_tx, export_rx) = mpsc::channel(2);
    let cancel = CancellationToken::new();
    let seen = Arc::new(Mutex::new(Recorded::default()));

    let handle = tokio::spawn(viewer::run(
        RecordingRenderer { seen: seen.clone() },
        snap_rx,
        export_rx,
        cancel.clone(),
        Duration::from_millis(5),
    ));

    let dir = tempfile::tempdir().unwrap();
    // a directory cannot be overwritten by a file
    let (reply, rx) = oneshot::channel();
    export_tx
        .send(ExportRequest {
            path: dir.path().to_path_buf(),
            reply,
        })
        .await
        .unwrap();
    let result = tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_err());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished(), "viewer must keep running");
    cancel.cancel();
    handle.await.unwrap().unwrap();
}

const DEMO_MARK: [u8; 4] = [0, 240, 255, 255];
const SCULPT_MARK: [u8; 4] = [200, 20, 20, 255];

/// Captures a flat colour telling which geometry was drawn last.
#[derive(Default)]
struct KindRenderer {
    last: Option<GeometryKind>,
}

impl Renderer for KindRenderer {
    fn draw(&mut self, input: &FrameInput, _elapsed: Duration) -> Result<()> {
        self.last = Some(input.geometry.kind);
        Ok(())
    }

    fn capture(&self) -> Result<RgbaImage> {
        let mark = match self.last {
            Some(GeometryKind::Displacement) => SCULPT_MARK,
            _ => DEMO_MARK,
        };
        Ok(RgbaImage::from_pixel(1, 1, image::Rgba(mark)))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn export_right_after_completion_captures_the_sculpture() {
    let session = Session::default();
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (notice_tx, mut notice_rx) = mpsc::channel(32);
    let (snap_tx, snap_rx) = watch::channel(session.snapshot());
    let (export_tx, export_rx) = mpsc::channel(2);
    let cancel = CancellationToken::new();

    let controller = tokio::spawn(controller::run(
        session,
        cmd_rx,
        snap_tx,
        notice_tx,
        cancel.clone(),
        ControllerOptions {
            stage_interval: Duration::from_millis(10),
            max_texture_dim: 256,
        },
    ));
    // one frame at startup, then nothing the export could piggyback on
    let viewer = tokio::spawn(viewer::run(
        KindRenderer::default(),
        snap_rx,
        export_rx,
        cancel.clone(),
        Duration::from_secs(3600),
    ));

    let img = RgbaImage::from_pixel(64, 64, image::Rgba([255, 0, 0, 255]));
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    cmd_tx
        .send(SessionCommand::Submit(ImageSubmission::new(
            "red.png",
            "image/png",
            bytes.into_inner(),
        )))
        .await
        .unwrap();

    loop {
        let notice = tokio::time::timeout(Duration::from_secs(2), notice_rx.recv())
            .await
            .expect("timeout waiting for completion")
            .unwrap();
        if matches!(notice, SessionNotice::Completed { .. }) {
            break;
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sculpture.png");
    let (reply, rx) = oneshot::channel();
    export_tx
        .send(ExportRequest {
            path: path.clone(),
            reply,
        })
        .await
        .unwrap();
    tokio::time::timeout(Duration::from_secs(1), rx)
        .await
        .expect("timeout waiting for export")
        .unwrap()
        .unwrap();
    let back = image::open(&path).unwrap().to_rgba8();
    assert_eq!(back.get_pixel(0, 0).0, SCULPT_MARK);

    cancel.cancel();
    controller.await.unwrap().unwrap();
    let renderer = viewer.await.unwrap().unwrap();
    assert_eq!(renderer.last, Some(GeometryKind::Displacement));
}
