//! Image handles and submission decoding.
//!
//! A [`Texture`] is the opaque handle the rest of the crate passes around:
//! an RGBA8 pixel buffer plus dimensions, shared behind an `Arc` so that
//! descriptors can be cloned every frame without copying pixels.

use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use image::RgbaImage;
use image::imageops::FilterType;
use tracing::debug;

use crate::error::SubmissionError;

const PLACEHOLDER_ID: u64 = 0;
static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone)]
pub struct Texture {
    id: u64,
    image: Arc<RgbaImage>,
}

impl Texture {
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self {
            id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
            image: Arc::new(image),
        }
    }

    /// 1x1 fully transparent stand-in used whenever no drawable image exists.
    pub fn placeholder() -> Self {
        Self {
            id: PLACEHOLDER_ID,
            image: Arc::new(RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 0]))),
        }
    }

    /// Stable identity; two clones of one decode share it.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_placeholder(&self) -> bool {
        self.id == PLACEHOLDER_ID
    }

    pub fn is_drawable(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Bilinear sample of the red channel in `[0, 1]`.
    ///
    /// `v = 1` addresses the top row of the image, matching how the plane's
    /// UVs are laid out.
    pub fn sample_red(&self, u: f32, v: f32) -> f32 {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return 0.0;
        }
        let x = u.clamp(0.0, 1.0) * (w - 1) as f32;
        let y = (1.0 - v.clamp(0.0, 1.0)) * (h - 1) as f32;
        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(w - 1);
        let y1 = (y0 + 1).min(h - 1);
        let fx = x - x0 as f32;
        let fy = y - y0 as f32;

        let red = |px: u32, py: u32| f32::from(self.image.get_pixel(px, py)[0]) / 255.0;
        let top = red(x0, y0) * (1.0 - fx) + red(x1, y0) * fx;
        let bottom = red(x0, y1) * (1.0 - fx) + red(x1, y1) * fx;
        top * (1.0 - fy) + bottom * fy
    }

    /// Nearest-texel colour lookup with the same UV convention as
    /// [`Texture::sample_red`].
    pub fn sample_rgba(&self, u: f32, v: f32) -> [u8; 4] {
        let (w, h) = self.image.dimensions();
        if w == 0 || h == 0 {
            return [0, 0, 0, 0];
        }
        let x = (u.clamp(0.0, 1.0) * (w - 1) as f32).round() as u32;
        let y = ((1.0 - v.clamp(0.0, 1.0)) * (h - 1) as f32).round() as u32;
        self.image.get_pixel(x, y).0
    }
}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A file-like object handed to the session: a display name, a MIME type
/// and the raw encoded bytes.
#[derive(Clone)]
pub struct ImageSubmission {
    pub name: String,
    pub mime: String,
    pub bytes: Arc<[u8]>,
}

impl ImageSubmission {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file, deriving its MIME type from the extension.
    pub fn from_path(path: &Path) -> Result<Self, SubmissionError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .into_owned();
        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub fn is_image(&self) -> bool {
        is_image_mime(&self.mime)
    }
}

/// [`ImageSubmission::from_path`] off the async executor.
pub async fn read_submission(path: &Path) -> Result<ImageSubmission, SubmissionError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || ImageSubmission::from_path(&path))
        .await
        .map_err(|_| SubmissionError::Interrupted)?
}

impl fmt::Debug for ImageSubmission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageSubmission")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("len", &self.bytes.len())
            .finish()
    }
}

pub fn is_image_mime(mime: &str) -> bool {
    mime.starts_with("image/")
}

pub fn mime_for_path(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

/// Decode a submission into a texture.
///
/// Applies EXIF orientation when present and downscales so neither side
/// exceeds `max_dim`. Blocking; run it off the async executor.
pub fn decode_submission(
    submission: &ImageSubmission,
    max_dim: u32,
) -> Result<Texture, SubmissionError> {
    if !submission.is_image() {
        return Err(SubmissionError::NotAnImage {
            mime: submission.mime.clone(),
        });
    }
    let mut img = image::load_from_memory(&submission.bytes)?.to_rgba8();
    if img.width() == 0 || img.height() == 0 {
        return Err(SubmissionError::Empty);
    }

    if let Some(orientation) = read_orientation(&submission.bytes) {
        debug!(orientation, name = %submission.name, "applying exif orientation");
        img = apply_orientation(img, orientation);
    }

    let img = fit_within(img, max_dim);
    Ok(Texture::from_rgba(img))
}

fn read_orientation(bytes: &[u8]) -> Option<u16> {
    let exif = exif::Reader::new()
        .read_from_container(&mut Cursor::new(bytes))
        .ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    field.value.get_uint(0).map(|v| v as u16)
}

fn apply_orientation(img: RgbaImage, orientation: u16) -> RgbaImage {
    use image::imageops::{flip_horizontal, flip_vertical, rotate90, rotate180, rotate270};
    match orientation {
        2 => flip_horizontal(&img),
        3 => rotate180(&img),
        4 => flip_vertical(&img),
        // transpose
        5 => flip_horizontal(&rotate90(&img)),
        6 => rotate90(&img),
        // transverse
        7 => flip_horizontal(&rotate270(&img)),
        8 => rotate270(&img),
        _ => img,
    }
}

fn fit_within(img: RgbaImage, max_dim: u32) -> RgbaImage {
    let (w, h) = img.dimensions();
    let longest = w.max(h);
    if max_dim == 0 || longest <= max_dim {
        return img;
    }
    let scale = max_dim as f32 / longest as f32;
    let nw = ((w as f32 * scale).round() as u32).max(1);
    let nh = ((h as f32 * scale).round() as u32).max(1);
    debug!(from = ?(w, h), to = ?(nw, nh), "downscaling oversized image");
    image::imageops::resize(&img, nw, nh, FilterType::Triangle)
}
