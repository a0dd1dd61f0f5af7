use thiserror::Error;

/// Why an image submission did not lead to a synthesis run.
///
/// None of these are surfaced to the user; they exist for logging and for
/// callers that want to know whether a resubmission makes sense.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The submission's MIME type does not start with `image/`.
    #[error("not an image: {mime}")]
    NotAnImage { mime: String },

    /// A run or its decode is already in flight.
    #[error("synthesis already in progress")]
    Busy,

    /// The bytes could not be decoded into a texture.
    #[error("decode failed: {0}")]
    Decode(#[from] image::ImageError),

    /// Decoding produced an image with no pixels.
    #[error("image has no pixels")]
    Empty,

    /// The decode task panicked or was aborted.
    #[error("decode task did not finish")]
    Interrupted,

    /// The file backing the submission could not be read.
    #[error(transparent)]
    Read(#[from] std::io::Error),
}
