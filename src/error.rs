use thiserror::Error;

/// Crate-wide error type.
///
/// Validation failures surface at API entry points; I/O and decode failures
/// propagate from the collaborators that produced them.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "im-io")]
    #[error("image failure: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, Error>;
