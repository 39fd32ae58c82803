use std::io;

use thiserror::Error;

/// Everything a command handler can fail with. Each variant renders as a
/// short user-facing message; the dispatch boundary never lets one escape
/// as a crash.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("missing {0}")]
    MissingArgument(&'static str),
    #[error("index {index} is out of range; the list has {len} image(s)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid index or range '{0}'")]
    InvalidRangeSyntax(String),
    #[error("image download failed: {0}")]
    Fetch(String),
    #[error("could not decode image data: {0}")]
    Decode(String),
    #[error("could not encode rendered image: {0}")]
    Encode(String),
    #[error("image list storage failed: {0}")]
    Store(#[from] io::Error),
}
