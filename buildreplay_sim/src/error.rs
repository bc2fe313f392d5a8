//! Driver-level errors.

use buildreplay_core::{EpisodeError, SliceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("episode rejected: {0}")]
    Episode(#[from] EpisodeError),

    #[error("slice filter rejected: {0}")]
    Slice(#[from] SliceError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no episode input: pass --actions and --valid, or --synthetic <seed>")]
    NoInput,
}

impl DriverError {
    pub fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }
}
