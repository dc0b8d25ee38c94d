//! Error types for the soft17 crate.

use thiserror::Error;

/// Errors raised at the crate boundary.
///
/// The simulation itself is closed: shoe exhaustion reshuffles and table
/// misses fall back to defaults, so only conversions and configuration fail.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid action {0} (expected 0 = stand or 1 = draw)")]
    InvalidAction(u8),

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("unknown algorithm '{0}' (expected 'q-learning' or 'sarsa')")]
    InvalidAlgorithm(String),
}

impl Error {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Error::InvalidConfiguration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
