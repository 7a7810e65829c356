//! Shared error type for the FitTrack crates

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures while opening the store or reading settings
#[derive(Error, Debug)]
pub enum Error {
    /// Store could not be opened, created or synced
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable, malformed, or missing a required value
    #[error("Configuration error: {0}")]
    Config(String),

    /// Setting value outside its accepted set (e.g. an unknown batch policy)
    #[error("Invalid setting: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_failure() {
        let err = Error::InvalidInput("on_batch_failure = \"retry\"".to_string());
        assert_eq!(err.to_string(), "Invalid setting: on_batch_failure = \"retry\"");

        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "seed.json").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
