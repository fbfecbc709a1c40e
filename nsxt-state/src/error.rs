//! Errors raised while loading, saving or locking the state file

use std::path::PathBuf;

use thiserror::Error;

use crate::lock::StateLock;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state is locked: {0}")]
    Locked(StateLock),

    #[error("state is not locked (lock {0})")]
    NotLocked(String),

    #[error("state lock {held} is held, not {presented}")]
    LockHeldByOther { held: String, presented: String },

    #[error("{} is not a valid state file: {}", .path.display(), .message)]
    Corrupt { path: PathBuf, message: String },

    #[error("{} belongs to another state (lineage {}, got {})", .path.display(), .recorded, .presented)]
    ForeignLineage {
        path: PathBuf,
        recorded: String,
        presented: String,
    },

    #[error("state was recorded against NSX manager '{recorded}', not '{current}'")]
    ForeignManager { recorded: String, current: String },

    #[error("{}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type StateResult<T> = Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_error_describes_the_holder() {
        let lock = StateLock::acquire("apply");
        let message = StateError::Locked(lock.clone()).to_string();
        assert!(message.starts_with("state is locked: apply by "));
        assert!(message.contains(&lock.id));
    }

    #[test]
    fn io_error_names_the_file() {
        let err = StateError::io(
            "/tmp/nsxt.state.json",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "/tmp/nsxt.state.json: denied");
    }
}
