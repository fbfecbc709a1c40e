//! Advisory lock taken by apply, destroy and import
//!
//! The lock is a small JSON document next to the state file. A lock past
//! its expiry is stale and may be taken over by the next command.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// How long a lock stays valid when its holder never releases it
pub const LOCK_TTL_MINUTES: i64 = 15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateLock {
    pub id: String,
    /// Command holding the lock ("apply", "destroy", "import")
    pub operation: String,
    /// user@host of the holder
    pub owner: String,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StateLock {
    pub fn acquire(operation: impl Into<String>) -> Self {
        Self::with_ttl(operation, Duration::minutes(LOCK_TTL_MINUTES))
    }

    pub fn with_ttl(operation: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
            owner: current_owner(),
            acquired_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_stale(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl fmt::Display for StateLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} by {} since {} (lock {}",
            self.operation,
            self.owner,
            self.acquired_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.id
        )?;
        if self.is_stale() {
            write!(f, ", stale)")
        } else {
            write!(f, ", until {})", self.expires_at.format("%H:%M:%S UTC"))
        }
    }
}

fn current_owner() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}@{}", user, host)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_lock_is_held_by_this_process() {
        let lock = StateLock::acquire("apply");
        assert_eq!(lock.operation, "apply");
        assert!(lock.owner.contains('@'));
        assert_eq!(
            lock.expires_at - lock.acquired_at,
            Duration::minutes(LOCK_TTL_MINUTES)
        );
        assert!(!lock.is_stale());
        assert!(lock.to_string().contains("until"));
    }

    #[test]
    fn expired_lock_is_stale() {
        let lock = StateLock::with_ttl("destroy", Duration::seconds(-1));
        assert!(lock.is_stale());
        assert!(lock.to_string().ends_with(", stale)"));
    }
}
