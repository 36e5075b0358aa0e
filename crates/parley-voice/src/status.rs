//! Observable connection status shared with the UI layer.
//!
//! The cell keeps a single [`ConnectionStatus`] together with a version
//! counter that increments on every write. Writers that raced with someone
//! else can detect it through [`StatusCell::set_if_version`], and readers
//! can follow changes through a [`watch::Receiver`].

use parley_types::ConnectionStatus;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// A status value and the write that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: ConnectionStatus,
    pub version: u64,
}

/// Cloneable handle to the shared status cell.
#[derive(Debug, Clone)]
pub struct StatusCell {
    tx: Arc<watch::Sender<StatusSnapshot>>,
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    /// Creates a cell holding `Disconnected` at version 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusSnapshot {
            status: ConnectionStatus::Disconnected,
            version: 0,
        });
        Self { tx: Arc::new(tx) }
    }

    pub fn get(&self) -> ConnectionStatus {
        self.tx.borrow().status
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        *self.tx.borrow()
    }

    pub fn version(&self) -> u64 {
        self.tx.borrow().version
    }

    /// Unconditional last-write-wins update. Returns the new version.
    pub fn set(&self, status: ConnectionStatus) -> u64 {
        let mut version = 0;
        self.tx.send_modify(|snapshot| {
            snapshot.status = status;
            snapshot.version += 1;
            version = snapshot.version;
        });
        debug!(%status, version, "connection status updated");
        version
    }

    /// Moves to `next` only if the current status is one of `allowed`.
    ///
    /// Returns the new version on success, or the status that blocked the
    /// transition.
    pub fn compare_and_set(
        &self,
        allowed: &[ConnectionStatus],
        next: ConnectionStatus,
    ) -> Result<u64, ConnectionStatus> {
        let mut outcome = Err(next);
        self.tx.send_if_modified(|snapshot| {
            if allowed.contains(&snapshot.status) {
                snapshot.status = next;
                snapshot.version += 1;
                outcome = Ok(snapshot.version);
                true
            } else {
                outcome = Err(snapshot.status);
                false
            }
        });
        if let Ok(version) = outcome {
            debug!(status = %next, version, "connection status updated");
        }
        outcome
    }

    /// Writes `status` only if nobody else wrote since `expected_version`.
    ///
    /// Returns the new version, or `None` when the write was stale.
    pub fn set_if_version(&self, expected_version: u64, status: ConnectionStatus) -> Option<u64> {
        let mut written = None;
        self.tx.send_if_modified(|snapshot| {
            if snapshot.version != expected_version {
                return false;
            }
            snapshot.status = status;
            snapshot.version += 1;
            written = Some(snapshot.version);
            true
        });
        match written {
            Some(version) => debug!(%status, version, "connection status updated"),
            None => debug!(%status, expected_version, "discarding stale status write"),
        }
        written
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.tx.subscribe()
    }
}
