//! Client registry: maps a registered identity to its live connection.
//!
//! The registry is the single source of truth for routability: a frame is
//! only ever forwarded to a handle found here, and nothing is queued for an
//! identity that is absent.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use rendezvous_core::Identity;

/// Process-unique id of one accepted transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForwardError {
    /// The recipient's bounded queue overflowed; its connection is being reset.
    #[error("recipient outbound queue full")]
    QueueFull,
    /// The recipient's writer is gone.
    #[error("recipient connection closed")]
    Closed,
}

/// Outbound side of a connection: a bounded frame queue drained by the
/// connection's writer, plus the token that tears the connection down.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<String>,
    closer: CancellationToken,
}

impl PeerHandle {
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<String>, closer: CancellationToken) -> Self {
        Self {
            id,
            outbound,
            closer,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue one frame without waiting.
    ///
    /// A full queue resets the connection rather than blocking the sender
    /// or buffering without bound.
    pub fn deliver(&self, frame: &str) -> Result<(), ForwardError> {
        if self.closer.is_cancelled() {
            return Err(ForwardError::Closed);
        }
        match self.outbound.try_send(frame.to_owned()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.closer.cancel();
                Err(ForwardError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ForwardError::Closed),
        }
    }

    /// Ask the owning connection to shut down.
    pub fn close(&self) {
        self.closer.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closer.is_cancelled() || self.outbound.is_closed()
    }
}

#[derive(Debug)]
struct ConnectionRecord {
    handle: PeerHandle,
    last_seen: Instant,
}

/// Identity → live connection. Cheap to clone; all clones share one map.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<DashMap<Identity, ConnectionRecord>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the binding for `identity`.
    ///
    /// Last writer wins. The displaced handle is returned but not closed;
    /// that connection stays open, orphaned from routing.
    pub fn register(&self, identity: Identity, handle: PeerHandle) -> Option<PeerHandle> {
        let record = ConnectionRecord {
            handle,
            last_seen: Instant::now(),
        };
        self.clients.insert(identity, record).map(|old| old.handle)
    }

    /// Current handle for `identity`. Does not refresh `last_seen`.
    pub fn lookup(&self, identity: &str) -> Option<PeerHandle> {
        self.clients.get(identity).map(|r| r.handle.clone())
    }

    /// Refresh `last_seen` for `identity`.
    pub fn touch(&self, identity: &str) {
        if let Some(mut record) = self.clients.get_mut(identity) {
            record.last_seen = Instant::now();
        }
    }

    /// Refresh `last_seen` only if `identity` is still bound to `owner`.
    pub fn touch_owned(&self, identity: &str, owner: ConnectionId) {
        if let Some(mut record) = self.clients.get_mut(identity) {
            if record.handle.id == owner {
                record.last_seen = Instant::now();
            }
        }
    }

    /// Remove `identity` unconditionally. Missing entries are a no-op.
    pub fn remove(&self, identity: &str) -> bool {
        self.clients.remove(identity).is_some()
    }

    /// Remove `identity` only if it is still bound to `owner`.
    ///
    /// Used on disconnect, so a connection that lost its name to a newer
    /// registration cannot deregister the new owner.
    pub fn release(&self, identity: &str, owner: ConnectionId) -> bool {
        self.clients
            .remove_if(identity, |_, record| record.handle.id == owner)
            .is_some()
    }

    /// Remove every entry still bound to `owner`, under any name.
    ///
    /// A connection that renamed itself holds one entry per name it
    /// registered that nobody has since taken over. Returns the removed
    /// identities, sorted.
    pub fn release_all(&self, owner: ConnectionId) -> Vec<Identity> {
        let mut released = Vec::new();
        self.clients.retain(|identity, record| {
            if record.handle.id == owner {
                released.push(identity.clone());
                false
            } else {
                true
            }
        });
        released.sort();
        released
    }

    /// Remove every entry idle for longer than `threshold`.
    ///
    /// Returns the evicted identities with their handles so the caller can
    /// close the connections.
    pub fn evict_stale_older_than(&self, threshold: Duration) -> Vec<(Identity, PeerHandle)> {
        let mut evicted = Vec::new();
        self.clients.retain(|identity, record| {
            if record.last_seen.elapsed() > threshold {
                evicted.push((identity.clone(), record.handle.clone()));
                false
            } else {
                true
            }
        });
        evicted
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<Identity> {
        let mut names: Vec<Identity> = self.clients.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.clients.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
