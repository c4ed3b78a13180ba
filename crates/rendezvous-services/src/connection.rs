//! Per-connection state: one `ConnectionContext` per accepted transport.
//!
//! Lifecycle: `Connected` → `Registered(name)` → `Closed`. A registered
//! connection may register again under another name. Routing follows the
//! latest name, and on close every name still bound to the connection is
//! released.

use rendezvous_core::Identity;

use crate::registry::{ClientRegistry, ConnectionId, PeerHandle};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, no identity claimed yet.
    Connected,
    Registered(Identity),
    Closed,
}

#[derive(Debug)]
pub struct ConnectionContext {
    handle: PeerHandle,
    state: ConnectionState,
}

impl ConnectionContext {
    pub fn new(handle: PeerHandle) -> Self {
        Self {
            handle,
            state: ConnectionState::Connected,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn handle(&self) -> &PeerHandle {
        &self.handle
    }

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Identity this connection currently answers to.
    pub fn identity(&self) -> Option<&str> {
        match &self.state {
            ConnectionState::Registered(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnectionState::Closed
    }

    /// Bind a newly claimed identity. Returns the name it replaces.
    pub(crate) fn bind(&mut self, identity: Identity) -> Option<Identity> {
        match std::mem::replace(&mut self.state, ConnectionState::Registered(identity)) {
            ConnectionState::Registered(previous) => Some(previous),
            _ => None,
        }
    }

    /// Enter `Closed` and release every registry entry this connection
    /// still owns. Returns the released identities. Idempotent.
    pub fn close(&mut self, registry: &ClientRegistry) -> Vec<Identity> {
        let previous = std::mem::replace(&mut self.state, ConnectionState::Closed);
        self.handle.close();
        let ConnectionState::Registered(name) = previous else {
            return Vec::new();
        };

        let released = registry.release_all(self.handle.id());
        if released.is_empty() {
            tracing::debug!(
                identity = %name,
                conn = %self.handle.id(),
                "identity already rebound, nothing to release"
            );
        }
        for identity in &released {
            tracing::info!(identity = %identity, conn = %self.handle.id(), "client disconnected");
        }
        released
    }
}
