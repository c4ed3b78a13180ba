//! rendezvous-services: client registry, message router, and connection
//! state for the signaling relay.

pub mod connection;
pub mod expiry;
pub mod registry;
pub mod router;

pub use connection::{ConnectionContext, ConnectionState};
pub use expiry::expiry_loop;
pub use registry::{ClientRegistry, ConnectionId, ForwardError, PeerHandle};
pub use router::{MessageRouter, RouteOutcome};
