//! HTTP and WebSocket handlers.

pub mod signal;
pub mod users;

use rendezvous_services::{ClientRegistry, MessageRouter};

#[derive(Clone)]
pub struct ApiState {
    pub registry: ClientRegistry,
    pub router: MessageRouter,
    /// Per-connection outbound queue depth, in frames.
    pub outbound_queue: usize,
}

impl ApiState {
    pub fn new(registry: ClientRegistry, outbound_queue: usize) -> Self {
        Self {
            router: MessageRouter::new(registry.clone()),
            registry,
            outbound_queue: outbound_queue.max(1),
        }
    }
}

// Re-export handler functions for use in router setup.
pub use signal::handle_signal;
pub use users::handle_get_users;
