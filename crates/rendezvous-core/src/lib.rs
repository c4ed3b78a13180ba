//! rendezvous-core: wire envelope, identity type, and configuration.
//! All other rendezvous crates depend on this one.

pub mod config;
pub mod envelope;

pub use envelope::{Envelope, EnvelopeError, FrameKind, Identity};
