//! Message router: classifies one inbound frame and acts on it.
//!
//! `register` frames bind an identity in the registry. Every other frame
//! is forwarded, as the exact text received, to the connection registered
//! under its `to` field. Nothing is ever sent back to the sender: drops
//! are reported through `RouteOutcome` and a `warn!` record only.

use rendezvous_core::{Envelope, FrameKind, Identity};

use crate::connection::ConnectionContext;
use crate::registry::{ClientRegistry, ForwardError};

/// What the router did with a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The connection now answers to `identity`. `displaced` is set when a
    /// different connection held the name before.
    Registered { identity: Identity, displaced: bool },
    /// Queued on the recipient's outbound channel.
    Forwarded {
        kind: FrameKind,
        from: Option<Identity>,
        to: Identity,
    },
    /// Not valid JSON, no `type`, or `register` without a name.
    Malformed { reason: String },
    /// Routable frame with no (or an empty) `to`.
    MissingRecipient { kind: FrameKind },
    /// Nobody is registered under `to`.
    UnknownRecipient { kind: FrameKind, to: Identity },
    /// The recipient was found but could not accept the frame.
    ForwardFailed { to: Identity, error: ForwardError },
}

impl RouteOutcome {
    /// True for every outcome that silently discarded the frame.
    pub fn is_drop(&self) -> bool {
        !matches!(self, Self::Registered { .. } | Self::Forwarded { .. })
    }
}

#[derive(Clone)]
pub struct MessageRouter {
    registry: ClientRegistry,
}

impl MessageRouter {
    pub fn new(registry: ClientRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Route one raw frame received on `ctx`.
    pub fn handle(&self, ctx: &mut ConnectionContext, raw: &str) -> RouteOutcome {
        let envelope = match Envelope::parse(raw) {
            Ok(env) => env,
            Err(e) => {
                tracing::warn!(conn = %ctx.id(), error = %e, "malformed frame dropped");
                return RouteOutcome::Malformed {
                    reason: e.to_string(),
                };
            }
        };

        let outcome = if envelope.kind.is_routable() {
            self.forward(ctx, envelope, raw)
        } else {
            self.register(ctx, envelope)
        };

        if let Some(identity) = ctx.identity() {
            self.registry.touch_owned(identity, ctx.id());
        }

        outcome
    }

    fn register(&self, ctx: &mut ConnectionContext, envelope: Envelope) -> RouteOutcome {
        // Envelope::parse guarantees a non-empty name on register frames.
        let identity = envelope.name.unwrap_or_default();

        if let Some(previous) = ctx.bind(identity.clone()) {
            if previous != identity {
                tracing::info!(
                    conn = %ctx.id(),
                    previous = %previous,
                    identity = %identity,
                    "connection re-registered under a new name"
                );
            }
        }

        let displaced = self
            .registry
            .register(identity.clone(), ctx.handle().clone())
            .is_some_and(|old| old.id() != ctx.id());

        if displaced {
            tracing::info!(identity = %identity, conn = %ctx.id(), "identity taken over by new connection");
        }
        tracing::info!(identity = %identity, conn = %ctx.id(), "client registered");

        RouteOutcome::Registered {
            identity,
            displaced,
        }
    }

    fn forward(&self, ctx: &ConnectionContext, envelope: Envelope, raw: &str) -> RouteOutcome {
        let from = ctx.identity().map(str::to_owned);

        let Some(to) = envelope.recipient().map(str::to_owned) else {
            tracing::warn!(
                conn = %ctx.id(),
                from = from.as_deref().unwrap_or("-"),
                kind = %envelope.kind,
                "frame without recipient dropped"
            );
            return RouteOutcome::MissingRecipient {
                kind: envelope.kind,
            };
        };

        let Some(recipient) = self.registry.lookup(&to) else {
            tracing::warn!(
                conn = %ctx.id(),
                from = from.as_deref().unwrap_or("-"),
                to = %to,
                kind = %envelope.kind,
                "recipient not found"
            );
            return RouteOutcome::UnknownRecipient {
                kind: envelope.kind,
                to,
            };
        };

        match recipient.deliver(raw) {
            Ok(()) => {
                tracing::debug!(
                    from = from.as_deref().unwrap_or("-"),
                    to = %to,
                    kind = %envelope.kind,
                    "frame forwarded"
                );
                RouteOutcome::Forwarded {
                    kind: envelope.kind,
                    from,
                    to,
                }
            }
            Err(error) => {
                if error == ForwardError::Closed {
                    self.registry.release(&to, recipient.id());
                }
                tracing::warn!(
                    from = from.as_deref().unwrap_or("-"),
                    to = %to,
                    kind = %envelope.kind,
                    error = %error,
                    "forwarding failed"
                );
                RouteOutcome::ForwardFailed { to, error }
            }
        }
    }
}
