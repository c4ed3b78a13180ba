//! Signaling envelope: the JSON object carried by every text frame.
//!
//! Only `type`, `name`, `to` and `from` are read. Everything else in the
//! object (`sdp`, `candidate`, ...) is negotiation payload and is never
//! parsed into a typed field: the relay forwards the original frame text,
//! not a re-serialization of this struct.

use serde_json::{Map, Value};

/// Self-declared name a connection registers under. Sole addressing key.
pub type Identity = String;

/// Well-known `type` strings.
pub mod frame_types {
    pub const REGISTER: &str = "register";
    pub const OFFER: &str = "offer";
    pub const ANSWER: &str = "answer";
    pub const ICE_CANDIDATE: &str = "ice-candidate";
}

/// Frame discriminator.
///
/// Unknown `type` values are kept verbatim in `Other` and routed exactly
/// like the well-known negotiation kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind {
    Register,
    Offer,
    Answer,
    IceCandidate,
    Other(String),
}

impl FrameKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            frame_types::REGISTER => Self::Register,
            frame_types::OFFER => Self::Offer,
            frame_types::ANSWER => Self::Answer,
            frame_types::ICE_CANDIDATE => Self::IceCandidate,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Register => frame_types::REGISTER,
            Self::Offer => frame_types::OFFER,
            Self::Answer => frame_types::ANSWER,
            Self::IceCandidate => frame_types::ICE_CANDIDATE,
            Self::Other(s) => s,
        }
    }

    /// Everything except `register` is addressed to a recipient.
    pub fn is_routable(&self) -> bool {
        !matches!(self, Self::Register)
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing header of a parsed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub kind: FrameKind,
    /// Identity being claimed. Always `Some` and non-empty for `register`.
    pub name: Option<Identity>,
    /// Target identity. May be absent; the router decides what to do then.
    pub to: Option<Identity>,
    /// Informational only, never trusted for routing.
    pub from: Option<Identity>,
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("invalid envelope JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("envelope without a string type")]
    MissingType,
    #[error("register frame without a name")]
    MissingName,
}

/// String value of `key`. Other JSON types count as absent.
fn string_field(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

impl Envelope {
    /// Parse the routing header out of a raw frame.
    ///
    /// Fails on invalid JSON, anything but a JSON object, a missing or
    /// non-string `type`, or a `register` frame without a non-empty string
    /// `name`. A non-string `to` or `from` is treated as absent.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        let mut object: Map<String, Value> = serde_json::from_str(raw)?;
        let kind = string_field(&mut object, "type")
            .map(|t| FrameKind::parse(&t))
            .ok_or(EnvelopeError::MissingType)?;
        let name = string_field(&mut object, "name");

        if kind == FrameKind::Register && name.as_deref().map_or(true, str::is_empty) {
            return Err(EnvelopeError::MissingName);
        }

        Ok(Self {
            kind,
            name,
            to: string_field(&mut object, "to"),
            from: string_field(&mut object, "from"),
        })
    }

    /// Target identity, treating an empty string as absent.
    pub fn recipient(&self) -> Option<&str> {
        self.to.as_deref().filter(|to| !to.is_empty())
    }
}
