//! Boundary between AWDL interfaces and the mesh link layer.
//!
//! The link layer owns connection setup and the handshake with the remote
//! node. It receives the link end of a [`pipe`](crate::pipe) through a
//! [`LinkRequest`] and runs its own processing loop against it until the
//! link's closed signal fires.

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio_util::sync::CancellationToken;

use crate::pipe::{PipeEnd, PipeError};

/// Transport tag handed to the link layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkKind(Cow<'static, str>);

impl LinkKind {
    /// Apple Wireless Direct Link.
    pub const AWDL: LinkKind = LinkKind(Cow::Borrowed("awdl"));

    pub fn new(kind: impl Into<String>) -> Self {
        Self(Cow::Owned(kind.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for LinkKind {
    fn default() -> Self {
        Self::AWDL
    }
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub const PEER_IDENTITY_LEN: usize = 32;

/// Identity of the node at the far end of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerIdentity([u8; PEER_IDENTITY_LEN]);

impl PeerIdentity {
    pub fn new(bytes: [u8; PEER_IDENTITY_LEN]) -> Self {
        Self(bytes)
    }

    /// Derives an identity from an endpoint identifier.
    pub fn from_endpoint(endpoint: &str) -> Self {
        Self(Sha256::digest(endpoint.as_bytes()).into())
    }

    pub fn as_bytes(&self) -> &[u8; PEER_IDENTITY_LEN] {
        &self.0
    }
}

impl fmt::Display for PeerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Write-once peer reference shared between an interface and its link.
///
/// The link fills it in once the handshake has identified the remote node.
#[derive(Debug, Clone, Default)]
pub struct PeerSlot(Arc<OnceLock<PeerIdentity>>);

impl PeerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if a peer was already attached.
    pub fn attach(&self, peer: PeerIdentity) -> bool {
        self.0.set(peer).is_ok()
    }

    pub fn get(&self) -> Option<PeerIdentity> {
        self.0.get().copied()
    }
}

/// Everything the link layer needs to bind a new link to an interface.
#[derive(Debug)]
pub struct LinkRequest {
    /// Link end of the interface's pipe.
    pub stream: PipeEnd,
    pub name: String,
    pub kind: LinkKind,
    /// Opaque endpoint identifiers, validated (if at all) by the link layer.
    pub local: String,
    pub remote: String,
    pub mtu: usize,
    pub peer: PeerSlot,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum LinkError {
    #[error("link already exists: {name}")]
    DuplicateName { name: String },

    #[error("invalid link request: {message}")]
    InvalidRequest { message: String },

    #[error("link stream error: {0}")]
    Stream(#[from] PipeError),

    #[error("link error: {message}")]
    Other { message: String },
}

impl LinkError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }
}

/// A live link created by a [`LinkFactory`].
#[async_trait]
pub trait Link: Send + Sync {
    /// Processing loop. Runs on its own task until [`Link::closed_signal`]
    /// fires or the stream closes.
    async fn run(&self) -> Result<(), LinkError>;

    /// One-shot broadcast telling [`Link::run`] to stop.
    fn closed_signal(&self) -> &CancellationToken;
}

/// Link layer entry point used by [`AwdlManager`](crate::AwdlManager).
pub trait LinkFactory: Send + Sync {
    fn create_link(&self, request: LinkRequest) -> Result<Arc<dyn Link>, LinkError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_slot_is_write_once() {
        let slot = PeerSlot::new();
        let shared = slot.clone();
        assert_eq!(slot.get(), None);

        let first = PeerIdentity::from_endpoint("cc:dd");
        assert!(shared.attach(first));
        assert!(!slot.attach(PeerIdentity::new([7; PEER_IDENTITY_LEN])));
        assert_eq!(slot.get(), Some(first));
    }

    #[test]
    fn peer_identity_is_stable_per_endpoint() {
        let a = PeerIdentity::from_endpoint("cc:dd");
        assert_eq!(a, PeerIdentity::from_endpoint("cc:dd"));
        assert_ne!(a, PeerIdentity::from_endpoint("cc:de"));
        assert_eq!(a.to_string().len(), PEER_IDENTITY_LEN * 2);
    }

    #[test]
    fn link_kind_defaults_to_awdl() {
        assert_eq!(LinkKind::default().as_str(), "awdl");
        assert_eq!(LinkKind::new("awdl"), LinkKind::AWDL);
        assert_eq!(LinkKind::new("wifi-aware").to_string(), "wifi-aware");
    }
}
