//! # styrene-awdl
//!
//! AWDL interface bridge for the Styrene mesh node.
//!
//! Wireless peer-discovery transports such as AWDL do not hand the node a
//! socket. Frames arrive and leave through an external notification
//! mechanism instead. This crate gives each such link a named in-process
//! duplex pipe that the mesh link layer can treat as a byte stream:
//!
//! - [`pipe`]: two single-slot queues, one per direction. Non-blocking reads,
//!   back-pressured writes.
//! - [`AwdlManager`]: creates a named interface, binds its pipe to a link from
//!   a [`LinkFactory`], runs the link's handler on its own task and tears it
//!   all down again on [`AwdlManager::shutdown`].
//! - [`InterfaceRegistry`]: the name-indexed set of live interfaces.
//!
//! Bytes are carried opaquely. Framing, encryption and routing belong to the
//! link layer.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use styrene_awdl::{AwdlConfig, AwdlManager, LoopbackLinks};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = AwdlConfig::default();
//! let links = Arc::new(LoopbackLinks::from_config(&config));
//! let manager = AwdlManager::new(config, links);
//!
//! let awdl0 = manager.create("awdl0", "aa:bb", "cc:dd").unwrap();
//! awdl0.send_inbound(&[1, 2, 3]).await.unwrap();
//! assert_eq!(awdl0.recv_outbound().await.unwrap(), vec![1, 2, 3]);
//!
//! manager.shutdown("awdl0").await.unwrap();
//! assert!(manager.get_interface("awdl0").is_none());
//! # }
//! ```

pub mod config;
pub mod error;
pub mod interface;
pub mod link;
pub mod loopback;
pub mod manager;
pub mod pipe;
pub mod registry;

pub use config::{AwdlConfig, InterfaceConfig};
pub use error::AwdlError;
pub use interface::AwdlInterface;
pub use link::{Link, LinkError, LinkFactory, LinkKind, LinkRequest, PeerIdentity, PeerSlot};
pub use loopback::{LoopbackLink, LoopbackLinks};
pub use manager::AwdlManager;
pub use pipe::{PipeEnd, PipeError};
pub use registry::InterfaceRegistry;
