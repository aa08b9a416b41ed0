//! Loopback link layer.
//!
//! Echoes every inbound frame back out on the same interface and attaches a
//! peer identity derived from the remote endpoint on the first frame. Useful
//! for exercising interfaces without a full mesh node behind them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::config::AwdlConfig;
use crate::link::{Link, LinkError, LinkFactory, LinkRequest, PeerIdentity, PeerSlot};
use crate::pipe::{PipeEnd, PipeError};

type LiveNames = Arc<Mutex<HashSet<String>>>;

fn lock_names(names: &LiveNames) -> std::sync::MutexGuard<'_, HashSet<String>> {
    names.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Factory for [`LoopbackLink`]s. Link names are unique while a link runs.
#[derive(Debug, Clone)]
pub struct LoopbackLinks {
    poll_interval: Duration,
    live: LiveNames,
}

impl LoopbackLinks {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval, live: Arc::default() }
    }

    pub fn from_config(config: &AwdlConfig) -> Self {
        Self::new(config.poll_interval())
    }

    /// Number of links created and not yet finished.
    pub fn live_links(&self) -> usize {
        lock_names(&self.live).len()
    }
}

impl LinkFactory for LoopbackLinks {
    fn create_link(&self, request: LinkRequest) -> Result<Arc<dyn Link>, LinkError> {
        if request.name.trim().is_empty() {
            return Err(LinkError::invalid_request("link name must not be empty"));
        }
        if request.local.is_empty() || request.remote.is_empty() {
            return Err(LinkError::invalid_request(format!(
                "link {} needs both local and remote endpoints",
                request.name
            )));
        }

        if !lock_names(&self.live).insert(request.name.clone()) {
            return Err(LinkError::DuplicateName { name: request.name });
        }

        log::trace!(
            "loopback: create link {} kind={} mtu={}",
            request.name,
            request.kind,
            request.mtu
        );

        Ok(Arc::new(LoopbackLink {
            name: request.name,
            remote: request.remote,
            stream: request.stream,
            mtu: request.mtu,
            peer: request.peer,
            poll_interval: self.poll_interval,
            closed: CancellationToken::new(),
            live: self.live.clone(),
        }))
    }
}

pub struct LoopbackLink {
    name: String,
    remote: String,
    stream: PipeEnd,
    mtu: usize,
    peer: PeerSlot,
    poll_interval: Duration,
    closed: CancellationToken,
    live: LiveNames,
}

impl LoopbackLink {
    pub fn name(&self) -> &str {
        &self.name
    }

    async fn echo(&self) -> Result<(), LinkError> {
        let mut buf = vec![0u8; self.mtu];

        loop {
            if self.closed.is_cancelled() {
                return Ok(());
            }

            match self.stream.read(&mut buf) {
                Ok(len) => {
                    if self.peer.attach(PeerIdentity::from_endpoint(&self.remote)) {
                        log::debug!("loopback: {} attached peer {}", self.name, self.remote);
                    }
                    log::trace!("loopback: {} echo {} bytes", self.name, len);

                    tokio::select! {
                        biased;
                        _ = self.closed.cancelled() => return Ok(()),
                        written = self.stream.write(&buf[..len]) => match written {
                            Ok(_) | Err(PipeError::Closed) => {}
                            Err(err) => return Err(err.into()),
                        },
                    }
                }
                Err(PipeError::Empty) => {
                    tokio::select! {
                        biased;
                        _ = self.closed.cancelled() => return Ok(()),
                        _ = self.stream.closed() => return Ok(()),
                        _ = tokio::time::sleep(self.poll_interval) => {}
                    }
                }
                Err(PipeError::Closed) => return Ok(()),
            }
        }
    }
}

#[async_trait]
impl Link for LoopbackLink {
    async fn run(&self) -> Result<(), LinkError> {
        let result = self.echo().await;
        lock_names(&self.live).remove(&self.name);
        log::trace!("loopback: link {} finished", self.name);
        result
    }

    fn closed_signal(&self) -> &CancellationToken {
        &self.closed
    }
}
