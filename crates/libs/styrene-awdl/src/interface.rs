use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;

use crate::link::{Link, PeerIdentity, PeerSlot};
use crate::pipe::{PipeEnd, PipeError};

/// A live AWDL interface: one link, its pipe, and the task running the link.
///
/// The external transport pushes frames heard over the air with
/// [`send_inbound`](Self::send_inbound) and drains frames to put on the air
/// with [`poll_outbound`](Self::poll_outbound) or
/// [`recv_outbound`](Self::recv_outbound). The pipe and link are not handed
/// out: an interface stops only through
/// [`AwdlManager::shutdown`](crate::AwdlManager::shutdown) or when its link
/// handler finishes, and either way it leaves the registry.
pub struct AwdlInterface {
    id: u64,
    name: String,
    local: String,
    remote: String,
    link: Arc<dyn Link>,
    pipe: PipeEnd,
    peer: PeerSlot,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AwdlInterface {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: u64,
        name: String,
        local: String,
        remote: String,
        link: Arc<dyn Link>,
        pipe: PipeEnd,
        peer: PeerSlot,
        task: JoinHandle<()>,
    ) -> Self {
        Self { id, name, local, remote, link, pipe, peer, task: Mutex::new(Some(task)) }
    }

    /// Distinguishes this entry from earlier or later interfaces of the same name.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local(&self) -> &str {
        &self.local
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Peer identity, once the link layer has established one.
    pub fn peer(&self) -> Option<PeerIdentity> {
        self.peer.get()
    }

    #[cfg(test)]
    pub(crate) fn link(&self) -> &Arc<dyn Link> {
        &self.link
    }

    #[cfg(test)]
    pub(crate) fn pipe(&self) -> &PipeEnd {
        &self.pipe
    }

    /// Hands a frame received from the air to the link. Waits while the
    /// previous inbound frame is still pending.
    pub async fn send_inbound(&self, frame: &[u8]) -> Result<usize, PipeError> {
        self.pipe.write(frame).await
    }

    /// Takes the pending outbound frame without waiting.
    pub fn poll_outbound(&self, buf: &mut [u8]) -> Result<usize, PipeError> {
        self.pipe.read(buf)
    }

    /// Waits for the next outbound frame.
    pub async fn recv_outbound(&self) -> Result<Vec<u8>, PipeError> {
        self.pipe.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.pipe.is_closed()
    }

    fn take_task(&self) -> Option<JoinHandle<()>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    /// Stops the link, closes the pipe and waits for the link task to exit.
    pub(crate) async fn teardown(&self) {
        self.link.closed_signal().cancel();
        self.pipe.close();

        let Some(task) = self.take_task() else {
            return;
        };
        if let Err(err) = task.await {
            if err.is_panic() {
                log::warn!("awdl: link handler for {} panicked", self.name);
            }
        }
    }

    /// Signals the link and closes the pipe without waiting. The task is
    /// detached and finishes on its own.
    pub(crate) fn abandon(&self) {
        self.link.closed_signal().cancel();
        self.pipe.close();
        drop(self.take_task());
    }
}

impl fmt::Debug for AwdlInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwdlInterface")
            .field("name", &self.name)
            .field("local", &self.local)
            .field("remote", &self.remote)
            .field("peer", &self.peer.get())
            .field("closed", &self.is_closed())
            .finish()
    }
}
