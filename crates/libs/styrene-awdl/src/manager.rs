use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::config::AwdlConfig;
use crate::error::AwdlError;
use crate::interface::AwdlInterface;
use crate::link::{Link, LinkFactory, LinkRequest, PeerSlot};
use crate::pipe::{self, PipeEnd};
use crate::registry::InterfaceRegistry;

/// Creates, tracks and tears down named AWDL interfaces.
///
/// Each interface gets a fresh pipe whose link end is bound to a link from
/// the [`LinkFactory`]. The link's processing loop runs on its own task until
/// [`shutdown`](Self::shutdown). A handler that finishes on its own takes its
/// interface out of the registry and closes the pipe, so the name is free
/// again.
pub struct AwdlManager {
    config: AwdlConfig,
    links: Arc<dyn LinkFactory>,
    registry: Arc<InterfaceRegistry>,
    next_id: AtomicU64,
}

impl AwdlManager {
    pub fn new(config: AwdlConfig, links: Arc<dyn LinkFactory>) -> Self {
        Self { config, links, registry: Arc::default(), next_id: AtomicU64::new(1) }
    }

    pub fn config(&self) -> &AwdlConfig {
        &self.config
    }

    pub fn registry(&self) -> &InterfaceRegistry {
        &self.registry
    }

    /// Brings up interface `name` and starts its link handler.
    ///
    /// Link layer failures are returned as [`AwdlError::Link`] and leave
    /// nothing registered. When two callers race on one name the first to
    /// register wins and the other gets [`AwdlError::AlreadyExists`].
    pub fn create(
        &self,
        name: &str,
        local: &str,
        remote: &str,
    ) -> Result<Arc<AwdlInterface>, AwdlError> {
        let runtime = Handle::try_current().map_err(|_| AwdlError::NoRuntime)?;

        if self.registry.contains(name) {
            return Err(AwdlError::already_exists(name));
        }

        let (link_end, transport_end) = pipe::channel();
        let peer = PeerSlot::new();
        let kind = self.config.link_kind();

        let request = LinkRequest {
            stream: link_end,
            name: name.to_owned(),
            kind: kind.clone(),
            local: local.to_owned(),
            remote: remote.to_owned(),
            mtu: self.config.effective_mtu(),
            peer: peer.clone(),
        };

        let link = match self.links.create_link(request) {
            Ok(link) => link,
            Err(err) => {
                transport_end.close();
                return Err(err.into());
            }
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // The handler waits until its entry is registered. Dropping `registered`
        // without sending means the entry lost a name race and never runs.
        let (registered, started) = oneshot::channel();
        let task = runtime.spawn(run_link(
            link.clone(),
            self.registry.clone(),
            transport_end.clone(),
            name.to_owned(),
            id,
            started,
        ));

        let interface = Arc::new(AwdlInterface::new(
            id,
            name.to_owned(),
            local.to_owned(),
            remote.to_owned(),
            link,
            transport_end,
            peer,
            task,
        ));

        if let Err(err) = self.registry.insert(interface.clone()) {
            interface.abandon();
            return Err(err);
        }
        let _ = registered.send(());

        log::debug!(
            "awdl: create interface {} kind={} local={} remote={}",
            name,
            kind,
            local,
            remote
        );

        Ok(interface)
    }

    pub fn get_interface(&self, name: &str) -> Option<Arc<AwdlInterface>> {
        self.registry.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Stops interface `name` and waits for its link handler to exit.
    ///
    /// The entry is unregistered before teardown starts, so concurrent calls
    /// for one name see exactly one success.
    pub async fn shutdown(&self, name: &str) -> Result<(), AwdlError> {
        let interface = self.registry.remove(name).ok_or_else(|| AwdlError::not_found(name))?;

        interface.teardown().await;
        log::debug!("awdl: shutdown interface {}", name);

        Ok(())
    }

    /// Stops every registered interface. Returns how many were stopped.
    pub async fn shutdown_all(&self) -> usize {
        let interfaces = self.registry.drain();
        let count = interfaces.len();

        for interface in interfaces {
            interface.teardown().await;
            log::debug!("awdl: shutdown interface {}", interface.name());
        }

        count
    }

    /// Creates every enabled interface from the configuration.
    ///
    /// Stops at the first failure. Interfaces created before it stay up.
    pub fn create_configured(&self) -> Result<Vec<Arc<AwdlInterface>>, AwdlError> {
        let mut created = Vec::new();
        for iface in self.config.enabled_interfaces() {
            created.push(self.create(&iface.name, &iface.local, &iface.remote)?);
        }
        Ok(created)
    }
}

async fn run_link(
    link: Arc<dyn Link>,
    registry: Arc<InterfaceRegistry>,
    pipe: PipeEnd,
    name: String,
    id: u64,
    started: oneshot::Receiver<()>,
) {
    if started.await.is_err() {
        return;
    }

    if let Err(err) = link.run().await {
        log::warn!("awdl: link handler for {} exited: {}", name, err);
    }

    // Unregister before closing so a registered interface never has a closed pipe.
    if registry.remove_entry(&name, id).is_some() {
        log::debug!("awdl: link handler for {} finished, interface removed", name);
    }
    link.closed_signal().cancel();
    pipe.close();
}

impl Drop for AwdlManager {
    fn drop(&mut self) {
        for interface in self.registry.drain() {
            interface.abandon();
        }
    }
}
