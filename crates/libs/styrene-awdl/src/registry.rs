use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::AwdlError;
use crate::interface::AwdlInterface;

/// Name-indexed set of live AWDL interfaces.
///
/// Lock scopes cover the map only. Nothing here touches a pipe or a link.
#[derive(Debug, Default)]
pub struct InterfaceRegistry {
    interfaces: RwLock<HashMap<String, Arc<AwdlInterface>>>,
}

impl InterfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map holds no invariants a panicking holder could break.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<AwdlInterface>>> {
        self.interfaces.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<AwdlInterface>>> {
        self.interfaces.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, name: &str) -> Option<Arc<AwdlInterface>> {
        self.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read().contains_key(name)
    }

    /// Inserts `interface` unless its name is already taken.
    pub(crate) fn insert(&self, interface: Arc<AwdlInterface>) -> Result<(), AwdlError> {
        let mut interfaces = self.write();
        if interfaces.contains_key(interface.name()) {
            return Err(AwdlError::already_exists(interface.name()));
        }
        interfaces.insert(interface.name().to_owned(), interface);
        Ok(())
    }

    /// Removes and returns the interface. Exactly one caller wins a given entry.
    pub(crate) fn remove(&self, name: &str) -> Option<Arc<AwdlInterface>> {
        self.write().remove(name)
    }

    /// Removes `name` only while it still maps to the entry with `id`.
    pub(crate) fn remove_entry(&self, name: &str, id: u64) -> Option<Arc<AwdlInterface>> {
        let mut interfaces = self.write();
        if interfaces.get(name).map(|interface| interface.id()) != Some(id) {
            return None;
        }
        interfaces.remove(name)
    }

    pub(crate) fn drain(&self) -> Vec<Arc<AwdlInterface>> {
        self.write().drain().map(|(_, interface)| interface).collect()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::link::{Link, LinkError, PeerSlot};
    use crate::pipe;

    struct IdleLink {
        closed: CancellationToken,
    }

    #[async_trait]
    impl Link for IdleLink {
        async fn run(&self) -> Result<(), LinkError> {
            self.closed.cancelled().await;
            Ok(())
        }

        fn closed_signal(&self) -> &CancellationToken {
            &self.closed
        }
    }

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    fn interface(name: &str) -> Arc<AwdlInterface> {
        let (_link_end, transport_end) = pipe::channel();
        let link: Arc<dyn Link> = Arc::new(IdleLink { closed: CancellationToken::new() });
        let task = {
            let link = link.clone();
            tokio::spawn(async move {
                let _ = link.run().await;
            })
        };
        Arc::new(AwdlInterface::new(
            NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name.to_owned(),
            "aa:bb".to_owned(),
            "cc:dd".to_owned(),
            link,
            transport_end,
            PeerSlot::new(),
            task,
        ))
    }

    #[tokio::test]
    async fn insert_get_remove() {
        let registry = InterfaceRegistry::new();
        assert!(registry.is_empty());

        registry.insert(interface("awdl0")).expect("insert");
        assert!(registry.contains("awdl0"));
        assert_eq!(
            registry.get("awdl0").map(|i| i.name().to_owned()),
            Some("awdl0".to_owned())
        );
        assert!(registry.get("awdl1").is_none());

        let removed = registry.remove("awdl0").expect("remove");
        removed.teardown().await;
        assert!(registry.get("awdl0").is_none());
        assert!(registry.remove("awdl0").is_none());
        assert_eq!(registry.len(), 0);
    }

    #[tokio::test]
    async fn duplicate_insert_keeps_first_entry() {
        let registry = InterfaceRegistry::new();
        let first = interface("awdl0");
        registry.insert(first.clone()).expect("first insert");

        let second = interface("awdl0");
        let err = registry.insert(second.clone()).expect_err("duplicate insert");
        assert!(matches!(err, AwdlError::AlreadyExists { ref name } if name == "awdl0"));

        let current = registry.get("awdl0").expect("entry");
        assert!(Arc::ptr_eq(&current, &first));
        assert_eq!(registry.len(), 1);

        second.abandon();
        for entry in registry.drain() {
            entry.teardown().await;
        }
    }

    #[tokio::test]
    async fn names_are_sorted_and_drain_empties() {
        let registry = InterfaceRegistry::new();
        for name in ["awdl2", "awdl0", "awdl1"] {
            registry.insert(interface(name)).expect("insert");
        }
        assert_eq!(registry.names(), vec!["awdl0", "awdl1", "awdl2"]);

        let drained = registry.drain();
        assert_eq!(drained.len(), 3);
        assert!(registry.is_empty());
        for entry in drained {
            entry.teardown().await;
            assert!(entry.is_closed());
        }
    }

    #[tokio::test]
    async fn remove_entry_ignores_other_generations() {
        let registry = InterfaceRegistry::new();
        let stale = interface("awdl0");
        let current = interface("awdl0");
        registry.insert(current.clone()).expect("insert");

        assert!(registry.remove_entry("awdl0", stale.id()).is_none());
        assert!(registry.contains("awdl0"));

        let removed = registry.remove_entry("awdl0", current.id()).expect("remove current");
        assert!(Arc::ptr_eq(&removed, &current));
        assert!(registry.is_empty());

        stale.teardown().await;
        current.teardown().await;
    }
}
