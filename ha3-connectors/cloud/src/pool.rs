use std::{
    collections::HashMap,
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard},
};

use ha3_connectors_base::interface::ConnectionPool;
use ha3_core::err::{anyhow, DriverError, Result};
use ha3_logging::{info, warn};
use lazy_static::lazy_static;

use crate::{ConfigFingerprint, Ha3Client, Ha3Connection, Ha3ConnectionConfig};

// Clients are shared process wide, one per distinct fingerprint.
// Entries are retained once created, even when their last lease is released,
// so the capacity bounds the number of distinct configurations ever used.
lazy_static! {
    static ref CLIENTS: ClientRegistry = ClientRegistry::new();
}

struct RegistryEntry {
    client: Arc<Ha3Client>,
    refs: u64,
}

/// Reference counted registry of clients keyed by config fingerprint
#[derive(Clone, Default)]
pub struct ClientRegistry {
    entries: Arc<Mutex<HashMap<ConfigFingerprint, RegistryEntry>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process wide registry
    pub fn global() -> &'static ClientRegistry {
        &CLIENTS
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ConfigFingerprint, RegistryEntry>>> {
        self.entries
            .lock()
            .map_err(|_| anyhow!("Failed to lock client registry"))
    }

    /// Acquires the client for the config, creating it if this is the first use
    pub fn acquire(&self, conf: &Ha3ConnectionConfig) -> Result<Ha3ClientLease> {
        self.acquire_with(conf, Ha3Client::new)
    }

    /// Acquires the client for the config, building it with `build` if absent
    pub fn acquire_with(
        &self,
        conf: &Ha3ConnectionConfig,
        build: impl FnOnce(Ha3ConnectionConfig) -> Result<Ha3Client>,
    ) -> Result<Ha3ClientLease> {
        let fingerprint = conf.fingerprint();
        let mut entries = self.lock()?;

        let (client, refs) = match entries.get_mut(&fingerprint) {
            Some(entry) => {
                entry.refs += 1;
                (Arc::clone(&entry.client), entry.refs)
            }
            None => {
                let capacity = conf.pool_capacity();
                if entries.len() as u64 >= capacity {
                    return Err(DriverError::pool_exhausted(format!(
                        "The connection pool exceeded the limit: {} , if necessary,please increase Ha3Config:maxPoolSize.",
                        capacity
                    ))
                    .into());
                }

                let client = Arc::new(build(conf.clone())?);
                entries.insert(
                    fingerprint.clone(),
                    RegistryEntry {
                        client: Arc::clone(&client),
                        refs: 1,
                    },
                );
                (client, 1)
            }
        };

        if conf.enable_detail_log {
            info!(
                "Acquired client, ref count {}, {} distinct clients",
                refs,
                entries.len()
            );
        }

        Ok(Ha3ClientLease {
            registry: self.clone(),
            fingerprint,
            client,
            detail_log: conf.enable_detail_log,
        })
    }

    fn release(&self, fingerprint: &ConfigFingerprint, detail_log: bool) -> Result<()> {
        let mut entries = self.lock()?;

        if let Some(entry) = entries.get_mut(fingerprint) {
            entry.refs = entry.refs.saturating_sub(1);

            if detail_log {
                info!("Released client, ref count {}", entry.refs);
            }
        }

        Ok(())
    }

    /// Number of live leases of the client for the config
    pub fn ref_count(&self, conf: &Ha3ConnectionConfig) -> u64 {
        self.lock()
            .ok()
            .and_then(|e| e.get(&conf.fingerprint()).map(|e| e.refs))
            .unwrap_or_default()
    }

    /// Number of distinct clients held
    pub fn len(&self) -> usize {
        self.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A shared client, released back to its registry when dropped
pub struct Ha3ClientLease {
    registry: ClientRegistry,
    fingerprint: ConfigFingerprint,
    client: Arc<Ha3Client>,
    /// Detail logging of the config which acquired the lease, not the client's
    detail_log: bool,
}

impl Ha3ClientLease {
    pub fn client(&self) -> &Arc<Ha3Client> {
        &self.client
    }

    pub fn detail_log(&self) -> bool {
        self.detail_log
    }
}

impl Deref for Ha3ClientLease {
    type Target = Ha3Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl Drop for Ha3ClientLease {
    fn drop(&mut self) {
        if let Err(err) = self.registry.release(&self.fingerprint, self.detail_log) {
            warn!("Failed to release client: {:?}", err);
        }
    }
}

/// Opens connections backed by the shared clients
#[derive(Clone)]
pub struct Ha3ConnectionPool {
    conf: Ha3ConnectionConfig,
    registry: ClientRegistry,
}

impl Ha3ConnectionPool {
    pub fn new(conf: Ha3ConnectionConfig) -> Self {
        Self::with_registry(conf, ClientRegistry::global().clone())
    }

    pub fn with_registry(conf: Ha3ConnectionConfig, registry: ClientRegistry) -> Self {
        Self { conf, registry }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }
}

impl ConnectionPool for Ha3ConnectionPool {
    type TConnection = Ha3Connection;

    fn acquire(&mut self) -> Result<Ha3Connection> {
        let lease = self.registry.acquire(&self.conf)?;

        Ok(Ha3Connection::new(self.conf.clone(), lease))
    }
}

#[cfg(test)]
mod tests {
    use ha3_core::err::ErrorCode;
    use pretty_assertions::assert_eq;
    use serial_test::serial;

    use super::*;

    fn local_conf(service_name: &str) -> Ha3ConnectionConfig {
        Ha3ConnectionConfig {
            service_name: service_name.into(),
            username: "user".into(),
            password: "pass".into(),
            mode: Some("local".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_shares_client_per_fingerprint() {
        let registry = ClientRegistry::new();
        let conf = local_conf("a.ha3.test");

        let first = registry.acquire(&conf).unwrap();
        let second = registry.acquire(&conf).unwrap();

        assert_eq!(registry.ref_count(&conf), 2);
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(first.client(), second.client()));
    }

    #[test]
    fn test_registry_ignores_ephemeral_flags() {
        let registry = ClientRegistry::new();
        let conf = local_conf("a.ha3.test");
        let detailed = Ha3ConnectionConfig {
            enable_detail_log: true,
            enable_dynamic_params: true,
            ..conf.clone()
        };

        let first = registry.acquire(&conf).unwrap();
        let second = registry.acquire(&detailed).unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ref_count(&conf), 2);

        // each lease logs per its own config, not the shared client's
        assert!(!first.detail_log());
        assert!(second.detail_log());
        assert!(!second.conf().enable_detail_log);
    }

    #[test]
    fn test_registry_separates_local_and_remote() {
        let registry = ClientRegistry::new();
        let local = local_conf("a.ha3.test");
        let remote = Ha3ConnectionConfig {
            mode: None,
            ..local.clone()
        };

        let local_lease = registry.acquire(&local).unwrap();
        let remote_lease = registry.acquire(&remote).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(!Arc::ptr_eq(local_lease.client(), remote_lease.client()));
        assert!(local_lease.conf().is_local_mode());
        assert!(!remote_lease.conf().is_local_mode());
    }

    #[test]
    fn test_registry_release_on_drop_retains_client() {
        let registry = ClientRegistry::new();
        let conf = local_conf("a.ha3.test");

        let first = registry.acquire(&conf).unwrap();
        let second = registry.acquire(&conf).unwrap();
        drop(first);
        assert_eq!(registry.ref_count(&conf), 1);

        drop(second);
        assert_eq!(registry.ref_count(&conf), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_capacity_exceeded() {
        let registry = ClientRegistry::new();
        let conf = |name: &str| Ha3ConnectionConfig {
            max_pool_size: 2,
            ..local_conf(name)
        };

        let _a = registry.acquire(&conf("a")).unwrap();
        let _b = registry.acquire(&conf("b")).unwrap();
        let err = registry.acquire(&conf("c")).err().unwrap();

        assert_eq!(
            DriverError::code_of(&err),
            Some(ErrorCode::ConnectionSizeExceededLimit)
        );
        assert!(err
            .to_string()
            .contains("The connection pool exceeded the limit: 2 ,"));

        // existing fingerprints are still served at capacity
        let _a2 = registry.acquire(&conf("a")).unwrap();
        assert_eq!(registry.ref_count(&conf("a")), 2);
    }

    #[test]
    fn test_registry_default_capacity() {
        let registry = ClientRegistry::new();
        let leases = (0..10)
            .map(|i| registry.acquire(&local_conf(&format!("host{}", i))).unwrap())
            .collect::<Vec<_>>();

        assert_eq!(leases.len(), 10);
        assert!(registry.acquire(&local_conf("host10")).is_err());
    }

    #[test]
    fn test_registry_build_failure_is_not_stored() {
        let registry = ClientRegistry::new();
        let conf = local_conf("a");

        let res = registry.acquire_with(&conf, |_| Err(anyhow!("boom")));

        assert!(res.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_acquire_single_client() {
        let registry = ClientRegistry::new();
        let conf = local_conf("a");

        let threads = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let conf = conf.clone();
                std::thread::spawn(move || registry.acquire(&conf).unwrap())
            })
            .collect::<Vec<_>>();
        let leases = threads
            .into_iter()
            .map(|t| t.join().unwrap())
            .collect::<Vec<_>>();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ref_count(&conf), 8);
        assert!(leases
            .iter()
            .all(|l| Arc::ptr_eq(l.client(), leases[0].client())));
    }

    #[test]
    #[serial]
    fn test_global_registry_pool_acquire() {
        let conf = local_conf("pool-test.ha3.global");
        let mut pool = Ha3ConnectionPool::new(conf.clone());

        let con = pool.acquire().unwrap();
        assert_eq!(ClientRegistry::global().ref_count(&conf), 1);

        drop(con);
        assert_eq!(ClientRegistry::global().ref_count(&conf), 0);
    }
}
