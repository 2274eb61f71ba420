//! Per-account remote client cache
//!
//! Building a client resolves credentials and sets up an HTTP stack, so one
//! client is kept per account UUID. The cache is an ordinary value owned by
//! whoever composes the reconcilers; there is no process-global state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zonesync_core::ClientCache;
//!
//! let cache = Arc::new(ClientCache::new(Arc::new(route53_factory), true));
//!
//! let client = cache.get_or_create(&account)?;   // built once
//! let again = cache.get_or_create(&account)?;    // same handle
//!
//! cache.invalidate(Some(&account));              // credentials rotated
//! cache.invalidate(None);                        // drop everything
//! ```

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::model::Account;
use crate::traits::{RemoteClientFactory, RemoteDnsClient};

/// Cache of remote clients keyed by account UUID
///
/// With caching disabled every lookup builds a fresh client.
///
/// ## Thread Safety
///
/// Interior mutability with RwLock. Two callers racing on a cold entry may
/// both build a client; the last one stored wins.
pub struct ClientCache {
    factory: Arc<dyn RemoteClientFactory>,
    enabled: bool,
    clients: RwLock<HashMap<Uuid, Arc<dyn RemoteDnsClient>>>,
}

impl ClientCache {
    pub fn new(factory: Arc<dyn RemoteClientFactory>, enabled: bool) -> Self {
        Self {
            factory,
            enabled,
            clients: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Build a new client, bypassing the cache
    pub fn create_client(&self, account: &Account) -> Result<Arc<dyn RemoteDnsClient>> {
        tracing::debug!(
            account = %account,
            credentials = account.credentials().type_name(),
            region = account.default_region(),
            "Creating remote client"
        );
        self.factory.create(account)
    }

    /// Cached client for `account`, building it on first use
    pub fn get_or_create(&self, account: &Account) -> Result<Arc<dyn RemoteDnsClient>> {
        if !self.enabled {
            return self.create_client(account);
        }

        if let Some(client) = self.read()?.get(&account.id()) {
            return Ok(Arc::clone(client));
        }

        let client = self.create_client(account)?;
        self.write()?.insert(account.id(), Arc::clone(&client));
        Ok(client)
    }

    /// Drop the cached client of one account, or of every account
    pub fn invalidate(&self, account: Option<&Account>) {
        let Ok(mut clients) = self.clients.write() else {
            tracing::warn!("Client cache lock poisoned; nothing invalidated");
            return;
        };
        match account {
            Some(account) => {
                clients.remove(&account.id());
                tracing::debug!(account = %account, "Invalidated cached client");
            }
            None => {
                clients.clear();
                tracing::debug!("Invalidated all cached clients");
            }
        }
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.clients.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<Uuid, Arc<dyn RemoteDnsClient>>>> {
        self.clients
            .read()
            .map_err(|_| Error::Other("client cache lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, Arc<dyn RemoteDnsClient>>>> {
        self.clients
            .write()
            .map_err(|_| Error::Other("client cache lock poisoned".to_string()))
    }
}

impl std::fmt::Debug for ClientCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCache")
            .field("enabled", &self.enabled)
            .field("cached", &self.len())
            .finish()
    }
}
