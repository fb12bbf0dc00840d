//! Peer enumeration over the session bus.

use std::collections::HashSet;

use async_trait::async_trait;
use zbus::{fdo, Connection};

use wakebridge_core::{BridgeError, PeerDirectory, Result};

/// [`PeerDirectory`] backed by the bus's own `ListNames` call.
///
/// The result contains every name on the bus, unique (`:1.42`) and
/// well-known alike. Lock peers are recorded as unique names, so membership
/// tests against this set are exact.
pub struct BusPeerDirectory {
    proxy: fdo::DBusProxy<'static>,
}

impl BusPeerDirectory {
    pub async fn new(connection: &Connection) -> zbus::Result<Self> {
        let proxy = fdo::DBusProxy::new(connection).await?;
        Ok(Self { proxy })
    }
}

#[async_trait]
impl PeerDirectory for BusPeerDirectory {
    async fn list_peers(&self) -> Result<HashSet<String>> {
        let names = self
            .proxy
            .list_names()
            .await
            .map_err(|err| BridgeError::PeerQuery {
                message: err.to_string(),
            })?;
        Ok(names.into_iter().map(|name| name.to_string()).collect())
    }
}
