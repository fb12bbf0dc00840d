//! The exported `org.freedesktop.ScreenSaver` interface.
//!
//! Only the two inhibit methods are implemented; calls to any other member
//! of the interface get the object server's standard unknown-method error,
//! matching what desktop clients expect from a minimal inhibit service.

use std::sync::Arc;

use tracing::debug;
use zbus::message::Header;
use zbus::{fdo, interface};

use wakebridge_core::{BridgeError, InhibitBroker};

/// Handler state bound to both the canonical and the legacy object path.
#[derive(Clone)]
pub struct ScreenSaver {
    broker: Arc<InhibitBroker>,
}

impl ScreenSaver {
    pub fn new(broker: Arc<InhibitBroker>) -> Self {
        Self { broker }
    }
}

#[interface(name = "org.freedesktop.ScreenSaver")]
impl ScreenSaver {
    /// Request an idle inhibition. Returns a cookie for `UnInhibit`.
    ///
    /// The requesting peer is taken from the message header, never from the
    /// caller's arguments; it is what the liveness monitor later checks
    /// against the connected-peer set.
    #[zbus(name = "Inhibit")]
    async fn inhibit(
        &self,
        application_name: String,
        reason_for_inhibit: String,
        #[zbus(header)] header: Header<'_>,
    ) -> fdo::Result<u32> {
        let peer = header.sender().map(|sender| sender.to_string());
        debug!(
            "Inhibit request from {:?} ({application_name:?})",
            peer.as_deref().unwrap_or("")
        );
        self.broker
            .inhibit(peer, &application_name, &reason_for_inhibit)
            .await
            .map_err(into_fdo_error)
    }

    /// Release a previously issued inhibition.
    #[zbus(name = "UnInhibit")]
    async fn un_inhibit(&self, cookie: u32) -> fdo::Result<()> {
        self.broker.uninhibit(cookie).map_err(into_fdo_error)
    }
}

/// Map core errors onto the wire. Nothing here is fatal to the service;
/// every error goes back to the one caller that triggered it.
fn into_fdo_error(err: BridgeError) -> fdo::Error {
    fdo::Error::Failed(err.to_string())
}
