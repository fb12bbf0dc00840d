//! Bridge service composition and lifecycle.
//!
//! `Bridge::start` brings the whole service up in a fixed order: session
//! bus, logind client, interface export plus name claim, liveness monitor.
//! Every step before the name claim happens inside the zbus connection
//! builder, so a failure anywhere leaves nothing exported and no name
//! claimed. Shutdown runs the reverse order, stopping the monitor before
//! the transport it queries goes away.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use zbus::{connection, Connection};

use wakebridge_core::{
    BridgeError, InhibitBroker, LivenessMonitor, LockRegistry, MonitorHandle, Result,
};

use crate::logind::LogindIdleInhibitor;
use crate::peers::BusPeerDirectory;
use crate::screensaver::ScreenSaver;

const WELL_KNOWN_NAME: &str = "org.freedesktop.ScreenSaver";
const CANONICAL_PATH: &str = "/org/freedesktop/ScreenSaver";
// Firefox looks this path up instead of /org/freedesktop/ScreenSaver.
const LEGACY_PATH: &str = "/ScreenSaver";

/// Service configuration, filled in from the command line.
pub struct BridgeConfig {
    /// Program identity reported to logind as the inhibitor owner.
    pub program: String,
    /// How long to wait between lock peer validations.
    pub heartbeat_interval: Duration,
}

/// A running bridge: serving connection, registry, and liveness monitor.
pub struct Bridge {
    session: Option<Connection>,
    system: Option<Connection>,
    registry: Arc<LockRegistry>,
    monitor: Option<MonitorHandle>,
}

impl Bridge {
    /// Start the service. On return the well-known name is claimed, the
    /// interface is reachable at both object paths, and the monitor is
    /// running; on error, nothing is left listening.
    pub async fn start(config: BridgeConfig) -> Result<Self> {
        info!("Connecting to system bus (logind)");
        let system = Connection::system().await.map_err(setup_error)?;
        let inhibitor = Arc::new(
            LogindIdleInhibitor::new(&system)
                .await
                .map_err(setup_error)?,
        );

        let registry = Arc::new(LockRegistry::new());
        let broker = Arc::new(InhibitBroker::new(
            config.program,
            inhibitor,
            registry.clone(),
        ));
        let screensaver = ScreenSaver::new(broker);

        info!(
            "Connecting to session bus, serving {WELL_KNOWN_NAME} at {CANONICAL_PATH} and {LEGACY_PATH}"
        );
        let session = connection::Builder::session()
            .map_err(setup_error)?
            .serve_at(CANONICAL_PATH, screensaver.clone())
            .map_err(setup_error)?
            .serve_at(LEGACY_PATH, screensaver)
            .map_err(setup_error)?
            .name(WELL_KNOWN_NAME)
            .map_err(setup_error)?
            .build()
            .await
            .map_err(|err| match err {
                zbus::Error::NameTaken => BridgeError::TransportSetup {
                    message: format!("{WELL_KNOWN_NAME} already has a primary owner"),
                },
                err => setup_error(err),
            })?;

        let peers = Arc::new(
            BusPeerDirectory::new(&session)
                .await
                .map_err(setup_error)?,
        );
        let monitor = LivenessMonitor::spawn(registry.clone(), peers, config.heartbeat_interval);

        Ok(Self {
            session: Some(session),
            system: Some(system),
            registry,
            monitor: Some(monitor),
        })
    }

    /// Stop the service: monitor first, then drain outstanding locks, then
    /// close the bus connections. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if let Some(mut monitor) = self.monitor.take() {
            monitor.shutdown().await;
        }

        let drained = self.registry.drain();
        if drained > 0 {
            warn!("Released {drained} lock(s) still outstanding at shutdown");
        }

        if let Some(session) = self.session.take() {
            session.graceful_shutdown().await;
        }
        if let Some(system) = self.system.take() {
            system.graceful_shutdown().await;
        }
        info!("Bridge stopped");
    }
}

fn setup_error(err: zbus::Error) -> BridgeError {
    BridgeError::TransportSetup {
        message: err.to_string(),
    }
}
