//! systemd-logind client: the source of actual idle inhibitors.
//!
//! Each successful `Inhibit` call on the `org.freedesktop.login1.Manager`
//! interface returns a file descriptor; logind keeps the inhibition active
//! for as long as the descriptor stays open, so closing it is the release.

use async_trait::async_trait;
use zbus::zvariant::OwnedFd;
use zbus::Connection;

use wakebridge_core::{BridgeError, IdleInhibitor, InhibitHold, Result};

#[zbus::proxy(
    interface = "org.freedesktop.login1.Manager",
    default_service = "org.freedesktop.login1",
    default_path = "/org/freedesktop/login1",
    gen_blocking = false
)]
trait LoginManager {
    fn inhibit(&self, what: &str, who: &str, why: &str, mode: &str) -> zbus::Result<OwnedFd>;
}

/// An inhibitor fd handed out by logind. Dropping the fd releases the
/// inhibition; the consuming `release` makes double-release unrepresentable.
struct LogindHold {
    _fd: OwnedFd,
}

impl InhibitHold for LogindHold {
    fn release(self: Box<Self>) -> std::io::Result<()> {
        // The fd closes on drop; logind counts the close as the release.
        Ok(())
    }
}

/// [`IdleInhibitor`] backed by logind on the system bus.
pub struct LogindIdleInhibitor {
    proxy: LoginManagerProxy<'static>,
}

impl LogindIdleInhibitor {
    /// Connect to logind over `connection` (the system bus).
    pub async fn new(connection: &Connection) -> zbus::Result<Self> {
        let proxy = LoginManagerProxy::new(connection).await?;
        Ok(Self { proxy })
    }
}

#[async_trait]
impl IdleInhibitor for LogindIdleInhibitor {
    async fn inhibit(&self, who: &str, why: &str) -> Result<Box<dyn InhibitHold>> {
        let fd = self
            .proxy
            .inhibit("idle", who, why, "block")
            .await
            .map_err(|err| BridgeError::ResourceUnavailable {
                message: err.to_string(),
            })?;
        Ok(Box::new(LogindHold { _fd: fd }))
    }
}
