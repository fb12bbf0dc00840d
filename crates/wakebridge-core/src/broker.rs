//! Orchestration of inhibit and un-inhibit requests against the registry.
//!
//! The broker is what the transport layer's method handlers call into. It
//! attributes each request to the caller's transport identity, acquires the
//! underlying inhibitor *before* touching the registry, and keeps failed
//! acquisitions from leaving partial state behind.

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::inhibitor::IdleInhibitor;
use crate::registry::LockRegistry;

/// Issues and retires inhibit locks on behalf of remote callers.
pub struct InhibitBroker {
    /// Program identity reported to the session manager as the inhibitor
    /// owner (the `who` field of the logind inhibit call).
    program: String,
    inhibitor: Arc<dyn IdleInhibitor>,
    registry: Arc<LockRegistry>,
}

impl InhibitBroker {
    pub fn new(
        program: impl Into<String>,
        inhibitor: Arc<dyn IdleInhibitor>,
        registry: Arc<LockRegistry>,
    ) -> Self {
        Self {
            program: program.into(),
            inhibitor,
            registry,
        }
    }

    /// Acquire an inhibitor and register a lock for it.
    ///
    /// The inhibitor call may block on an external service and therefore
    /// happens outside the registry's critical section. If it fails, the
    /// error is surfaced to the caller and the registry is left unchanged.
    pub async fn inhibit(
        &self,
        peer: Option<String>,
        owner: &str,
        reason: &str,
    ) -> Result<u32> {
        let why = format!("{owner} {reason}");
        let hold = self.inhibitor.inhibit(&self.program, &why).await?;
        let cookie = self.registry.register(owner, reason, peer, hold);
        debug!("Issued cookie {cookie} to {owner:?}");
        Ok(cookie)
    }

    /// Release the lock identified by `cookie`.
    ///
    /// Cookies are bearer tokens: any peer that can reach the exported
    /// interface may release any lock. This mirrors the desktop inhibit
    /// protocol being bridged.
    pub fn uninhibit(&self, cookie: u32) -> Result<()> {
        self.registry.release(cookie)
    }

    /// The registry backing this broker, shared with the liveness monitor.
    pub fn registry(&self) -> &Arc<LockRegistry> {
        &self.registry
    }
}
