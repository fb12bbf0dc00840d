//! Contracts for the external collaborators of the lock registry.
//!
//! The daemon crate implements these against D-Bus (logind for inhibitors,
//! the session bus for peer enumeration); tests implement them with fakes.

use std::collections::HashSet;
use std::io;

use async_trait::async_trait;

use crate::error::Result;

/// One active idle inhibition held on behalf of a lock.
///
/// Releasing consumes the hold, so a hold can never be released twice.
pub trait InhibitHold: Send + 'static {
    /// Release the underlying inhibitor. Errors are reported best-effort;
    /// the hold is gone regardless of the outcome.
    fn release(self: Box<Self>) -> io::Result<()>;
}

/// Source of idle inhibitors, one per successful [`inhibit`] call.
///
/// [`inhibit`]: IdleInhibitor::inhibit
#[async_trait]
pub trait IdleInhibitor: Send + Sync + 'static {
    /// Request a new inhibition from the underlying session manager.
    ///
    /// `who` identifies this program, `why` the application-supplied
    /// justification. May block on an external service; callers must not
    /// hold the registry lock across this call.
    async fn inhibit(&self, who: &str, why: &str) -> Result<Box<dyn InhibitHold>>;
}

/// Enumerates the peers currently connected to the transport.
///
/// The monitor treats the result as the ground truth for lock liveness:
/// a lock whose requesting peer is absent from this set is reclaimed.
#[async_trait]
pub trait PeerDirectory: Send + Sync + 'static {
    async fn list_peers(&self) -> Result<HashSet<String>>;
}
