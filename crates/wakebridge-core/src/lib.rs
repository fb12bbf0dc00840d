//! Wakebridge Core - inhibit lock registry with peer-liveness reclamation.
//!
//! This crate holds the transport-agnostic state machine behind the
//! wakebridge daemon: the registry of outstanding inhibit locks, the broker
//! that issues and retires them on behalf of remote callers, and the
//! recurring monitor that reclaims locks whose owning bus peer has vanished.
//!
//! The external collaborators (the session manager that performs the actual
//! inhibition and the transport that knows which peers are connected) are
//! abstracted behind the [`IdleInhibitor`] and [`PeerDirectory`] traits, so
//! everything here can be driven programmatically and tested with fakes.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use wakebridge_core::{InhibitBroker, LivenessMonitor, LockRegistry};
//!
//! let registry = Arc::new(LockRegistry::new());
//! let broker = InhibitBroker::new("wakebridged", inhibitor, registry.clone());
//! let monitor = LivenessMonitor::spawn(registry, peers, interval);
//!
//! let cookie = broker.inhibit(Some(peer), "browser", "playing video").await?;
//! broker.uninhibit(cookie)?;
//! ```

pub mod broker;
pub mod error;
pub mod inhibitor;
pub mod monitor;
pub mod registry;

// Re-export commonly used types
pub use broker::InhibitBroker;
pub use error::{BridgeError, Result};
pub use inhibitor::{IdleInhibitor, InhibitHold, PeerDirectory};
pub use monitor::{LivenessMonitor, MonitorHandle};
pub use registry::{InhibitLock, LockRegistry};
