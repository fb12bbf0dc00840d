//! In-memory registry of outstanding inhibit locks.
//!
//! The registry owns every lock's underlying inhibitor hold and guarantees
//! that each hold is released exactly once, whether the lock is retired by an
//! explicit un-inhibit, by the liveness monitor, or by the shutdown drain.
//!
//! # Thread Safety
//!
//! All map access goes through a single coarse mutex. Critical sections are
//! short: a map operation plus, on removal, the inexpensive close of the
//! held inhibitor. External calls with unbounded latency (logind, bus peer
//! enumeration) happen outside the lock.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::{BridgeError, Result};
use crate::inhibitor::InhibitHold;

/// One outstanding inhibit lock.
pub struct InhibitLock {
    /// Identifier handed back to the caller; unique among live locks.
    pub cookie: u32,
    /// Application-supplied identity. Opaque, untrusted.
    pub owner: String,
    /// Application-supplied justification. Opaque, untrusted.
    pub reason: String,
    /// Unique bus name of the connection that requested the lock, when the
    /// transport could attribute one. Used only for liveness, never for
    /// authorization.
    pub peer: Option<String>,
    /// When the lock was issued. Informational only.
    pub created_at: DateTime<Utc>,
    hold: Box<dyn InhibitHold>,
}

impl fmt::Display for InhibitLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} / {:?} ({:?}, {})",
            self.owner,
            self.reason,
            self.peer.as_deref().unwrap_or(""),
            self.cookie
        )
    }
}

/// Mapping from cookie to live lock, plus the cookie allocator.
pub struct LockRegistry {
    locks: Mutex<HashMap<u32, InhibitLock>>,
    next_cookie: AtomicU32,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            next_cookie: AtomicU32::new(1),
        }
    }

    /// Insert a new lock for an already-acquired inhibitor hold and return
    /// its cookie.
    ///
    /// Cookies come from a monotonically increasing counter, checked against
    /// the live set so a wrapped counter can never silently overwrite an
    /// existing lock. Cookie 0 is never issued.
    pub fn register(
        &self,
        owner: &str,
        reason: &str,
        peer: Option<String>,
        hold: Box<dyn InhibitHold>,
    ) -> u32 {
        let mut locks = self.locks.lock().unwrap();
        let cookie = loop {
            let candidate = self.next_cookie.fetch_add(1, Ordering::Relaxed);
            if candidate != 0 && !locks.contains_key(&candidate) {
                break candidate;
            }
        };
        let lock = InhibitLock {
            cookie,
            owner: owner.to_string(),
            reason: reason.to_string(),
            peer,
            created_at: Utc::now(),
            hold,
        };
        info!("Inhibit: {lock}");
        locks.insert(cookie, lock);
        cookie
    }

    /// Remove the lock for `cookie` and release its hold.
    ///
    /// An unknown cookie is a normal caller error (e.g. double release) and
    /// fails with `InvalidCookie`. A failing hold release is surfaced as
    /// `ResourceRelease`, but the map entry is gone either way: keeping the
    /// registry free of retired locks takes priority over the close outcome.
    pub fn release(&self, cookie: u32) -> Result<()> {
        let lock = self
            .locks
            .lock()
            .unwrap()
            .remove(&cookie)
            .ok_or(BridgeError::InvalidCookie(cookie))?;
        info!("UnInhibit: {lock}");
        let InhibitLock { hold, .. } = lock;
        hold.release().map_err(|err| BridgeError::ResourceRelease {
            cookie,
            message: err.to_string(),
        })
    }

    /// Drop every lock whose requesting peer is absent from `live_peers`,
    /// releasing its hold. Returns the number of locks reclaimed.
    ///
    /// Locks without an attributed peer are left untouched: absence of
    /// identity never counts as "peer gone".
    pub fn reclaim_dead(&self, live_peers: &HashSet<String>) -> usize {
        let mut locks = self.locks.lock().unwrap();
        let dead: Vec<u32> = locks
            .values()
            .filter(|lock| {
                lock.peer
                    .as_ref()
                    .is_some_and(|peer| !live_peers.contains(peer))
            })
            .map(|lock| lock.cookie)
            .collect();
        for cookie in &dead {
            if let Some(lock) = locks.remove(cookie) {
                info!("Missing peer; dropping: {lock}");
                let InhibitLock { hold, .. } = lock;
                if let Err(err) = hold.release() {
                    warn!("Failed to release inhibitor for cookie {cookie}: {err}");
                }
            }
        }
        dead.len()
    }

    /// Remove and release every outstanding lock. Used by the shutdown drain.
    pub fn drain(&self) -> usize {
        let mut locks = self.locks.lock().unwrap();
        let drained = locks.len();
        for (cookie, lock) in locks.drain() {
            info!("Draining: {lock}");
            let InhibitLock { hold, .. } = lock;
            if let Err(err) = hold.release() {
                warn!("Failed to release inhibitor for cookie {cookie}: {err}");
            }
        }
        drained
    }

    /// Number of currently live locks.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().unwrap().is_empty()
    }

    /// Whether `cookie` refers to a live lock.
    pub fn contains(&self, cookie: u32) -> bool {
        self.locks.lock().unwrap().contains_key(&cookie)
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
