//! Liveness monitor for inhibit lock peers.
//!
//! A recurring task that enumerates the peers currently connected to the
//! transport and reclaims every lock whose requesting peer has vanished,
//! e.g. because the application crashed without un-inhibiting.
//!
//! The task runs on the tokio runtime until shut down. Shutdown preempts the
//! tick wait, so stopping never blocks for a full heartbeat interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::inhibitor::PeerDirectory;
use crate::registry::LockRegistry;

/// Handle to the running monitor task.
///
/// Call [`shutdown`] to stop the monitor and wait for its current tick to
/// finish; dropping the handle aborts the task as a backstop.
///
/// [`shutdown`]: MonitorHandle::shutdown
pub struct MonitorHandle {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop the monitor and wait for it to exit.
    ///
    /// Safe to call more than once; later calls are no-ops.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Recurring peer-liveness sweep over a [`LockRegistry`].
pub struct LivenessMonitor;

impl LivenessMonitor {
    /// Spawn the monitor task, sweeping every `period`.
    pub fn spawn(
        registry: Arc<LockRegistry>,
        peers: Arc<dyn PeerDirectory>,
        period: Duration,
    ) -> MonitorHandle {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // An interval's first tick completes immediately; consume it so
            // the first sweep happens one full period after startup.
            ticker.tick().await;

            info!("Heartbeat checker started");
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => {
                        info!("Heartbeat checker stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        // Not every peer implements org.freedesktop.DBus.Peer,
                        // so liveness is judged against the full set of
                        // connected bus names instead of pinging each lock's
                        // peer individually.
                        let live = match peers.list_peers().await {
                            Ok(live) => live,
                            Err(err) => {
                                warn!("Skipping liveness sweep: {err}");
                                continue;
                            }
                        };
                        let reclaimed = registry.reclaim_dead(&live);
                        if reclaimed > 0 {
                            info!("Reclaimed {reclaimed} lock(s) from vanished peers");
                        } else {
                            debug!("Liveness sweep found all lock peers present");
                        }
                    }
                }
            }
        });

        MonitorHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BridgeError, Result};
    use crate::inhibitor::InhibitHold;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingHold {
        releases: Arc<AtomicUsize>,
    }

    impl InhibitHold for CountingHold {
        fn release(self: Box<Self>) -> io::Result<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct StaticPeers {
        peers: Mutex<HashSet<String>>,
        fail: AtomicBool,
    }

    impl StaticPeers {
        fn of(names: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                peers: Mutex::new(names.iter().map(|n| n.to_string()).collect()),
                fail: AtomicBool::new(false),
            })
        }

        fn remove(&self, name: &str) {
            self.peers.lock().unwrap().remove(name);
        }

        fn set_failing(&self, failing: bool) {
            self.fail.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl PeerDirectory for StaticPeers {
        async fn list_peers(&self) -> Result<HashSet<String>> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(BridgeError::PeerQuery {
                    message: "bus unreachable".into(),
                });
            }
            Ok(self.peers.lock().unwrap().clone())
        }
    }

    const PERIOD: Duration = Duration::from_secs(10);

    fn lock_with_peer(
        registry: &LockRegistry,
        peer: &str,
        releases: &Arc<AtomicUsize>,
    ) -> u32 {
        registry.register(
            "app",
            "busy",
            Some(peer.to_string()),
            Box::new(CountingHold {
                releases: releases.clone(),
            }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_reclaims_vanished_peer() {
        let registry = Arc::new(LockRegistry::new());
        let releases = Arc::new(AtomicUsize::new(0));
        let peers = StaticPeers::of(&[":1.7"]);
        let cookie = lock_with_peer(&registry, ":1.7", &releases);

        let mut handle = LivenessMonitor::spawn(registry.clone(), peers.clone(), PERIOD);

        // Peer still present: the first sweep leaves the lock alone.
        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;
        assert!(registry.contains(cookie));

        // Peer disconnects: the next sweep reclaims the lock.
        peers.remove(":1.7");
        tokio::time::sleep(PERIOD).await;
        assert!(!registry.contains(cookie));
        assert_eq!(releases.load(Ordering::SeqCst), 1);

        // A later explicit release observes the cookie as already gone.
        assert!(matches!(
            registry.release(cookie),
            Err(BridgeError::InvalidCookie(_))
        ));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_peer_query_failure_skips_sweep() {
        let registry = Arc::new(LockRegistry::new());
        let releases = Arc::new(AtomicUsize::new(0));
        let peers = StaticPeers::of(&[]);
        peers.set_failing(true);
        let cookie = lock_with_peer(&registry, ":1.9", &releases);

        let mut handle = LivenessMonitor::spawn(registry.clone(), peers.clone(), PERIOD);

        // Enumeration fails: the registry must not be touched.
        tokio::time::sleep(PERIOD * 3).await;
        assert!(registry.contains(cookie));
        assert_eq!(releases.load(Ordering::SeqCst), 0);

        // Once the directory recovers, the dead peer is reclaimed.
        peers.set_failing(false);
        tokio::time::sleep(PERIOD + Duration::from_millis(100)).await;
        assert!(!registry.contains(cookie));

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_preempts_tick_wait() {
        let registry = Arc::new(LockRegistry::new());
        let peers = StaticPeers::of(&[]);

        let mut handle =
            LivenessMonitor::spawn(registry, peers, Duration::from_secs(3600));

        // Shutdown must complete promptly even though the next tick is an
        // hour away.
        tokio::time::timeout(Duration::from_secs(1), handle.shutdown())
            .await
            .expect("shutdown did not preempt the tick wait");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_is_idempotent() {
        let registry = Arc::new(LockRegistry::new());
        let peers = StaticPeers::of(&[]);

        let mut handle = LivenessMonitor::spawn(registry, peers, PERIOD);
        handle.shutdown().await;
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_monitor_no_longer_sweeps() {
        let registry = Arc::new(LockRegistry::new());
        let releases = Arc::new(AtomicUsize::new(0));
        let peers = StaticPeers::of(&[]);
        let cookie = lock_with_peer(&registry, ":1.4", &releases);

        let mut handle = LivenessMonitor::spawn(registry.clone(), peers, PERIOD);
        handle.shutdown().await;

        tokio::time::sleep(PERIOD * 2).await;
        assert!(registry.contains(cookie));
        assert_eq!(releases.load(Ordering::SeqCst), 0);
    }
}
