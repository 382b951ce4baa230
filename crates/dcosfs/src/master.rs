// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use crate::cluster::{ClusterClient, MasterState};
use crate::error::{Error, Result};
use crate::lock;

/// The latest master `state.json`, refreshed in the background.
///
/// Readers never wait for a fetch: [`MasterStateCache::get`] returns the last
/// snapshot that was fetched successfully. The lock only guards the pointer
/// swap, fetching happens outside it.
pub struct MasterStateCache {
    client: Arc<dyn ClusterClient>,
    interval: Duration,
    current: Mutex<Option<Arc<MasterState>>>,
    generation: AtomicU64,
    started: AtomicBool,
}

impl MasterStateCache {
    pub fn new(client: Arc<dyn ClusterClient>, interval: Duration) -> Self {
        Self {
            client,
            interval,
            current: Mutex::new(None),
            generation: AtomicU64::new(0),
            started: AtomicBool::new(false),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// The most recent snapshot; `MasterUnavailable` before the first fetch.
    pub fn get(&self) -> Result<Arc<MasterState>> {
        lock(&self.current).clone().ok_or(Error::MasterUnavailable)
    }

    pub fn is_initialized(&self) -> bool {
        lock(&self.current).is_some()
    }

    /// Number of successful refreshes so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Fetches once and swaps the result in. On failure the previous
    /// snapshot stays current.
    pub fn refresh_once(&self) -> Result<Arc<MasterState>> {
        let state = self.client.master_state()?;
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let state = Arc::new(state.with_generation(generation));
        *lock(&self.current) = Some(state.clone());
        Ok(state)
    }

    /// Fetches the first snapshot, then keeps refreshing on a named thread.
    ///
    /// The first fetch is synchronous so a filesystem is never served
    /// without master state. The thread holds a weak reference and stops
    /// once the cache is dropped. Calling `start` again is a no-op.
    pub fn start(self: &Arc<Self>) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.refresh_once() {
            self.started.store(false, Ordering::SeqCst);
            return Err(e);
        }

        let weak = Arc::downgrade(self);
        let interval = self.interval;
        _ = std::thread::Builder::new()
            .name("master-state".to_string())
            .spawn(move || refresh_loop(weak, interval))?;

        let secs = interval.as_secs();
        diagnostics::info!("Master state refresher started, every {secs}s", secs: secs);
        Ok(())
    }
}

fn refresh_loop(cache: Weak<MasterStateCache>, interval: Duration) {
    loop {
        std::thread::sleep(interval);
        let Some(cache) = cache.upgrade() else {
            diagnostics::debug!("Master state cache dropped, refresher exiting");
            return;
        };
        match cache.refresh_once() {
            Ok(state) => {
                let generation = state.generation();
                diagnostics::debug!("Master state refreshed, generation {generation}", generation: generation);
            }
            Err(e) => {
                let err = e.to_string();
                diagnostics::warn!("Master state refresh failed, keeping previous state: {err}", err: err.as_str());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCluster;
    use serde_json::json;

    #[test]
    fn test_uninitialized() {
        let cache = MasterStateCache::new(Arc::new(FakeCluster::new()), Duration::from_secs(5));
        assert!(matches!(cache.get(), Err(Error::MasterUnavailable)));
        assert!(!cache.is_initialized());
    }

    #[test]
    fn test_failure_keeps_previous_state() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.set_master(json!({"frameworks": [{"id": "fw-1", "name": "marathon"}]}));
        let cache = MasterStateCache::new(cluster.clone(), Duration::from_secs(5));

        let first = cache.refresh_once().expect("first fetch");
        assert_eq!(first.generation(), 1);

        cluster.fail_master(1);
        assert!(cache.refresh_once().is_err());
        let during = cache.get().expect("previous state retained");
        assert!(Arc::ptr_eq(&first, &during));

        cluster.set_master(json!({"frameworks": []}));
        let second = cache.refresh_once().expect("recovered");
        assert_eq!(second.generation(), 2);
        assert!(cache.get().expect("state").frameworks().is_empty());
    }

    #[test]
    fn test_start_requires_first_fetch() {
        let cluster = Arc::new(FakeCluster::new());
        cluster.fail_master(1);
        let cache = Arc::new(MasterStateCache::new(cluster.clone(), Duration::from_secs(60)));
        assert!(cache.start().is_err());

        // A later start succeeds once the master answers.
        cache.start().expect("second start");
        assert!(cache.is_initialized());
        cache.start().expect("idempotent");
        assert_eq!(cluster.master_calls(), 2);
    }

    #[test]
    fn test_background_refresh() {
        let cluster = Arc::new(FakeCluster::new());
        let cache = Arc::new(MasterStateCache::new(cluster.clone(), Duration::from_millis(10)));
        cache.start().expect("start");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while cache.generation() < 3 && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(cache.generation() >= 3);
    }
}
