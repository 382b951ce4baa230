// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Listing cache behind dynamic directories.
//!
//! A [`RemoteListingCache`] owns a [`ListingSource`] (what to fetch) and a
//! [`RefreshPolicy`] (when to fetch it). A refresh builds a complete new
//! [`Listing`] and swaps it in; the previous listing and every node in it
//! stay valid for whoever still holds them.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::error::Result;
use crate::lock;
use crate::node::NodeRef;

/// Children of a directory by name.
pub type Listing = BTreeMap<String, NodeRef>;

/// Builds the children of one dynamic directory from the cluster.
pub trait ListingSource: Send + Sync {
    fn fetch(&self) -> Result<Listing>;

    /// Short description for logs, e.g. `sandbox web.1:/logs`.
    fn describe(&self) -> String;
}

/// When a cached listing must be fetched again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Every `list()` fetches.
    Always,
    /// A listing younger than the duration is served from cache.
    Ttl(Duration),
}

impl RefreshPolicy {
    /// `0` means [`RefreshPolicy::Always`].
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            RefreshPolicy::Always
        } else {
            RefreshPolicy::Ttl(Duration::from_secs(secs))
        }
    }

    pub fn is_fresh(&self, last_refresh: Option<Instant>, now: Instant) -> bool {
        match (self, last_refresh) {
            (RefreshPolicy::Ttl(ttl), Some(at)) => now.saturating_duration_since(at) < *ttl,
            _ => false,
        }
    }
}

pub struct RemoteListingCache {
    source: Box<dyn ListingSource>,
    policy: RefreshPolicy,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
}

struct CacheState {
    listing: Arc<Listing>,
    last_refresh: Option<Instant>,
    /// Tickets handed to fetches in the order they started.
    next_ticket: u64,
    /// Ticket of the fetch that produced `listing`.
    installed: Option<u64>,
}

impl RemoteListingCache {
    pub fn new<S: ListingSource + 'static>(
        source: S,
        policy: RefreshPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source: Box::new(source),
            policy,
            clock,
            state: Mutex::new(CacheState {
                listing: Arc::new(Listing::new()),
                last_refresh: None,
                next_ticket: 0,
                installed: None,
            }),
        }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// When the current listing was fetched, `None` before the first fetch.
    pub fn last_refresh_time(&self) -> Option<Instant> {
        lock(&self.state).last_refresh
    }

    /// The current listing, fetched again if the policy says it is stale.
    ///
    /// A failed fetch is returned as is; the previous listing is neither
    /// served nor discarded, so the next call tries again. Concurrent
    /// fetches may overlap; a fetch that started before the installed
    /// listing's fetch is dropped and the installed listing returned.
    pub fn list(&self) -> Result<Arc<Listing>> {
        let now = self.clock.now();
        let ticket = {
            let mut state = lock(&self.state);
            if self.policy.is_fresh(state.last_refresh, now) {
                return Ok(state.listing.clone());
            }
            let ticket = state.next_ticket;
            state.next_ticket += 1;
            ticket
        };

        let what = self.source.describe();
        diagnostics::debug!("Refreshing listing of {what}", what: what);
        let listing = Arc::new(self.source.fetch()?);
        let count = listing.len();
        diagnostics::debug!("Listing of {what} has {count} entries", what: what, count: count);

        let mut state = lock(&self.state);
        if state.installed.is_some_and(|installed| installed > ticket) {
            diagnostics::debug!("Dropped outdated listing of {what}", what: what);
            return Ok(state.listing.clone());
        }
        state.listing = listing.clone();
        state.last_refresh = Some(now);
        state.installed = Some(ticket);
        Ok(listing)
    }

    /// Forces the next `list()` to fetch.
    pub fn invalidate(&self) {
        lock(&self.state).last_refresh = None;
    }
}
