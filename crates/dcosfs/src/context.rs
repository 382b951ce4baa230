use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::cluster::ClusterClient;
use crate::config::FsConfig;
use crate::master::MasterStateCache;

/// Everything a dynamic directory needs to rebuild itself.
///
/// One context is shared by the whole tree of a mounted filesystem. It holds
/// no nodes, so the tree can point at it freely.
pub struct FsContext {
    pub client: Arc<dyn ClusterClient>,
    pub master: Arc<MasterStateCache>,
    pub clock: Arc<dyn Clock>,
    pub config: FsConfig,
}

impl FsContext {
    pub fn new(client: Arc<dyn ClusterClient>, config: FsConfig) -> Arc<Self> {
        Self::with_clock(client, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: Arc<dyn ClusterClient>,
        config: FsConfig,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let master = Arc::new(MasterStateCache::new(
            client.clone(),
            config.master_refresh_interval(),
        ));
        Arc::new(Self {
            client,
            master,
            clock,
            config,
        })
    }
}
