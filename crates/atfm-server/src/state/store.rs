//! The session host's shared state.
//!
//! One `SimulationSession` sits behind a single `RwLock`; handlers and loops
//! take the lock for short synchronous sections and never hold it across a
//! backend call.

use anyhow::Result;
use atfm_backend::AnalyticsClient;
use atfm_core::{OccupancySnapshot, SimulationSession};
use dashmap::DashMap;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::cache::{self, Cached};
use crate::config::Config;

pub struct AppState {
    session: RwLock<SimulationSession>,
    client: AnalyticsClient,
    occupancy_cache: DashMap<String, Cached<OccupancySnapshot>>,
    config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let client = AnalyticsClient::new(config.backend_url.clone(), config.backend_token.clone())?;
        Ok(Self::with_client(config, client))
    }

    pub fn with_client(config: Config, client: AnalyticsClient) -> Self {
        let session = SimulationSession::new(config.engine_settings());
        Self {
            session: RwLock::new(session),
            client,
            occupancy_cache: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn client(&self) -> &AnalyticsClient {
        &self.client
    }

    pub async fn session(&self) -> RwLockReadGuard<'_, SimulationSession> {
        self.session.read().await
    }

    pub async fn session_mut(&self) -> RwLockWriteGuard<'_, SimulationSession> {
        self.session.write().await
    }

    /// Cached occupancy for a traffic volume, if still fresh.
    pub fn cached_occupancy(&self, traffic_volume_id: &str) -> Option<OccupancySnapshot> {
        cache::lookup(
            &self.occupancy_cache,
            &traffic_volume_id.to_string(),
            self.config.cache_max_age(),
        )
    }

    pub fn store_occupancy(&self, snapshot: OccupancySnapshot) {
        self.occupancy_cache
            .insert(snapshot.traffic_volume_id.clone(), Cached::new(snapshot));
        self.prune_occupancy();
    }

    pub fn prune_occupancy(&self) {
        cache::prune_cache(
            &self.occupancy_cache,
            self.config.cache_max_entries,
            self.config.cache_max_age(),
        );
    }

    pub fn occupancy_cache_len(&self) -> usize {
        self.occupancy_cache.len()
    }
}
