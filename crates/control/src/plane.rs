//! The control plane

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;

use sluice_config::{
    AggregationPolicy, FilterRule, FilterStore, PolicyStore, Settings, Source, SourceId,
    SourceStore, TemplateStore,
};
use sluice_metrics::{MetricsRegistry, SourceSnapshot, SystemMonitor, SystemSnapshot};
use sluice_pipeline::{Pool, PoolConfig};
use sluice_sinks::SinkAdapter;
use sluice_sources::{ListenerMux, TcpTuning};

use crate::error::ControlError;
use crate::ingest::IngestRouter;

/// What `metrics()` returns: per-source counters plus a system snapshot
#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub sources: BTreeMap<String, SourceSnapshot>,
    pub system: SystemSnapshot,
}

/// Owns and reconciles the whole data plane
pub struct ControlPlane {
    settings: Settings,
    sources: SourceStore,
    templates: Arc<TemplateStore>,
    policies: PolicyStore,
    filters: FilterStore,
    registry: Arc<MetricsRegistry>,
    system: SystemMonitor,
    router: Arc<IngestRouter>,
    mux: ListenerMux,
    pools: HashMap<SourceId, Pool>,
    running: bool,
}

impl ControlPlane {
    /// Open every store under the settings' data directory and build an
    /// idle plane. Nothing listens until [`start`](Self::start).
    pub fn new(settings: Settings) -> Result<Self, ControlError> {
        let data_dir = settings.data_dir.clone();
        let sources = SourceStore::open(&data_dir)?;
        let templates = Arc::new(TemplateStore::open(&data_dir)?);
        let policies = PolicyStore::open(&data_dir)?;
        let filters = FilterStore::open(&data_dir)?;

        let registry = Arc::new(MetricsRegistry::new());
        let router = Arc::new(IngestRouter::new(Arc::clone(&registry)));
        let ingest: Arc<dyn sluice_sources::Ingest> = router.clone();
        let mux = ListenerMux::new(
            ingest,
            TcpTuning {
                idle_timeout: settings.tcp_idle_timeout,
            },
        );

        tracing::info!(
            data_dir = %data_dir.display(),
            sources = sources.len(),
            "control plane initialized"
        );

        Ok(Self {
            settings,
            sources,
            templates,
            policies,
            filters,
            registry,
            system: SystemMonitor::new(),
            router,
            mux,
            pools: HashMap::new(),
            running: false,
        })
    }

    /// Test hook: bind listeners on a specific address instead of all
    /// interfaces.
    pub fn bind_ip(mut self, ip: std::net::IpAddr) -> Self {
        let ingest: Arc<dyn sluice_sources::Ingest> = self.router.clone();
        self.mux = ListenerMux::new(
            ingest,
            TcpTuning {
                idle_timeout: self.settings.tcp_idle_timeout,
            },
        )
        .with_bind_ip(ip);
        self
    }

    /// Spawn pools for every configured source, then bind listeners.
    ///
    /// A bind failure at startup is fatal: affected sources get a
    /// `last_error`, everything is torn down, and `Bind` is returned so
    /// the launcher can exit with its bind-failure code.
    pub async fn start(&mut self) -> Result<(), ControlError> {
        if self.running {
            return Ok(());
        }

        let snapshot = self.sources.snapshot();
        for source in &snapshot {
            self.spawn_pool(source.clone())?;
        }

        let failures = self.mux.apply(&snapshot).await;
        if !failures.is_empty() {
            for (endpoint, error) in &failures {
                for source in snapshot.iter().filter(|s| s.endpoint() == *endpoint) {
                    self.registry
                        .handle(source.id.as_str())
                        .set_last_error(error.to_string());
                }
            }
            let endpoints = failures
                .iter()
                .map(|(e, _)| e.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            self.stop().await;
            return Err(ControlError::Bind { endpoints });
        }

        self.running = true;
        tracing::info!(sources = snapshot.len(), "control plane started");
        Ok(())
    }

    /// Stop listeners first (no new data), then drain every pool up to
    /// the drain deadline.
    pub async fn stop(&mut self) {
        self.mux.shutdown().await;

        let pools: Vec<Pool> = self.pools.drain().map(|(_, pool)| pool).collect();
        for id in pools.iter().map(|p| p.source().id.clone()) {
            self.router.unregister(&id);
        }

        // Pools drain concurrently; each bounds itself by the deadline
        let mut handles = Vec::with_capacity(pools.len());
        for pool in pools {
            handles.push(tokio::spawn(pool.shutdown()));
        }
        for handle in handles {
            let _ = handle.await;
        }

        self.running = false;
        tracing::info!("control plane stopped");
    }

    /// Whether `start` has completed and `stop` has not
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Re-read `sources.json` and reconcile running state.
    ///
    /// Unchanged sources keep their pool and socket; changed ones are
    /// drained and respawned; new ones spawn; removed ones drain away.
    /// An unchanged source set is a complete no-op.
    pub async fn reload(&mut self) -> Result<(), ControlError> {
        self.sources = SourceStore::open(&self.settings.data_dir)?;
        if !self.running {
            return Ok(());
        }

        let snapshot = self.sources.snapshot();
        let desired: HashMap<SourceId, Source> =
            snapshot.iter().map(|s| (s.id.clone(), s.clone())).collect();

        // Tear down pools whose source vanished or changed
        let stale: Vec<SourceId> = self
            .pools
            .iter()
            .filter(|(id, pool)| desired.get(*id) != Some(pool.source()))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &stale {
            self.remove_pool(id).await;
        }

        // Spawn pools for new or changed sources, refresh the rest
        for source in &snapshot {
            match self.pools.get(&source.id) {
                Some(pool) => {
                    pool.update_filters(self.filters.get(&source.id));
                    pool.update_policy(self.policies.get(&source.id));
                }
                None => self.spawn_pool(source.clone())?,
            }
        }

        let failures = self.mux.apply(&snapshot).await;
        for (endpoint, error) in &failures {
            tracing::error!(%endpoint, error = %error, "endpoint failed on reload");
            for source in snapshot.iter().filter(|s| s.endpoint() == *endpoint) {
                self.registry
                    .handle(source.id.as_str())
                    .set_last_error(error.to_string());
            }
        }

        tracing::info!(
            sources = snapshot.len(),
            replaced = stale.len(),
            "reload reconciled"
        );
        Ok(())
    }

    /// Per-source counters plus a system resource snapshot
    pub fn metrics(&self) -> MetricsReport {
        MetricsReport {
            sources: self.registry.collect(),
            system: self.system.snapshot(),
        }
    }

    // =========================================================================
    // Source CRUD
    // =========================================================================

    /// Validate and persist a new source; if the plane is running, its
    /// pool and listener come up immediately.
    pub async fn add_source(&mut self, source: Source) -> Result<(), ControlError> {
        self.sources.add(source.clone())?;

        if self.running {
            self.spawn_pool(source)?;
            let snapshot = self.sources.snapshot();
            self.mux.apply(&snapshot).await;
        }
        Ok(())
    }

    /// Replace a source atomically: the old pool drains, the new one
    /// spawns, listeners re-route.
    pub async fn update_source(&mut self, source: Source) -> Result<(), ControlError> {
        self.sources.update(source.clone())?;

        if self.running {
            self.remove_pool(&source.id).await;
            self.spawn_pool(source)?;
            let snapshot = self.sources.snapshot();
            self.mux.apply(&snapshot).await;
        }
        Ok(())
    }

    /// Delete a source: its queue drains with the pool, then the queue,
    /// metrics entry, and per-source state files go away.
    pub async fn delete_source(&mut self, id: &SourceId) -> Result<(), ControlError> {
        self.sources.delete(id)?;

        if self.running {
            self.remove_pool(id).await;
            let snapshot = self.sources.snapshot();
            self.mux.apply(&snapshot).await;
        }

        self.templates.delete(id)?;
        self.policies.delete(id)?;
        self.filters.delete(id)?;
        self.registry.remove(id.as_str());
        Ok(())
    }

    /// The current source set
    pub fn sources(&self) -> Vec<Source> {
        self.sources.snapshot()
    }

    // =========================================================================
    // Per-source policies
    // =========================================================================

    /// Replace a source's filter rules; running workers pick the new
    /// set up at their next batch.
    pub fn set_filters(&mut self, id: &SourceId, rules: Vec<FilterRule>) -> Result<(), ControlError> {
        let rules = self.filters.set(id, rules)?;
        if let Some(pool) = self.pools.get(id) {
            pool.update_filters(rules);
        }
        Ok(())
    }

    /// Create or replace a source's aggregation policy.
    pub fn set_policy(&mut self, id: &SourceId, policy: AggregationPolicy) -> Result<(), ControlError> {
        let policy = self.policies.set(id, policy)?;
        if let Some(pool) = self.pools.get(id) {
            pool.update_policy(Some(policy));
        }
        Ok(())
    }

    /// Remove a source's aggregation policy.
    pub fn delete_policy(&mut self, id: &SourceId) -> Result<(), ControlError> {
        self.policies.delete(id)?;
        if let Some(pool) = self.pools.get(id) {
            pool.update_policy(None);
        }
        Ok(())
    }

    /// Drop a source's learned template; the next parsed record learns
    /// a fresh one.
    pub fn delete_template(&mut self, id: &SourceId) -> Result<(), ControlError> {
        self.templates.delete(id)?;
        if let Some(pool) = self.pools.get(id) {
            pool.clear_template();
        }
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn spawn_pool(&mut self, source: Source) -> Result<(), ControlError> {
        let sink = SinkAdapter::from_target(&source.name, &source.target)?;
        let metrics = self.registry.handle(source.id.as_str());
        let config = PoolConfig::for_source(
            &source,
            self.settings.max_batch_latency,
            self.settings.drain_timeout,
        );

        let pool = Pool::spawn(
            source.clone(),
            sink,
            metrics,
            Arc::clone(&self.templates),
            self.filters.get(&source.id),
            self.policies.get(&source.id),
            self.templates.get(&source.id),
            config,
        );

        self.router.register(source.id.clone(), pool.sender());
        self.pools.insert(source.id, pool);
        Ok(())
    }

    async fn remove_pool(&mut self, id: &SourceId) {
        // Unregister first so listeners stop feeding the queue
        self.router.unregister(id);
        if let Some(pool) = self.pools.remove(id) {
            pool.shutdown().await;
        }
    }
}
