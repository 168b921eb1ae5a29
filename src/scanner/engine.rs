//! Sweep engine: queue population, resolver workers and result collection

use crate::config::SweepConfig;
use crate::network::CidrNetwork;
use crate::resolver::{self, NameResolver, ResolutionRecord};
use crate::scanner::queue::WorkQueue;
use crate::scanner::{SweepResult, SweepStats};
use crate::{Result, SweepError};
use futures::future::join_all;
use indicatif::ProgressBar;
use log::{debug, error, info, warn};
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// What a worker reports for each address it acknowledges
#[derive(Debug)]
enum Outcome {
    Resolved(ResolutionRecord),
    Miss(Ipv4Addr),
    TimedOut(Ipv4Addr),
    Failed(Ipv4Addr),
}

/// Main sweep engine
pub struct SweepEngine {
    config: SweepConfig,
    resolver: Arc<dyn NameResolver>,
    progress: ProgressBar,
}

impl SweepEngine {
    /// Create an engine using the resolver selected by the configuration
    pub fn new(config: SweepConfig) -> Result<Self> {
        let resolver = resolver::from_config(&config);
        Self::with_resolver(config, resolver)
    }

    /// Create an engine with an explicit resolver
    pub fn with_resolver(config: SweepConfig, resolver: Arc<dyn NameResolver>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            resolver,
            progress: ProgressBar::hidden(),
        })
    }

    /// Report progress on `progress`, one tick per acknowledged address
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Parse the configured network and enforce the size limit
    pub fn network(&self) -> Result<CidrNetwork> {
        let network = CidrNetwork::parse(&self.config.network)?;

        if network.size() > self.config.max_addresses {
            return Err(SweepError::ConfigError(format!(
                "{} contains {} addresses, more than the limit of {}",
                network,
                network.size(),
                self.config.max_addresses
            )));
        }

        Ok(network)
    }

    /// Resolve every address of the network and return the named hosts
    pub async fn sweep(&self) -> Result<SweepResult> {
        let start_time = Instant::now();

        let network = self.network()?;
        self.resolver.preflight().await?;

        let mut result = SweepResult::new(network.to_string());

        let queue: WorkQueue<Ipv4Addr> = WorkQueue::new();
        for address in network.addresses() {
            queue
                .put(address)
                .map_err(|_| SweepError::ResolverError("work queue closed early".to_string()))?;
        }
        queue.close();

        // Never more workers than addresses
        let worker_count = usize::try_from(network.size())
            .map_or(self.config.threads, |size| self.config.threads.min(size));

        info!(
            "Sweeping {} ({} addresses) with {} {} workers",
            network,
            queue.enqueued(),
            worker_count,
            self.resolver.label()
        );
        self.progress.set_length(network.size());

        let (sink, outcomes) = mpsc::unbounded_channel();
        let collector = tokio::spawn(collect_outcomes(outcomes));

        let workers: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker = Worker {
                    id,
                    queue: queue.clone(),
                    resolver: Arc::clone(&self.resolver),
                    sink: sink.clone(),
                    lookup_timeout: self.config.timeout_duration(),
                    progress: self.progress.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();
        drop(sink);

        // Workers only exit once the closed queue is empty.
        let mut crashed = 0;
        for joined in join_all(workers).await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
                crashed += 1;
            }
        }

        if queue.unfinished() > 0 {
            return Err(SweepError::ResolverError(format!(
                "{} worker(s) failed, {} addresses left unacknowledged",
                crashed,
                queue.unfinished()
            )));
        }
        queue.join().await;

        let (records, mut stats) = collector
            .await
            .map_err(|e| SweepError::ResolverError(format!("result collector failed: {}", e)))?;
        stats.enumerated = queue.enqueued() as u64;

        if stats.acknowledged != queue.acknowledged() as u64 {
            warn!(
                "Collected {} outcomes but the queue acknowledged {}",
                stats.acknowledged,
                queue.acknowledged()
            );
        }

        result.records = records;
        result.stats = stats;
        result.sort(self.config.sort_order);
        result.set_duration(start_time.elapsed());
        self.progress.finish_and_clear();

        info!(
            "Sweep of {} finished in {:.2?}: {} named, {} misses, {} timeouts, {} tool failures",
            result.network,
            result.duration,
            result.stats.resolved,
            result.stats.misses,
            result.stats.timeouts,
            result.stats.tool_failures
        );

        Ok(result)
    }
}

struct Worker {
    id: usize,
    queue: WorkQueue<Ipv4Addr>,
    resolver: Arc<dyn NameResolver>,
    sink: mpsc::UnboundedSender<Outcome>,
    lookup_timeout: Duration,
    progress: ProgressBar,
}

impl Worker {
    async fn run(self) {
        let mut processed = 0usize;

        while let Some(address) = self.queue.get().await {
            let outcome = self.resolve_one(address).await;
            // Send before acknowledging so a drained queue implies a
            // complete set of outcomes.
            if self.sink.send(outcome).is_err() {
                error!("Worker {}: result collector is gone", self.id);
            }
            self.progress.inc(1);
            self.queue.task_done();
            processed += 1;
        }

        debug!("Worker {} exiting after {} addresses", self.id, processed);
    }

    async fn resolve_one(&self, address: Ipv4Addr) -> Outcome {
        match timeout(self.lookup_timeout, self.resolver.resolve(address)).await {
            Ok(Ok(record)) if record.is_valid() => {
                debug!("{}", record);
                Outcome::Resolved(record)
            }
            Ok(Ok(_)) => Outcome::Miss(address),
            Ok(Err(e)) => {
                warn!("{}: {}", address, e);
                Outcome::Failed(address)
            }
            Err(_) => {
                debug!("{}: {}", address, SweepError::TimeoutError(address));
                Outcome::TimedOut(address)
            }
        }
    }
}

async fn collect_outcomes(
    mut outcomes: mpsc::UnboundedReceiver<Outcome>,
) -> (Vec<ResolutionRecord>, SweepStats) {
    let mut records = Vec::new();
    let mut stats = SweepStats::new();

    while let Some(outcome) = outcomes.recv().await {
        stats.acknowledged += 1;
        match outcome {
            Outcome::Resolved(record) => {
                stats.resolved += 1;
                records.push(record);
            }
            Outcome::Miss(address) => {
                debug!("{}: no name", address);
                stats.misses += 1;
            }
            Outcome::TimedOut(address) => {
                debug!("{}: lookup timed out", address);
                stats.timeouts += 1;
            }
            Outcome::Failed(address) => {
                debug!("{}: resolver failed", address);
                stats.tool_failures += 1;
            }
        }
    }

    (records, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct EvenHosts;

    #[async_trait]
    impl NameResolver for EvenHosts {
        fn label(&self) -> &str {
            "even"
        }

        async fn resolve(&self, address: Ipv4Addr) -> Result<ResolutionRecord> {
            let last = address.octets()[3];
            if last % 2 == 0 {
                Ok(ResolutionRecord::resolved(address, format!("host-{}", last)))
            } else {
                Ok(ResolutionRecord::unresolved(address))
            }
        }
    }

    #[tokio::test]
    async fn test_sweep_collects_valid_records_only() {
        let config = SweepConfig::new("10.1.2.0/29").with_threads(3);
        let engine = SweepEngine::with_resolver(config, Arc::new(EvenHosts)).unwrap();

        let result = engine.sweep().await.unwrap();
        let names: Vec<&str> = result.records.iter().filter_map(|r| r.hostname()).collect();
        assert_eq!(names, vec!["host-0", "host-2", "host-4", "host-6"]);
        assert_eq!(result.stats.enumerated, 8);
        assert_eq!(result.stats.acknowledged, 8);
        assert_eq!(result.stats.misses, 4);
    }

    #[tokio::test]
    async fn test_worker_count_capped_by_network_size() {
        let config = SweepConfig::new("10.1.2.0/30").with_threads(usize::MAX);
        let engine = SweepEngine::with_resolver(config, Arc::new(EvenHosts)).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), engine.sweep())
            .await
            .expect("sweep with an oversized thread count should finish promptly")
            .unwrap();
        assert_eq!(result.stats.acknowledged, 4);
        assert_eq!(result.records.len(), 2);
    }

    #[test]
    fn test_zero_threads_rejected_at_construction() {
        let config = SweepConfig::new("10.1.2.0/29").with_threads(0);
        assert!(SweepEngine::with_resolver(config, Arc::new(EvenHosts)).is_err());
    }

    #[test]
    fn test_network_size_limit() {
        let config = SweepConfig::new("10.0.0.0/8");
        let engine = SweepEngine::with_resolver(config, Arc::new(EvenHosts)).unwrap();
        let err = engine.network().unwrap_err();
        assert!(matches!(err, SweepError::ConfigError(_)));

        let config = SweepConfig::new("10.0.0.0/8").with_max_addresses(1 << 24);
        let engine = SweepEngine::with_resolver(config, Arc::new(EvenHosts)).unwrap();
        assert_eq!(engine.network().unwrap().size(), 1 << 24);
    }

    #[tokio::test]
    async fn test_collector_counts_every_outcome() {
        let (tx, rx) = mpsc::unbounded_channel();
        let addr = Ipv4Addr::new(10, 0, 0, 1);
        tx.send(Outcome::Resolved(ResolutionRecord::resolved(addr, "a"))).unwrap();
        tx.send(Outcome::Miss(addr)).unwrap();
        tx.send(Outcome::TimedOut(addr)).unwrap();
        tx.send(Outcome::Failed(addr)).unwrap();
        drop(tx);

        let (records, stats) = collect_outcomes(rx).await;
        assert_eq!(records.len(), 1);
        assert_eq!(
            stats,
            SweepStats {
                enumerated: 0,
                acknowledged: 4,
                resolved: 1,
                misses: 1,
                timeouts: 1,
                tool_failures: 1,
            }
        );
    }
}
