//! Periodic polling of the endpoint list.
//!
//! Each round probes every probeable endpoint concurrently, at most
//! `max_parallel` at a time. Endpoints sharing a query URL are probed once
//! per round. A failed probe is reported for its endpoints and never stops
//! the rest of the round.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::endpoint::{EndpointDescriptor, EndpointStorage};
use crate::probe::{Dispatcher, Status};

/// Outcome of one probed query URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    /// Address that was probed.
    pub query_url: String,
    /// Display names of the endpoints sharing this address.
    pub names: Vec<String>,
    /// Classified status, or the error that stopped the probe.
    pub outcome: Result<Status, String>,
}

/// Polls endpoint lists through a [`Dispatcher`].
#[derive(Clone)]
pub struct Monitor {
    dispatcher: Dispatcher,
    max_parallel: usize,
}

impl Monitor {
    /// Creates a monitor running at most `max_parallel` probes at once.
    #[must_use]
    pub fn new(dispatcher: Dispatcher, max_parallel: usize) -> Self {
        Self {
            dispatcher,
            max_parallel: max_parallel.max(1),
        }
    }

    /// Probes `endpoints` once.
    ///
    /// Reports come back in list order of each URL's first occurrence.
    pub async fn run_round(&self, endpoints: &[EndpointDescriptor]) -> Vec<ProbeReport> {
        let mut urls: Vec<String> = Vec::new();
        let mut names: HashMap<String, Vec<String>> = HashMap::new();

        for endpoint in endpoints {
            let Some(url) = endpoint.query_url() else {
                debug!(name = endpoint.display_name(), "skipping idle endpoint");
                continue;
            };
            let entry = names.entry(url.clone()).or_default();
            if entry.is_empty() {
                urls.push(url);
            }
            entry.push(endpoint.display_name().to_string());
        }

        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let mut tasks = JoinSet::new();

        for (index, url) in urls.iter().enumerate() {
            let dispatcher = self.dispatcher.clone();
            let semaphore = Arc::clone(&semaphore);
            let url = url.clone();

            tasks.spawn(async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire_owned().await;
                let outcome = dispatcher.probe(&url).await.map_err(|e| e.to_string());
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<Status, String>>> =
            (0..urls.len()).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = outcomes.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(e) => error!("probe task failed: {}", e),
            }
        }

        urls.into_iter()
            .zip(outcomes)
            .map(|(url, outcome)| ProbeReport {
                names: names.remove(&url).unwrap_or_default(),
                outcome: outcome.unwrap_or_else(|| Err("probe task failed".to_string())),
                query_url: url,
            })
            .collect()
    }

    /// Polls the list in `storage` every `interval` until `shutdown`
    /// resolves.
    ///
    /// The list is reloaded each round so edits take effect without a
    /// restart. The first round starts immediately.
    pub async fn watch<F, S>(
        &self,
        storage: &EndpointStorage,
        interval: Duration,
        mut on_round: F,
        shutdown: S,
    ) where
        F: FnMut(&[ProbeReport]),
        S: Future<Output = ()>,
    {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval_secs = interval.as_secs(),
            path = %storage.path().display(),
            "watching endpoint list"
        );

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = timer.tick() => {}
            }

            let list = match storage.load() {
                Ok(list) => list,
                Err(e) => {
                    warn!("Failed to load endpoint list: {}", e);
                    continue;
                }
            };

            let reports = tokio::select! {
                () = &mut shutdown => break,
                reports = self.run_round(list.as_slice()) => reports,
            };

            let reachable = reports
                .iter()
                .filter(|r| r.outcome.as_ref().is_ok_and(Status::is_reachable))
                .count();
            info!(probed = reports.len(), reachable, "polling round finished");

            on_round(&reports);
        }

        info!("watch stopped");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::endpoint::{EndpointList, ProbeTarget, Scheme};
    use crate::probe::{Probe, ProbeError};

    /// Counts calls and in-flight probes; fails for hosts named "boom".
    #[derive(Default)]
    struct CountingProbe {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Probe for CountingProbe {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn probe(&self, target: &ProbeTarget) -> Result<Status, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if target.host() == "boom" {
                Err(ProbeError::Unexpected("boom".to_string()))
            } else {
                Ok(Status::reachable())
            }
        }
    }

    fn monitor(probe: &Arc<CountingProbe>, max_parallel: usize) -> Monitor {
        let dispatcher = Dispatcher::new(probe.clone(), probe.clone());
        Monitor::new(dispatcher, max_parallel)
    }

    #[tokio::test]
    async fn test_round_deduplicates_and_skips_idle() {
        let probe = Arc::new(CountingProbe::default());
        let endpoints = vec![
            EndpointDescriptor::new(Scheme::Https, "a.example").with_name("first"),
            EndpointDescriptor::new(Scheme::Https, "a.example").with_name("second"),
            EndpointDescriptor::default(),
            EndpointDescriptor::new(Scheme::Ssh, "b.example"),
        ];

        let reports = monitor(&probe, 8).run_round(&endpoints).await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].query_url, "https://a.example");
        assert_eq!(reports[0].names, vec!["first", "second"]);
        assert_eq!(reports[1].query_url, "ssh://b.example");
    }

    #[tokio::test]
    async fn test_round_survives_failures() {
        let probe = Arc::new(CountingProbe::default());
        let endpoints = vec![
            EndpointDescriptor::new(Scheme::Http, "boom"),
            EndpointDescriptor::new(Scheme::Http, "fine"),
            EndpointDescriptor::new(Scheme::Other("ftp".to_string()), "files"),
        ];

        let reports = monitor(&probe, 8).run_round(&endpoints).await;

        assert_eq!(reports.len(), 3);
        assert!(reports[0].outcome.is_err());
        assert_eq!(reports[1].outcome, Ok(Status::reachable()));
        assert_eq!(reports[2].outcome, Ok(Status::not_implemented()));
    }

    #[tokio::test]
    async fn test_round_respects_parallel_limit() {
        let probe = Arc::new(CountingProbe::default());
        let endpoints: Vec<_> = (0..10)
            .map(|i| EndpointDescriptor::new(Scheme::Http, format!("host{i}")))
            .collect();

        monitor(&probe, 3).run_round(&endpoints).await;

        assert_eq!(probe.calls.load(Ordering::SeqCst), 10);
        assert!(probe.peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_watch_runs_until_shutdown() {
        let dir = TempDir::new().unwrap();
        let storage = EndpointStorage::with_path(dir.path().join("list.json"));
        let mut list = EndpointList::new();
        list.push(EndpointDescriptor::new(Scheme::Https, "watched.example"))
            .unwrap();
        storage.save(&list).unwrap();

        let probe = Arc::new(CountingProbe::default());
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        let mut stop_tx = Some(stop_tx);
        let mut rounds = Vec::new();

        monitor(&probe, 4)
            .watch(
                &storage,
                Duration::from_millis(10),
                |reports| {
                    rounds.push(reports.to_vec());
                    if rounds.len() == 2 {
                        if let Some(tx) = stop_tx.take() {
                            let _ = tx.send(());
                        }
                    }
                },
                async {
                    let _ = stop_rx.await;
                },
            )
            .await;

        assert_eq!(rounds.len(), 2);
        assert_eq!(rounds[0][0].query_url, "https://watched.example");
    }
}
