//! Call metrics for agent turns
//!
//! One [`CallMetrics`] is created at process start and shared by every
//! front end. `wrap` times a turn and bumps the request counter whether the
//! turn succeeds or fails.

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Timing and counter snapshot for one turn
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TurnMetrics {
    pub latency_sec: f64,
    /// Turns handled by this process, including this one
    pub total_requests: u64,
}

/// A value paired with the metrics of the turn that produced it
#[derive(Debug, Clone)]
pub struct Metered<T> {
    pub result: T,
    pub metrics: TurnMetrics,
}

/// Process-wide turn counter and Prometheus instruments
pub struct CallMetrics {
    total_requests: AtomicU64,
    turns: IntCounter,
    failures: IntCounter,
    latency: Histogram,
    registry: Registry,
}

impl CallMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let turns = IntCounter::new("churn_agent_turns_total", "Total number of agent turns")?;
        registry.register(Box::new(turns.clone()))?;

        let failures = IntCounter::new(
            "churn_agent_turn_failures_total",
            "Total number of agent turns that ended in an error",
        )?;
        registry.register(Box::new(failures.clone()))?;

        let latency = Histogram::with_opts(
            HistogramOpts::new(
                "churn_agent_turn_latency_seconds",
                "Agent turn latency in seconds",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]),
        )?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            total_requests: AtomicU64::new(0),
            turns,
            failures,
            latency,
            registry,
        })
    }

    /// Run one turn, recording latency and counting it on both outcomes.
    /// A turn whose future is dropped before completing counts as a failure.
    pub async fn wrap<T, E, F, Fut>(&self, turn: F) -> Result<Metered<T>, Metered<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guard = TurnGuard {
            metrics: self,
            start: Instant::now(),
            finished: false,
        };
        let outcome = turn().await;

        let metrics = guard.finish(outcome.is_ok());
        match outcome {
            Ok(result) => Ok(Metered { result, metrics }),
            Err(error) => Err(Metered {
                result: error,
                metrics,
            }),
        }
    }

    fn record(&self, start: Instant, succeeded: bool) -> TurnMetrics {
        let latency_sec = start.elapsed().as_secs_f64();
        let total_requests = self.total_requests.fetch_add(1, Ordering::SeqCst) + 1;
        self.turns.inc();
        self.latency.observe(latency_sec);
        if !succeeded {
            self.failures.inc();
        }
        TurnMetrics {
            latency_sec,
            total_requests,
        }
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::SeqCst)
    }

    pub fn failures(&self) -> u64 {
        self.failures.get()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Prometheus text exposition of the turn metrics
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Records a turn exactly once, on completion or on drop
struct TurnGuard<'a> {
    metrics: &'a CallMetrics,
    start: Instant,
    finished: bool,
}

impl TurnGuard<'_> {
    fn finish(mut self, succeeded: bool) -> TurnMetrics {
        self.finished = true;
        self.metrics.record(self.start, succeeded)
    }
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let metrics = self.metrics.record(self.start, false);
            tracing::warn!(
                latency_sec = metrics.latency_sec,
                total_requests = metrics.total_requests,
                "Turn cancelled before completing"
            );
        }
    }
}
