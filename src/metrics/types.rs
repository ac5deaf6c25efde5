use std::time::Duration;

use tokio::sync::mpsc;

/// One finished HTTP call. `status` is `None` for transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestSample {
    pub name: &'static str,
    pub duration: Duration,
    pub status: Option<u16>,
    pub failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckSample {
    pub name: &'static str,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricEvent {
    Request(RequestSample),
    Check(CheckSample),
    Iteration { duration: Duration },
    Vus { active: u64, max: u64 },
}

/// Cloneable handle every VU and the HTTP client write samples into.
/// Sends never block; samples sent after the collector finished are dropped.
#[derive(Debug, Clone)]
pub struct MetricsSink {
    tx: mpsc::UnboundedSender<MetricEvent>,
}

impl MetricsSink {
    pub fn request(&self, sample: RequestSample) {
        self.send(MetricEvent::Request(sample));
    }

    pub fn check(&self, name: &'static str, passed: bool) {
        self.send(MetricEvent::Check(CheckSample { name, passed }));
    }

    pub fn iteration(&self, duration: Duration) {
        self.send(MetricEvent::Iteration { duration });
    }

    pub fn vus(&self, active: u64, max: u64) {
        self.send(MetricEvent::Vus { active, max });
    }

    fn send(&self, event: MetricEvent) {
        drop(self.tx.send(event));
    }
}

#[must_use]
pub fn metrics_channel() -> (MetricsSink, mpsc::UnboundedReceiver<MetricEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MetricsSink { tx }, rx)
}
