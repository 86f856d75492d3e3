//! Rolling tailnet metrics history.
//!
//! A bounded 24-hour window of samples derived from status refreshes,
//! persisted to a JSON side file. Persistence is best-effort: failures are
//! logged and never fail the status call that produced the sample.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use crate::filesys::file::File;
use crate::tailscale::status::DeviceStatus;

/// Default retention window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// One point-in-time measurement of the tailnet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSample {
    /// Unix epoch seconds.
    pub timestamp: u64,
    pub tx_bytes: u64,
    pub rx_bytes: u64,
    pub peer_count: usize,
    pub online_peers: usize,
    pub exit_node_active: bool,
}

impl MetricsSample {
    /// Derive a sample from a parsed status snapshot.
    pub fn from_status(status: &DeviceStatus) -> Self {
        let (tx_bytes, rx_bytes) = status.traffic_totals();
        Self {
            timestamp: now_secs(),
            tx_bytes,
            rx_bytes,
            peer_count: status.peers.len(),
            online_peers: status.online_peers(),
            exit_node_active: status.active_exit_node().is_some(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Time-windowed metrics buffer with JSON persistence.
pub struct MetricsHistory {
    window: Duration,
    file: Option<File>,
    samples: Mutex<VecDeque<MetricsSample>>,
}

impl MetricsHistory {
    pub fn new(window: Duration, file: Option<File>) -> Self {
        Self {
            window,
            file,
            samples: Mutex::new(VecDeque::new()),
        }
    }

    /// Load persisted samples. A missing or corrupt file starts empty.
    pub async fn load(window: Duration, file: File) -> Self {
        let samples = match file.read_json::<Vec<MetricsSample>>().await {
            Ok(samples) => samples.into(),
            Err(e) => {
                if file.exists().await {
                    warn!(path = %file.path().display(), error = %e, "Discarding unreadable metrics history");
                }
                VecDeque::new()
            }
        };

        let history = Self {
            window,
            file: Some(file),
            samples: Mutex::new(samples),
        };
        history.prune_locked(&mut *history.samples.lock().await);
        history
    }

    /// Append a sample, prune the window and persist.
    pub async fn record(&self, sample: MetricsSample) {
        let mut samples = self.samples.lock().await;
        samples.push_back(sample);
        self.prune_locked(&mut samples);

        if let Some(file) = &self.file {
            let snapshot: Vec<MetricsSample> = samples.iter().cloned().collect();
            drop(samples);
            if let Err(e) = file.write_json_atomic(&snapshot).await {
                warn!(path = %file.path().display(), error = %e, "Failed to persist metrics history");
            }
        }
    }

    /// Samples recorded at or after `since` (unix epoch seconds).
    pub async fn samples_since(&self, since: u64) -> Vec<MetricsSample> {
        let samples = self.samples.lock().await;
        samples
            .iter()
            .filter(|s| s.timestamp >= since)
            .cloned()
            .collect()
    }

    /// All retained samples.
    pub async fn all(&self) -> Vec<MetricsSample> {
        let samples = self.samples.lock().await;
        samples.iter().cloned().collect()
    }

    fn prune_locked(&self, samples: &mut VecDeque<MetricsSample>) {
        let cutoff = now_secs().saturating_sub(self.window.as_secs());
        while samples.front().is_some_and(|s| s.timestamp < cutoff) {
            samples.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_at(timestamp: u64) -> MetricsSample {
        MetricsSample {
            timestamp,
            tx_bytes: 1,
            rx_bytes: 2,
            peer_count: 3,
            online_peers: 2,
            exit_node_active: false,
        }
    }

    #[tokio::test]
    async fn test_window_pruning() {
        let history = MetricsHistory::new(Duration::from_secs(60), None);
        history.record(sample_at(now_secs() - 3600)).await;
        history.record(sample_at(now_secs())).await;

        let kept = history.all().await;
        assert_eq!(kept.len(), 1);
    }

    #[tokio::test]
    async fn test_samples_since() {
        let history = MetricsHistory::new(DEFAULT_WINDOW, None);
        let now = now_secs();
        history.record(sample_at(now - 100)).await;
        history.record(sample_at(now - 10)).await;

        assert_eq!(history.samples_since(now - 50).await.len(), 1);
        assert_eq!(history.samples_since(0).await.len(), 2);
    }

    #[test]
    fn test_sample_from_status() {
        let status = DeviceStatus::parse(
            r#"{
                "Self": {"TXBytes": 100, "RXBytes": 200},
                "Peer": {
                    "a": {"Online": true, "TXBytes": 10, "RXBytes": 20, "ExitNode": true},
                    "b": {"Online": false}
                }
            }"#,
        )
        .unwrap();

        let sample = MetricsSample::from_status(&status);
        assert_eq!(sample.tx_bytes, 110);
        assert_eq!(sample.rx_bytes, 220);
        assert_eq!(sample.peer_count, 2);
        assert_eq!(sample.online_peers, 1);
        assert!(sample.exit_node_active);
    }
}
