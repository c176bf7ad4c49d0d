//! Metrics collection module for the auto-swipe daemon.
//!
//! Tracks gesture counts, transmitted frames and uptime.

use crate::transport::ActivitySink;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Metrics data exposed via IPC
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsResponse {
    /// Swipes completed since daemon start
    pub total_swipes: u64,
    /// Like taps completed since daemon start
    pub total_likes: u64,
    /// Swipes in the last hour
    pub swipes_per_hour: u64,
    /// Frames accepted by the transport
    pub frames_sent: u64,
    /// Uptime in seconds
    pub uptime_sec: u64,
}

/// Metrics collector for the daemon
pub struct MetricsCollector {
    start_time: Instant,
    total_swipes: AtomicU64,
    total_likes: AtomicU64,
    frames_sent: AtomicU64,
    /// Swipe timestamps within the last hour
    recent_swipes: RwLock<Vec<Instant>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            total_swipes: AtomicU64::new(0),
            total_likes: AtomicU64::new(0),
            frames_sent: AtomicU64::new(0),
            recent_swipes: RwLock::new(Vec::new()),
        }
    }

    /// Record a completed swipe
    pub fn record_swipe(&self) {
        self.record_swipe_at(Instant::now());
    }

    fn record_swipe_at(&self, now: Instant) {
        self.total_swipes.fetch_add(1, Ordering::SeqCst);

        if let Ok(mut swipes) = self.recent_swipes.write() {
            swipes.push(now);
            if let Some(hour_ago) = now.checked_sub(Duration::from_secs(3600)) {
                swipes.retain(|t| *t > hour_ago);
            }
        }
    }

    /// Record a completed like tap
    pub fn record_like(&self) {
        self.total_likes.fetch_add(1, Ordering::SeqCst);
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> MetricsResponse {
        let now = Instant::now();
        let uptime = now.duration_since(self.start_time);

        let swipes_per_hour = self
            .recent_swipes
            .read()
            .map(|swipes| match now.checked_sub(Duration::from_secs(3600)) {
                Some(hour_ago) => swipes.iter().filter(|t| **t > hour_ago).count() as u64,
                None => swipes.len() as u64,
            })
            .unwrap_or(0);

        MetricsResponse {
            total_swipes: self.total_swipes.load(Ordering::SeqCst),
            total_likes: self.total_likes.load(Ordering::SeqCst),
            swipes_per_hour,
            frames_sent: self.frames_sent.load(Ordering::SeqCst),
            uptime_sec: uptime.as_secs(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivitySink for MetricsCollector {
    fn notify_activity(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_gestures_and_frames() {
        let metrics = MetricsCollector::new();
        metrics.record_swipe();
        metrics.record_swipe();
        metrics.record_like();
        for _ in 0..7 {
            metrics.notify_activity();
        }

        let m = metrics.get_metrics();
        assert_eq!(m.total_swipes, 2);
        assert_eq!(m.total_likes, 1);
        assert_eq!(m.swipes_per_hour, 2);
        assert_eq!(m.frames_sent, 7);
    }

    #[test]
    fn test_old_swipes_leave_hourly_window() {
        let metrics = MetricsCollector::new();
        let now = Instant::now();
        if let Some(old) = now.checked_sub(Duration::from_secs(7200)) {
            metrics.record_swipe_at(old);
            metrics.record_swipe_at(now);
            let m = metrics.get_metrics();
            assert_eq!(m.total_swipes, 2);
            assert_eq!(m.swipes_per_hour, 1);
        }
    }
}
