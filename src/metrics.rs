//! Runtime counters for sessions and peer traffic
//!
//! Counters are plain atomics so they can be shared between the tick loop
//! and whatever host thread reads them. Output is available as Prometheus
//! text, as JSON, or as a one-line log summary.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

const TICK_HISTORY: usize = 1000;

#[derive(Debug)]
pub struct Metrics {
    // Sessions
    pub sessions_started: AtomicU64,
    pub sessions_ended: AtomicU64,
    pub points_scored: AtomicU64,
    pub flaps: AtomicU64,

    // Tick timing (microseconds)
    pub tick_count: AtomicU64,
    pub tick_time_us: AtomicU64,
    pub tick_time_p95_us: AtomicU64,
    pub tick_time_max_us: AtomicU64,

    // Peer traffic
    pub messages_sent: AtomicU64,
    pub messages_received: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub send_failures: AtomicU64,
    pub decode_failures: AtomicU64,
    pub stale_updates: AtomicU64,

    start_time: Instant,
    tick_history: RwLock<VecDeque<u64>>,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_ended: u64,
    pub points_scored: u64,
    pub flaps: u64,
    pub tick_count: u64,
    pub tick_time_p95_us: u64,
    pub tick_time_max_us: u64,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub send_failures: u64,
    pub decode_failures: u64,
    pub stale_updates: u64,
    pub uptime_seconds: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            sessions_ended: AtomicU64::new(0),
            points_scored: AtomicU64::new(0),
            flaps: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
            tick_time_us: AtomicU64::new(0),
            tick_time_p95_us: AtomicU64::new(0),
            tick_time_max_us: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            send_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            stale_updates: AtomicU64::new(0),
            start_time: Instant::now(),
            tick_history: RwLock::new(VecDeque::with_capacity(TICK_HISTORY)),
        }
    }

    #[inline]
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    /// Record one simulation step and refresh the percentiles
    pub fn record_tick_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.tick_time_us.store(us, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);

        let mut history = self.tick_history.write();
        history.push_back(us);
        while history.len() > TICK_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let p95_idx = ((sorted.len() as f32 * 0.95) as usize).min(sorted.len() - 1);
            self.tick_time_p95_us.store(sorted[p95_idx], Ordering::Relaxed);
            self.tick_time_max_us
                .store(sorted.last().copied().unwrap_or(0), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            sessions_started: load(&self.sessions_started),
            sessions_ended: load(&self.sessions_ended),
            points_scored: load(&self.points_scored),
            flaps: load(&self.flaps),
            tick_count: load(&self.tick_count),
            tick_time_p95_us: load(&self.tick_time_p95_us),
            tick_time_max_us: load(&self.tick_time_max_us),
            messages_sent: load(&self.messages_sent),
            messages_received: load(&self.messages_received),
            bytes_sent: load(&self.bytes_sent),
            bytes_received: load(&self.bytes_received),
            send_failures: load(&self.send_failures),
            decode_failures: load(&self.decode_failures),
            stale_updates: load(&self.stale_updates),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    /// Prometheus text exposition
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("floppy_duck_sessions_started_total", "Sessions started", "counter", s.sessions_started);
        metric!("floppy_duck_sessions_ended_total", "Sessions ended", "counter", s.sessions_ended);
        metric!("floppy_duck_points_total", "Points scored", "counter", s.points_scored);
        metric!("floppy_duck_flaps_total", "Flaps applied", "counter", s.flaps);

        metric!("floppy_duck_tick_count", "Simulation steps", "counter", s.tick_count);
        metric!("floppy_duck_tick_time_p95_microseconds", "95th percentile step time", "gauge", s.tick_time_p95_us);
        metric!("floppy_duck_tick_time_max_microseconds", "Maximum step time", "gauge", s.tick_time_max_us);

        metric!("floppy_duck_messages_sent_total", "Peer messages sent", "counter", s.messages_sent);
        metric!("floppy_duck_messages_received_total", "Peer messages received", "counter", s.messages_received);
        metric!("floppy_duck_bytes_sent_total", "Peer bytes sent", "counter", s.bytes_sent);
        metric!("floppy_duck_bytes_received_total", "Peer bytes received", "counter", s.bytes_received);
        metric!("floppy_duck_send_failures_total", "Failed peer sends", "counter", s.send_failures);
        metric!("floppy_duck_decode_failures_total", "Dropped malformed payloads", "counter", s.decode_failures);
        metric!("floppy_duck_stale_updates_total", "Dropped out-of-order updates", "counter", s.stale_updates);
        metric!("floppy_duck_uptime_seconds", "Process uptime", "counter", s.uptime_seconds);

        output
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            "Sessions {}/{} | points {} | flaps {} | ticks {} (p95 {}us) | msgs {}/{} | dropped {} malformed, {} stale",
            s.sessions_ended,
            s.sessions_started,
            s.points_scored,
            s.flaps,
            s.tick_count,
            s.tick_time_p95_us,
            s.messages_sent,
            s.messages_received,
            s.decode_failures,
            s.stale_updates
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
