//! Simulation clock: wall time in, simulated minutes out.
//!
//! `time_scale_ms_per_sim_minute` wall-clock milliseconds correspond to one
//! simulated minute. All modeled durations (service times, exam and leave
//! intervals, patient inter-arrival gaps) are expressed at the reference
//! scale of 20 ms/min and stretched or compressed linearly with the
//! configured scale, with a 1 ms floor so a nonzero duration never rounds
//! away entirely.

use std::time::Duration;

use sorsim_config::{SimConfig, REFERENCE_SCALE_MS};
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct SimClock {
    start: Instant,
    ms_per_sim_minute: u64,
    duration_minutes: u32,
}

impl SimClock {
    /// Start the clock now.
    pub fn start(config: &SimConfig) -> SimClock {
        SimClock {
            start: Instant::now(),
            ms_per_sim_minute: config.time_scale_ms_per_sim_minute,
            duration_minutes: config.simulation_duration_minutes,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Simulated minutes since start (the log timestamp).
    pub fn sim_minutes(&self) -> u64 {
        self.elapsed().as_millis() as u64 / self.ms_per_sim_minute.max(1)
    }

    /// Wall-clock minutes since start.
    pub fn real_minutes(&self) -> u64 {
        self.elapsed().as_secs() / 60
    }

    /// True once the configured wall-clock duration has elapsed. A duration
    /// of zero disables the condition entirely.
    pub fn duration_reached(&self) -> bool {
        self.duration_minutes > 0 && self.real_minutes() >= u64::from(self.duration_minutes)
    }

    /// Stretch a reference-scale duration to the configured time scale.
    /// Zero stays zero; anything positive keeps at least a millisecond.
    pub fn scale_interval(&self, base_ms: u64) -> Duration {
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let scaled = (base_ms * self.ms_per_sim_minute / REFERENCE_SCALE_MS).max(1);
        Duration::from_millis(scaled)
    }

    /// Sleep a reference-scale duration, scaled. No-op for zero.
    pub async fn sleep_scaled(&self, base_ms: u64) {
        let duration = self.scale_interval(base_ms);
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }

    /// Simulated seconds represented by `elapsed` wall time, for the
    /// summary's elapsed-time line.
    pub fn simulated_seconds(&self, elapsed: Duration) -> u64 {
        elapsed.as_millis() as u64 * 60 / self.ms_per_sim_minute.max(1)
    }
}
