//! Folding log records into a renderable snapshot.

use std::collections::VecDeque;

use sorsim_protocol::{MetricsBlock, Role, SimLogRecord};

const RECENT_EVENTS: usize = 12;

/// Everything the dashboard shows, derived purely from the log stream.
#[derive(Debug, Default)]
pub struct ViewState {
    pub sim_minute: u64,
    /// Latest metrics block seen on any record.
    pub metrics: MetricsBlock,
    pub arrivals: u64,
    pub registered: u64,
    pub sent_home_from_triage: u64,
    pub routed: u64,
    pub handled: u64,
    pub reg2_open: bool,
    pub shutting_down: bool,
    /// Most recent event lines, newest last.
    pub recent: VecDeque<String>,
}

impl ViewState {
    pub fn apply(&mut self, record: &SimLogRecord) {
        self.sim_minute = self.sim_minute.max(record.sim_minute);
        if let Some(metrics) = record.metrics {
            self.metrics = metrics;
        }

        let text = record.text.as_str();
        if text.starts_with("Patient arrived") {
            self.arrivals += 1;
        } else if text.starts_with("Forwarded patient") {
            self.registered += 1;
        } else if text.starts_with("Patient sent home from triage") {
            self.sent_home_from_triage += 1;
        } else if text.starts_with("Routed patient") {
            self.routed += 1;
        } else if text.starts_with("Handled patient") {
            self.handled += 1;
        } else if text.starts_with("Registration2 opened") {
            self.reg2_open = true;
        } else if text.starts_with("Registration2 closing") {
            self.reg2_open = false;
        } else if text.contains("initiating shutdown") {
            self.shutting_down = true;
        }

        self.recent
            .push_back(format!("[{:>4}] {}: {}", record.sim_minute, record.role, text));
        while self.recent.len() > RECENT_EVENTS {
            self.recent.pop_front();
        }
    }

    /// Waiting-room occupancy as a 0..=1 ratio for the gauge.
    pub fn occupancy_ratio(&self) -> f64 {
        if self.metrics.capacity == 0 {
            return 0.0;
        }
        f64::from(self.metrics.inside) / f64::from(self.metrics.capacity)
    }

    pub fn desk_label(&self) -> &'static str {
        if self.reg2_open {
            "reg1+reg2"
        } else {
            "reg1"
        }
    }
}
