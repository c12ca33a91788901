//! Event-log plumbing: how actors get lines into the log channel.
//!
//! A [`LogHub`] owns the log channel, the clock and a metrics context; each
//! actor takes a [`Journal`] from it, stamped with its identity and role.
//! `Journal::log` snapshots the metrics block, builds a [`SimLogRecord`]
//! and try-sends it — a full log channel drops the record rather than ever
//! stalling the simulation.

use std::sync::Arc;

use sorsim_protocol::{ActorId, EventRecord, MetricsBlock, Role, SimLogRecord, Specialty};

use crate::channel::{KeyedChannel, TrySendError};
use crate::clock::SimClock;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

/// The single key used on the log channel; log records have no priority
/// levels among themselves.
pub const LOG_KEY: u32 = 1;

/// Handles needed to snapshot the `wR/rQ/tQ/sQ/wSem/sSem` block.
#[derive(Clone)]
pub struct MetricsContext {
    pub state: Arc<SharedState>,
    pub waiting: Arc<WaitingRoom>,
    pub reg_chan: KeyedChannel<EventRecord>,
    pub triage_chan: KeyedChannel<EventRecord>,
    pub spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT],
}

impl MetricsContext {
    pub fn snapshot(&self) -> MetricsBlock {
        let spec_queue: usize = self.spec_chans.iter().map(KeyedChannel::depth).sum();
        MetricsBlock {
            inside: self.state.lock().inside_waiting_room,
            capacity: self.state.capacity(),
            reg_queue: self.reg_chan.depth() as u32,
            triage_queue: self.triage_chan.depth() as u32,
            spec_queue: spec_queue as u32,
            wait_sem: self.waiting.available(),
            state_sem: u32::from(self.state.lock_free()),
        }
    }
}

/// Shared log-channel endpoint all journals write through.
#[derive(Clone)]
pub struct LogHub {
    chan: KeyedChannel<SimLogRecord>,
    clock: Arc<SimClock>,
    metrics: MetricsContext,
}

impl LogHub {
    pub fn new(
        chan: KeyedChannel<SimLogRecord>,
        clock: Arc<SimClock>,
        metrics: MetricsContext,
    ) -> LogHub {
        LogHub {
            chan,
            clock,
            metrics,
        }
    }

    /// A journal stamped with one actor's identity.
    pub fn journal(&self, source: ActorId, role: Role) -> Journal {
        Journal {
            hub: self.clone(),
            source,
            role,
        }
    }

    pub fn channel(&self) -> &KeyedChannel<SimLogRecord> {
        &self.chan
    }

    pub fn clock(&self) -> &Arc<SimClock> {
        &self.clock
    }
}

/// Per-actor logging handle.
#[derive(Clone)]
pub struct Journal {
    hub: LogHub,
    source: ActorId,
    role: Role,
}

impl Journal {
    pub fn source(&self) -> ActorId {
        self.source
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Emit one log line. Never blocks; a saturated log channel loses the
    /// record and a closed one silently swallows it (logging must not keep
    /// a stopping simulation alive).
    pub fn log(&self, text: impl Into<String>) {
        let record = SimLogRecord {
            sim_minute: self.hub.clock.sim_minutes(),
            source: self.source,
            metrics: Some(self.hub.metrics.snapshot()),
            role: self.role,
            text: text.into(),
        };
        match self.hub.chan.try_send(LOG_KEY, record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                tracing::debug!(role = %record.role, "log channel full, dropping record");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorsim_config::SimConfig;

    fn hub_with_capacity(capacity: usize) -> LogHub {
        let state = SharedState::new(4);
        let waiting = WaitingRoom::new(4);
        let metrics = MetricsContext {
            state,
            waiting,
            reg_chan: KeyedChannel::bounded(16),
            triage_chan: KeyedChannel::bounded(16),
            spec_chans: std::array::from_fn(|_| KeyedChannel::bounded(16)),
        };
        let clock = Arc::new(SimClock::start(&SimConfig::default()));
        LogHub::new(KeyedChannel::bounded(capacity), clock, metrics)
    }

    #[tokio::test]
    async fn journal_attaches_metrics_snapshot() {
        let hub = hub_with_capacity(8);
        hub.journal(ActorId::from_u64(3), Role::Triage)
            .log("Triage started");

        let (_, record) = hub.channel().recv_at_most(LOG_KEY).await.unwrap();
        assert_eq!(record.role, Role::Triage);
        assert_eq!(record.source, ActorId::from_u64(3));
        let metrics = record.metrics.unwrap();
        assert_eq!(metrics.capacity, 4);
        assert_eq!(metrics.wait_sem, 4);
        assert_eq!(metrics.state_sem, 1);
    }

    #[tokio::test]
    async fn full_log_channel_drops_instead_of_blocking() {
        let hub = hub_with_capacity(1);
        let journal = hub.journal(ActorId::from_u64(1), Role::Patient);
        journal.log("first");
        journal.log("second");
        assert_eq!(hub.channel().depth(), 1);
    }
}
