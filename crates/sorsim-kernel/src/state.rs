//! The shared-state region and its lock.
//!
//! One mutex guards every mutable field — the "state lock". Guard sections
//! are short and never cross an await point, so a plain `std::sync::Mutex`
//! is the right tool. Capacity is immutable after init and lives outside
//! the lock.

use std::sync::{Arc, Mutex, MutexGuard};

use sorsim_protocol::ActorId;

/// Mutable portion of the shared region. Counters are monotone; occupancy
/// moves both ways but never leaves `0..=capacity`.
#[derive(Debug, Default, Clone)]
pub struct StateInner {
    /// Persons currently occupying waiting-room seats.
    pub inside_waiting_room: u32,
    /// Advisory registration-queue length, tracked symmetrically with the
    /// registration channel. The channel depth is authoritative; this is a
    /// diagnostic fallback.
    pub registration_queue_len: u32,
    pub reg2_active: bool,

    pub total_patients: u64,
    pub triage_red: u64,
    pub triage_yellow: u64,
    pub triage_green: u64,
    pub triage_sent_home: u64,

    pub outcome_home: u64,
    pub outcome_ward: u64,
    pub outcome_other: u64,

    pub director_id: Option<ActorId>,
    pub reg1_id: Option<ActorId>,
    pub reg2_id: Option<ActorId>,
    pub triage_id: Option<ActorId>,
    pub specialist_ids: [Option<ActorId>; 6],
    /// Every Registration2 ever provisioned, in order.
    pub reg2_history: Vec<ActorId>,
}

#[derive(Debug)]
pub struct SharedState {
    capacity: u32,
    inner: Mutex<StateInner>,
}

impl SharedState {
    pub fn new(capacity: u32) -> Arc<SharedState> {
        Arc::new(SharedState {
            capacity,
            inner: Mutex::new(StateInner::default()),
        })
    }

    /// Waiting-room capacity N.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Take the state lock.
    pub fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap()
    }

    /// Owned copy of the current state, for the monitor and the summary.
    pub fn snapshot(&self) -> StateInner {
        self.lock().clone()
    }

    /// Availability probe for the `sSem` metrics field: 1 when the lock is
    /// free, 0 when some actor holds it.
    pub fn lock_free(&self) -> bool {
        match self.inner.try_lock() {
            Ok(_guard) => true,
            Err(_) => false,
        }
    }

    /// Occupancy decrement used by the deciders, floored at zero so a stray
    /// double-release cannot wrap the counter.
    pub fn leave_waiting_room(&self, persons: u32) {
        let mut inner = self.lock();
        inner.inside_waiting_room = inner.inside_waiting_room.saturating_sub(persons);
    }
}
