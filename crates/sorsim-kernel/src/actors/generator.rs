//! The patient generator: a stream of new arrivals at scaled random
//! intervals.
//!
//! The generator never touches the registration channel itself; it spawns a
//! patient task per arrival and that task does the enqueueing. Backpressure
//! comes from two sides: patients blocked on waiting-room seats pile up
//! against the task cap, and the cap pauses generation until finished tasks
//! are reaped.

use std::sync::Arc;
use std::time::Duration;

use sorsim_protocol::{EventRecord, Patient, Role};
use tokio::task::JoinSet;

use crate::actors::PatientActor;
use crate::channel::KeyedChannel;
use crate::clock::SimClock;
use crate::ids::IdAllocator;
use crate::journal::{Journal, LogHub};
use crate::rng::SimRng;
use crate::signal::Stimulus;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

/// Cap on concurrently live patient tasks.
pub const MAX_PATIENT_TASKS: usize = 2000;

const CAP_RETRY_PAUSE: Duration = Duration::from_millis(50);

pub struct GeneratorActor {
    pub reg_chan: KeyedChannel<EventRecord>,
    pub waiting: Arc<WaitingRoom>,
    pub state: Arc<SharedState>,
    pub clock: Arc<SimClock>,
    pub hub: LogHub,
    pub ids: IdAllocator,
    pub journal: Journal,
    pub stop: Stimulus,
    pub rng: SimRng,
    /// Reference-scale inter-arrival bounds.
    pub gen_ms: (u64, u64),
    /// VIP share, percent.
    pub vip_percent: u32,
}

impl GeneratorActor {
    pub async fn run(mut self) {
        self.journal.log("PatientGenerator running (until stop)");

        // One stop flag shared by every spawned patient; raising it once
        // reaches all outstanding children.
        let patients_stop = Stimulus::new();
        let mut children: JoinSet<()> = JoinSet::new();
        let mut next_patient_id: u64 = 1;
        let mut cap_logged = false;

        loop {
            if self.stop.is_raised() {
                break;
            }
            if self.clock.duration_reached() {
                self.journal
                    .log("PatientGenerator duration reached, stopping");
                break;
            }

            // Reap finished patients opportunistically.
            while children.try_join_next().is_some() {}

            if children.len() >= MAX_PATIENT_TASKS {
                if !cap_logged {
                    self.journal.log(format!(
                        "PatientGenerator waiting for child slots (count={})",
                        children.len()
                    ));
                    cap_logged = true;
                }
                tokio::select! {
                    _ = self.stop.wait() => break,
                    _ = tokio::time::sleep(CAP_RETRY_PAUSE) => {}
                }
                continue;
            }
            cap_logged = false;

            let age: u8 = self.rng.gen_range(1..=90);
            let is_vip = self.rng.percent_roll() < self.vip_percent;
            let patient = Patient::new(next_patient_id, age, is_vip);
            next_patient_id += 1;

            let actor = PatientActor {
                journal: self.hub.journal(self.ids.next(), Role::Patient),
                patient,
                reg_chan: self.reg_chan.clone(),
                waiting: Arc::clone(&self.waiting),
                state: Arc::clone(&self.state),
                stop: patients_stop.clone(),
            };
            children.spawn(actor.run());

            let (min, max) = self.gen_ms;
            let pause = self.clock.scale_interval(self.rng.gen_range(min..=max));
            tokio::select! {
                _ = self.stop.wait() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        // Graceful stop: every outstanding patient gets the stop stimulus,
        // then all of them are joined.
        patients_stop.raise();
        while children.join_next().await.is_some() {}

        self.journal.log("PatientGenerator stopping");
    }
}
