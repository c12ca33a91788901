//! The registration desk: VIP-first intake, service delay, forward to
//! triage.
//!
//! Two instances may run concurrently on the same channel — the primary
//! desk, and the secondary one the director provisions under load. Both are
//! this same actor with a different role tag.

use std::sync::Arc;
use std::time::Duration;

use sorsim_protocol::{registered_key, EventRecord, KEY_NORMAL};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::actors::release_seats;
use crate::channel::KeyedChannel;
use crate::clock::SimClock;
use crate::journal::Journal;
use crate::signal::Stimulus;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

pub struct RegistrationActor {
    pub reg_chan: KeyedChannel<EventRecord>,
    pub triage_chan: KeyedChannel<EventRecord>,
    pub waiting: Arc<WaitingRoom>,
    pub state: Arc<SharedState>,
    pub clock: Arc<SimClock>,
    pub journal: Journal,
    pub stop: Stimulus,
    /// Reference-scale service time per patient; zero is allowed.
    pub service_ms: u64,
}

impl RegistrationActor {
    pub async fn run(self) {
        self.journal
            .log(format!("{} desk open", desk_name(&self.journal)));

        let mut heartbeat = interval_at(Instant::now() + HEARTBEAT_PERIOD, HEARTBEAT_PERIOD);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.stop.wait() => break,
                _ = heartbeat.tick() => self.emit_heartbeat(),
                received = self.reg_chan.recv_at_most(KEY_NORMAL) => match received {
                    // Channel destroyed while blocked: normal shutdown path.
                    Err(_closed) => break,
                    Ok((_key, record)) => self.handle(record).await,
                },
            }
        }

        self.journal
            .log(format!("{} desk shutting down", desk_name(&self.journal)));
    }

    async fn handle(&self, record: EventRecord) {
        {
            let mut state = self.state.lock();
            if state.registration_queue_len > 0 {
                state.registration_queue_len -= 1;
            }
        }

        let patient = &record.patient;
        self.journal.log(format!(
            "Registering patient id={} vip={} persons={}",
            patient.id,
            u8::from(patient.is_vip),
            patient.persons_count
        ));

        self.clock.sleep_scaled(self.service_ms).await;

        let key = registered_key(patient.is_vip);
        let persons = patient.persons_count;
        let id = patient.id;
        let vip = u8::from(patient.is_vip);
        match self.triage_chan.send_backoff(key, record).await {
            Ok(()) => {
                // Seats stay held; the patient is merely moving deeper into
                // the pipeline and the decider downstream will release them.
                self.journal.log(format!(
                    "Forwarded patient id={} vip={} persons={}",
                    id, vip, persons
                ));
            }
            Err(_closed) => {
                // Nobody downstream will ever see this patient again, so the
                // desk becomes the decider: free the seats, never leak
                // capacity.
                release_seats(&self.state, &self.waiting, persons);
                self.journal.log(format!(
                    "Dropped patient id={} due to triage send failure; released waiting room seats",
                    id
                ));
            }
        }
    }

    fn emit_heartbeat(&self) {
        let queue_len = self.reg_chan.depth();
        let wait_sem = self.waiting.available();
        let inside = self.state.lock().inside_waiting_room;
        self.journal.log(format!(
            "HEARTBEAT REG qLen={} waitSem={} inside={}",
            queue_len, wait_sem, inside
        ));
    }
}

fn desk_name(journal: &Journal) -> &'static str {
    match journal.role() {
        sorsim_protocol::Role::Reg2 => "Registration2",
        _ => "Registration",
    }
}
