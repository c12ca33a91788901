//! The patient actor: enter the waiting room, hand off to registration,
//! leave the scene.
//!
//! The seats a patient acquires outlive the task itself — they are released
//! downstream by whichever actor decides the patient leaves the waiting
//! room, never here.

use std::sync::Arc;

use sorsim_protocol::{arrival_key, EventRecord, Patient};
use tokio::time::sleep;

use crate::channel::{KeyedChannel, TrySendError, SEND_RETRY_BACKOFF};
use crate::journal::Journal;
use crate::signal::Stimulus;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

pub struct PatientActor {
    pub patient: Patient,
    pub reg_chan: KeyedChannel<EventRecord>,
    pub waiting: Arc<WaitingRoom>,
    pub state: Arc<SharedState>,
    pub journal: Journal,
    pub stop: Stimulus,
}

impl PatientActor {
    pub async fn run(self) {
        let patient = &self.patient;
        self.journal.log(format!(
            "Patient waiting to enter waiting room id={} persons={}",
            patient.id, patient.persons_count
        ));

        // Observability-only companion for under-18s. It never touches the
        // waiting room and is always stopped before this task returns.
        let guardian_stop = Stimulus::new();
        let guardian = if patient.has_guardian {
            Some(tokio::spawn(guardian_task(
                self.journal.clone(),
                patient.id,
                guardian_stop.clone(),
            )))
        } else {
            None
        };

        let admitted = tokio::select! {
            _ = self.stop.wait() => false,
            result = self.waiting.acquire(patient.persons_count) => match result {
                Ok(()) => true,
                Err(error) => {
                    self.journal
                        .log(format!("Patient admission failed id={}: {}", patient.id, error));
                    false
                }
            },
        };

        if admitted {
            {
                let mut state = self.state.lock();
                state.inside_waiting_room += patient.persons_count;
                state.registration_queue_len += 1;
                state.total_patients += 1;
            }
            self.journal.log(format!(
                "Patient arrived id={} age={} vip={} persons={} guardian={}",
                patient.id,
                patient.age,
                u8::from(patient.is_vip),
                patient.persons_count,
                u8::from(patient.has_guardian)
            ));

            self.enqueue_arrival().await;
        }

        guardian_stop.raise();
        if let Some(handle) = guardian {
            let _ = handle.await;
        }
    }

    /// Hand the arrival to registration: retry a full channel every
    /// millisecond, stop retrying if the whole simulation is stopping, and
    /// treat a closed channel as a quiet exit. Seats stay held either way.
    async fn enqueue_arrival(&self) {
        let key = arrival_key(self.patient.is_vip);
        let mut record = EventRecord::new(self.patient.clone());
        loop {
            match self.reg_chan.try_send(key, record) {
                Ok(()) => {
                    self.journal
                        .log(format!("Patient registered id={}", self.patient.id));
                    return;
                }
                Err(TrySendError::Full(returned)) => {
                    record = returned;
                    tokio::select! {
                        _ = self.stop.wait() => return,
                        _ = sleep(SEND_RETRY_BACKOFF) => {}
                    }
                }
                Err(TrySendError::Closed(_)) => return,
            }
        }
    }
}

async fn guardian_task(journal: Journal, patient_id: u64, stop: Stimulus) {
    journal.log(format!("Guardian present for patient id={}", patient_id));
    stop.wait().await;
    journal.log(format!("Guardian leaving for patient id={}", patient_id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{LogHub, MetricsContext, LOG_KEY};
    use crate::clock::SimClock;
    use sorsim_config::SimConfig;
    use sorsim_protocol::{ActorId, Role, SimLogRecord};

    struct Fixture {
        reg_chan: KeyedChannel<EventRecord>,
        waiting: Arc<WaitingRoom>,
        state: Arc<SharedState>,
        hub: LogHub,
    }

    fn fixture(capacity: u32) -> Fixture {
        let state = SharedState::new(capacity);
        let waiting = WaitingRoom::new(capacity);
        let reg_chan = KeyedChannel::bounded(64);
        let metrics = MetricsContext {
            state: Arc::clone(&state),
            waiting: Arc::clone(&waiting),
            reg_chan: reg_chan.clone(),
            triage_chan: KeyedChannel::bounded(64),
            spec_chans: std::array::from_fn(|_| KeyedChannel::bounded(64)),
        };
        let clock = Arc::new(SimClock::start(&SimConfig::default()));
        let hub = LogHub::new(KeyedChannel::bounded(256), clock, metrics);
        Fixture {
            reg_chan,
            waiting,
            state,
            hub,
        }
    }

    fn actor(fixture: &Fixture, patient: Patient) -> PatientActor {
        PatientActor {
            journal: fixture.hub.journal(ActorId::from_u64(patient.id), Role::Patient),
            patient,
            reg_chan: fixture.reg_chan.clone(),
            waiting: Arc::clone(&fixture.waiting),
            state: Arc::clone(&fixture.state),
            stop: Stimulus::new(),
        }
    }

    async fn drain_log(fixture: &Fixture) -> Vec<SimLogRecord> {
        let mut records = Vec::new();
        while let Some((_, record)) = fixture.hub.channel().try_recv_at_most(LOG_KEY) {
            records.push(record);
        }
        records
    }

    #[tokio::test]
    async fn solo_adult_enqueues_and_keeps_seat() {
        let fixture = fixture(4);
        actor(&fixture, Patient::new(1, 40, false)).run().await;

        // Seat still held: release happens downstream.
        assert_eq!(fixture.waiting.available(), 3);
        let state = fixture.state.snapshot();
        assert_eq!(state.inside_waiting_room, 1);
        assert_eq!(state.registration_queue_len, 1);
        assert_eq!(state.total_patients, 1);

        let (key, record) = fixture.reg_chan.try_recv_at_most(u32::MAX).unwrap();
        assert_eq!(key, 2);
        assert_eq!(record.patient.id, 1);
        assert_eq!(record.extra, "solo");
    }

    #[tokio::test]
    async fn vip_arrival_uses_priority_key() {
        let fixture = fixture(4);
        actor(&fixture, Patient::new(2, 30, true)).run().await;
        let (key, _) = fixture.reg_chan.try_recv_at_most(u32::MAX).unwrap();
        assert_eq!(key, 1);
    }

    #[tokio::test]
    async fn guardian_takes_two_seats_and_logs() {
        let fixture = fixture(4);
        actor(&fixture, Patient::new(3, 10, false)).run().await;

        assert_eq!(fixture.waiting.available(), 2);
        assert_eq!(fixture.state.snapshot().inside_waiting_room, 2);

        let log = drain_log(&fixture).await;
        assert!(log.iter().any(|r| r.text.starts_with("Guardian present")));
        assert!(log.iter().any(|r| r.text.starts_with("Guardian leaving")));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_releases_nothing_and_skips_arrival() {
        let fixture = fixture(1);
        fixture.waiting.acquire(1).await.unwrap();

        let stop = Stimulus::new();
        let mut blocked = actor(&fixture, Patient::new(4, 50, false));
        blocked.stop = stop.clone();
        let task = tokio::spawn(blocked.run());

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert!(!task.is_finished());

        stop.raise();
        task.await.unwrap();
        assert_eq!(fixture.state.snapshot().total_patients, 0);
        assert!(fixture.reg_chan.try_recv_at_most(u32::MAX).is_none());
    }

    #[tokio::test]
    async fn closed_registration_channel_is_quiet_exit() {
        let fixture = fixture(4);
        fixture.reg_chan.close();
        actor(&fixture, Patient::new(5, 40, false)).run().await;

        // Arrived and still occupying; the drop is downstream's to notice.
        assert_eq!(fixture.state.snapshot().total_patients, 1);
        let log = drain_log(&fixture).await;
        assert!(!log.iter().any(|r| r.text.starts_with("Patient registered")));
    }
}
