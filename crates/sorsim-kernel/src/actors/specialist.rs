//! A specialist consultation room: severity-ordered intake, exam,
//! disposition.

use std::sync::Arc;

use sorsim_protocol::{specialist_max_key, EventRecord, Outcome, Specialty};

use crate::actors::release_seats;
use crate::channel::KeyedChannel;
use crate::clock::SimClock;
use crate::journal::Journal;
use crate::rng::SimRng;
use crate::signal::Stimulus;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

pub struct SpecialistActor {
    pub specialty: Specialty,
    pub chan: KeyedChannel<EventRecord>,
    pub waiting: Arc<WaitingRoom>,
    pub state: Arc<SharedState>,
    pub clock: Arc<SimClock>,
    pub journal: Journal,
    pub stop: Stimulus,
    /// Raised by the director; the specialist walks away for a random
    /// interval before taking the next patient.
    pub leave: Stimulus,
    pub rng: SimRng,
    /// Reference-scale exam duration bounds.
    pub exam_ms: (u64, u64),
    /// Reference-scale temporary-leave duration bounds.
    pub leave_ms: (u64, u64),
}

impl SpecialistActor {
    pub async fn run(mut self) {
        self.journal
            .log(format!("Specialist {} started", self.specialty));

        let max_key = specialist_max_key(self.specialty);
        loop {
            // A pending leave is honored before the next patient is taken.
            if self.leave.take() {
                self.take_leave().await;
            }

            tokio::select! {
                _ = self.stop.wait() => break,
                // Wakes an idle specialist so a leave request does not sit
                // unnoticed until the next patient arrives.
                _ = self.leave.wait() => continue,
                received = self.chan.recv_at_most(max_key) => match received {
                    Err(_closed) => break,
                    Ok((_key, record)) => self.handle(record).await,
                },
            }
        }

        self.journal
            .log(format!("Specialist {} shutting down", self.specialty));
    }

    async fn take_leave(&mut self) {
        let (min, max) = self.leave_ms;
        let pause = self.rng.gen_range(min..=max);
        self.clock.sleep_scaled(pause).await;
        self.journal.log("Temporary leave finished, resuming");
    }

    async fn handle(&mut self, record: EventRecord) {
        let patient = &record.patient;
        let color = patient
            .triage_color
            .map(|c| c.label())
            .unwrap_or("unassigned");
        self.journal.log(format!(
            "Received patient id={} color={} persons={}",
            patient.id, color, patient.persons_count
        ));

        let (min, max) = self.exam_ms;
        let exam = self.rng.gen_range(min..=max);
        self.clock.sleep_scaled(exam).await;

        let outcome = Outcome::from_roll(self.rng.gen_range(0..1000));
        {
            let mut state = self.state.lock();
            match outcome {
                Outcome::Home => state.outcome_home += 1,
                Outcome::Ward => state.outcome_ward += 1,
                Outcome::OtherFacility => state.outcome_other += 1,
            }
        }

        // Disposition decided: this patient's seats finally go back.
        release_seats(&self.state, &self.waiting, patient.persons_count);
        self.journal.log(format!(
            "Handled patient id={} outcome={} persons={} color={} specialist={}",
            patient.id, outcome, patient.persons_count, color, self.specialty
        ));
    }
}
