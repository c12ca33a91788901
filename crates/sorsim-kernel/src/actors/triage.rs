//! Triage: assign severity, send the lucky few home, route the rest.

use std::sync::Arc;

use sorsim_protocol::{
    specialist_key, EventRecord, Specialty, TriageColor, KEY_NORMAL,
};

use crate::actors::release_seats;
use crate::channel::KeyedChannel;
use crate::clock::SimClock;
use crate::journal::Journal;
use crate::rng::SimRng;
use crate::signal::Stimulus;
use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

/// Percentage of patients sent home straight from triage.
const SENT_HOME_PERCENT: u32 = 5;

pub struct TriageActor {
    pub triage_chan: KeyedChannel<EventRecord>,
    pub spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT],
    pub waiting: Arc<WaitingRoom>,
    pub state: Arc<SharedState>,
    pub clock: Arc<SimClock>,
    pub journal: Journal,
    pub stop: Stimulus,
    pub rng: SimRng,
    /// Reference-scale service time per patient; zero is allowed.
    pub service_ms: u64,
}

impl TriageActor {
    pub async fn run(mut self) {
        self.journal.log("Triage started");

        loop {
            tokio::select! {
                _ = self.stop.wait() => break,
                received = self.triage_chan.recv_at_most(KEY_NORMAL) => match received {
                    Err(_closed) => break,
                    Ok((_key, record)) => self.handle(record).await,
                },
            }
        }

        self.journal.log("Triage shutting down");
    }

    async fn handle(&mut self, mut record: EventRecord) {
        self.clock.sleep_scaled(self.service_ms).await;

        let persons = record.patient.persons_count;
        if self.rng.percent_roll() < SENT_HOME_PERCENT {
            self.state.lock().triage_sent_home += 1;
            // Triage decided this patient leaves: the seats go back here.
            release_seats(&self.state, &self.waiting, persons);
            self.journal.log(format!(
                "Patient sent home from triage id={}",
                record.patient.id
            ));
            return;
        }

        let color = TriageColor::from_roll(self.rng.percent_roll());
        {
            let mut state = self.state.lock();
            match color {
                TriageColor::Red => state.triage_red += 1,
                TriageColor::Yellow => state.triage_yellow += 1,
                TriageColor::Green => state.triage_green += 1,
            }
        }
        let specialty = Specialty::ALL[self.rng.gen_range(0..Specialty::COUNT)];
        record.patient.triage_color = Some(color);
        record.patient.specialty = Some(specialty);

        let id = record.patient.id;
        let key = specialist_key(specialty, color);
        let target = &self.spec_chans[specialty.index()];
        match target.send_backoff(key, record).await {
            Ok(()) => {
                self.journal.log(format!(
                    "Routed patient id={} to specialist={} color={}",
                    id, specialty, color
                ));
            }
            Err(_closed) => {
                release_seats(&self.state, &self.waiting, persons);
                self.journal.log(format!(
                    "Dropped patient id={} due to specialist send failure; released waiting room seats",
                    id
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{LogHub, MetricsContext};
    use sorsim_config::SimConfig;
    use sorsim_protocol::{ActorId, Patient, Role};
    use std::time::Duration;

    struct Fixture {
        triage_chan: KeyedChannel<EventRecord>,
        spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT],
        waiting: Arc<WaitingRoom>,
        state: Arc<SharedState>,
        clock: Arc<SimClock>,
        hub: LogHub,
    }

    fn fixture() -> Fixture {
        let state = SharedState::new(8);
        let waiting = WaitingRoom::new(8);
        let triage_chan = KeyedChannel::bounded(64);
        let spec_chans: [KeyedChannel<EventRecord>; Specialty::COUNT] =
            std::array::from_fn(|_| KeyedChannel::bounded(64));
        let metrics = MetricsContext {
            state: Arc::clone(&state),
            waiting: Arc::clone(&waiting),
            reg_chan: KeyedChannel::bounded(64),
            triage_chan: triage_chan.clone(),
            spec_chans: spec_chans.clone(),
        };
        let clock = Arc::new(SimClock::start(&SimConfig::default()));
        let hub = LogHub::new(KeyedChannel::bounded(256), Arc::clone(&clock), metrics);
        Fixture {
            triage_chan,
            spec_chans,
            waiting,
            state,
            clock,
            hub,
        }
    }

    fn actor(fixture: &Fixture, stop: Stimulus, seed: u64) -> TriageActor {
        TriageActor {
            triage_chan: fixture.triage_chan.clone(),
            spec_chans: fixture.spec_chans.clone(),
            waiting: Arc::clone(&fixture.waiting),
            state: Arc::clone(&fixture.state),
            clock: Arc::clone(&fixture.clock),
            journal: fixture.hub.journal(ActorId::from_u64(3), Role::Triage),
            stop,
            rng: SimRng::new(seed),
            service_ms: 0,
        }
    }

    async fn run_batch(fixture: &Fixture, seed: u64, count: u64) {
        for id in 1..=count {
            fixture
                .triage_chan
                .try_send(KEY_NORMAL, EventRecord::new(Patient::new(id, 40, false)))
                .unwrap();
        }
        let stop = Stimulus::new();
        let task = tokio::spawn(actor(fixture, stop.clone(), seed).run());
        for _ in 0..200 {
            if fixture.triage_chan.depth() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        stop.raise();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn every_patient_is_counted_once() {
        let fixture = fixture();
        run_batch(&fixture, 12345, 100).await;

        let state = fixture.state.snapshot();
        let routed: usize = fixture.spec_chans.iter().map(KeyedChannel::depth).sum();
        assert_eq!(
            state.triage_red + state.triage_yellow + state.triage_green + state.triage_sent_home,
            100
        );
        assert_eq!(routed as u64 + state.triage_sent_home, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn sent_home_releases_seats() {
        let fixture = fixture();
        // Occupy seats as if the batch had been admitted.
        fixture.waiting.acquire(8).await.unwrap();
        fixture.state.lock().inside_waiting_room = 8;

        run_batch(&fixture, 12345, 8).await;

        let state = fixture.state.snapshot();
        // Only the sent-home patients got their seats back.
        assert_eq!(
            fixture.waiting.available() as u64,
            state.triage_sent_home
        );
        assert_eq!(
            u64::from(state.inside_waiting_room) + state.triage_sent_home,
            8
        );
    }

    #[tokio::test(start_paused = true)]
    async fn routed_records_carry_color_and_specialty() {
        let fixture = fixture();
        run_batch(&fixture, 7, 20).await;

        for (idx, chan) in fixture.spec_chans.iter().enumerate() {
            while let Some((key, record)) = chan.try_recv_at_most(u32::MAX) {
                let color = record.patient.triage_color.unwrap();
                let specialty = record.patient.specialty.unwrap();
                assert_eq!(specialty.index(), idx);
                assert_eq!(key, specialist_key(specialty, color));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn closed_specialist_channel_drops_and_releases() {
        let fixture = fixture();
        fixture.waiting.acquire(4).await.unwrap();
        fixture.state.lock().inside_waiting_room = 4;
        for chan in &fixture.spec_chans {
            chan.close();
        }

        run_batch(&fixture, 12345, 4).await;

        let state = fixture.state.snapshot();
        // Sent-home or dropped, every seat must come back.
        assert_eq!(fixture.waiting.available(), 8);
        assert_eq!(state.inside_waiting_room, 0);
    }
}
