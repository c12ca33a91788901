//! The simulation's actors, one serial control loop per role.
//!
//! Every actor is spawned as a tokio task and communicates only through the
//! keyed channels, the waiting room and the shared-state region. Errors
//! never unwind out of an actor: each loop logs its own failures and
//! returns.

mod generator;
mod logger;
mod patient;
mod registration;
mod specialist;
mod triage;

pub use generator::{GeneratorActor, MAX_PATIENT_TASKS};
pub use logger::LoggerActor;
pub use patient::PatientActor;
pub use registration::RegistrationActor;
pub use specialist::SpecialistActor;
pub use triage::TriageActor;

use crate::state::SharedState;
use crate::waiting_room::WaitingRoom;

/// The decider's release: post the seats back and drop the occupancy
/// counter, floored at zero. Called exactly once per patient, by whichever
/// actor decides they leave the waiting room.
pub(crate) fn release_seats(state: &SharedState, waiting: &WaitingRoom, persons: u32) {
    state.leave_waiting_room(persons);
    waiting.release(persons);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn release_restores_capacity_and_counter() {
        let state = SharedState::new(4);
        let waiting = WaitingRoom::new(4);
        waiting.acquire(2).await.unwrap();
        state.lock().inside_waiting_room = 2;

        release_seats(&state, &waiting, 2);
        assert_eq!(waiting.available(), 4);
        assert_eq!(state.lock().inside_waiting_room, 0);
    }
}
