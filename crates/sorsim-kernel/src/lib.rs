//! `sorsim-kernel` — the simulation kernel.
//!
//! An emergency department modeled as cooperating actors on tokio tasks:
//!
//! ```text
//! PatientGenerator → Patient → RegChan → Registration(1,2)
//!                  → TriageChan → Triage → SpecChan[t] → Specialist[t]
//! ```
//!
//! Every actor also writes the log channel, which a dedicated logger actor
//! drains into the log file. The [`Director`] owns all resources, provisions
//! the second registration desk under load, stimulates specialist leaves,
//! watches the waiting-room capacity invariant and orchestrates cooperative
//! shutdown.
//!
//! | Module           | Contents                                          |
//! |------------------|---------------------------------------------------|
//! | [`channel`]      | Bounded keyed channel, "lowest key ≤ K" receive   |
//! | [`waiting_room`] | Seat semaphore W                                   |
//! | [`state`]        | Shared-state region and its lock                   |
//! | [`clock`]        | Wall-clock ↔ simulated-minute mapping              |
//! | [`signal`]       | Stop / temporary-leave stimuli                     |
//! | [`rng`]          | Seeded, per-actor-derivable randomness             |
//! | [`journal`]      | Event-log plumbing with metrics snapshots          |
//! | [`actors`]       | One module per role                                |
//! | [`director`]     | Bootstrap, provisioning, monitor, shutdown         |
//! | [`summary`]      | End-of-run summary rendering                       |

pub mod actors;
pub mod channel;
pub mod clock;
pub mod director;
pub mod error;
pub mod ids;
pub mod journal;
pub mod rng;
pub mod signal;
pub mod state;
pub mod summary;
pub mod waiting_room;

pub use channel::{KeyedChannel, RecvError, SendError, TrySendError, DEFAULT_CHANNEL_CAPACITY};
pub use clock::SimClock;
pub use director::{
    provisioning_action, DeskAction, Director, RunReport, ShutdownHandle, ShutdownReason,
};
pub use error::{KernelError, Result};
pub use ids::IdAllocator;
pub use journal::{Journal, LogHub, MetricsContext, LOG_KEY};
pub use rng::SimRng;
pub use signal::Stimulus;
pub use state::{SharedState, StateInner};
pub use waiting_room::WaitingRoom;
