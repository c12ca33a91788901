//! `sorsim-protocol` — shared vocabulary for the ED simulation.
//!
//! This crate defines everything two actors need to agree on before they can
//! talk to each other:
//!
//! - the patient model ([`Patient`], [`TriageColor`], [`Specialty`],
//!   [`Outcome`]),
//! - keyed event records and their priority-key layout ([`events`]),
//! - actor identities and role tags ([`ActorId`], [`Role`]),
//! - the log-record grammar written by the logger and read back by the
//!   terminal renderer ([`record`]).
//!
//! It deliberately has no runtime dependencies beyond `thiserror`; the
//! kernel and the visualizer both build on it.

pub mod events;
pub mod patient;
pub mod record;
pub mod roles;

pub use events::{
    arrival_key, registered_key, specialist_key, specialist_max_key, EventRecord,
    KEY_NORMAL, KEY_VIP,
};
pub use patient::{Outcome, Patient, Specialty, TriageColor};
pub use record::{MetricsBlock, ParseRecordError, SimLogRecord, LOG_END_SENTINEL};
pub use roles::{ActorId, Role};
