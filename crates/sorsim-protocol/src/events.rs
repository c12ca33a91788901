//! Keyed event records and the priority-key layout.
//!
//! Every record on a data channel carries an integer key; receivers use the
//! "lowest key ≤ K" predicate to implement priority. The layout:
//!
//! | Record         | Key                                        |
//! |----------------|--------------------------------------------|
//! | `Arrival`      | VIP = 1, Normal = 2                        |
//! | `Registered`   | VIP = 1, Normal = 2                        |
//! | `ToSpecialist` | `specialty_index * 10 + color_priority`    |
//!
//! Color priorities are Red = 1, Yellow = 2, Green = 3, so within one
//! specialty channel red patients always preempt yellow, and yellow green.

use crate::patient::{Patient, Specialty, TriageColor};

/// Key for VIP arrivals and registrations. Lower key = dequeued first.
pub const KEY_VIP: u32 = 1;
/// Key for regular arrivals and registrations.
pub const KEY_NORMAL: u32 = 2;

/// Key of an `Arrival` record on the registration channel.
pub const fn arrival_key(is_vip: bool) -> u32 {
    if is_vip {
        KEY_VIP
    } else {
        KEY_NORMAL
    }
}

/// Key of a `Registered` record on the triage channel.
pub const fn registered_key(is_vip: bool) -> u32 {
    arrival_key(is_vip)
}

/// Key of a `ToSpecialist` record on `SpecChan[t]`.
pub const fn specialist_key(specialty: Specialty, color: TriageColor) -> u32 {
    specialty.index() as u32 * 10 + color.priority()
}

/// The receive bound a specialist of type `t` passes to the channel: every
/// key it can legally see is ≤ this value.
pub const fn specialist_max_key(specialty: Specialty) -> u32 {
    specialty.index() as u32 * 10 + 3
}

/// Payload flowing through the data channels.
///
/// The patient record travels unchanged from arrival to disposition; `extra`
/// is a short free-form note set by the sender ("guardian"/"solo" at
/// arrival).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub patient: Patient,
    pub extra: String,
}

impl EventRecord {
    pub fn new(patient: Patient) -> EventRecord {
        let extra = if patient.has_guardian {
            "guardian"
        } else {
            "solo"
        };
        EventRecord {
            patient,
            extra: extra.to_string(),
        }
    }
}
