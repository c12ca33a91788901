//! Actor identities and role tags.

use std::fmt;

/// Unique identity of a running actor, used for log attribution and for
/// targeting stop / temporary-leave stimuli. The kernel hands these out
/// sequentially at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
    pub const fn from_u64(raw: u64) -> ActorId {
        ActorId(raw)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role tag carried in every log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Director,
    PatientGen,
    Patient,
    Reg1,
    Reg2,
    Triage,
    Specialist,
    Logger,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Role::Director => "director",
            Role::PatientGen => "patient_gen",
            Role::Patient => "patient",
            Role::Reg1 => "reg1",
            Role::Reg2 => "reg2",
            Role::Triage => "triage",
            Role::Specialist => "specialist",
            Role::Logger => "logger",
        }
    }

    pub fn from_label(label: &str) -> Option<Role> {
        match label {
            "director" => Some(Role::Director),
            "patient_gen" => Some(Role::PatientGen),
            "patient" => Some(Role::Patient),
            "reg1" => Some(Role::Reg1),
            "reg2" => Some(Role::Reg2),
            "triage" => Some(Role::Triage),
            "specialist" => Some(Role::Specialist),
            "logger" => Some(Role::Logger),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
