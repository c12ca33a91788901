//! Patient model: who walks through the door and what happens to them.

use std::fmt;

/// Severity assigned by triage. Lower priority number = treated sooner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriageColor {
    Red,
    Yellow,
    Green,
}

impl TriageColor {
    /// Priority component of the specialist-channel key (Red before Yellow
    /// before Green).
    pub const fn priority(self) -> u32 {
        match self {
            TriageColor::Red => 1,
            TriageColor::Yellow => 2,
            TriageColor::Green => 3,
        }
    }

    /// Draw a color from a uniform roll in `0..100`.
    ///
    /// Distribution is fixed: Red 10%, Yellow 35%, Green 55%.
    pub const fn from_roll(roll: u32) -> TriageColor {
        if roll < 10 {
            TriageColor::Red
        } else if roll < 45 {
            TriageColor::Yellow
        } else {
            TriageColor::Green
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            TriageColor::Red => "red",
            TriageColor::Yellow => "yellow",
            TriageColor::Green => "green",
        }
    }
}

impl fmt::Display for TriageColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The six specialist consultation rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specialty {
    Cardiology,
    Neurology,
    Ophthalmology,
    Laryngology,
    Surgery,
    Paediatrics,
}

impl Specialty {
    pub const COUNT: usize = 6;

    pub const ALL: [Specialty; Specialty::COUNT] = [
        Specialty::Cardiology,
        Specialty::Neurology,
        Specialty::Ophthalmology,
        Specialty::Laryngology,
        Specialty::Surgery,
        Specialty::Paediatrics,
    ];

    pub const fn index(self) -> usize {
        match self {
            Specialty::Cardiology => 0,
            Specialty::Neurology => 1,
            Specialty::Ophthalmology => 2,
            Specialty::Laryngology => 3,
            Specialty::Surgery => 4,
            Specialty::Paediatrics => 5,
        }
    }

    pub fn from_index(idx: usize) -> Option<Specialty> {
        Specialty::ALL.get(idx).copied()
    }

    pub const fn label(self) -> &'static str {
        match self {
            Specialty::Cardiology => "cardiology",
            Specialty::Neurology => "neurology",
            Specialty::Ophthalmology => "ophthalmology",
            Specialty::Laryngology => "laryngology",
            Specialty::Surgery => "surgery",
            Specialty::Paediatrics => "paediatrics",
        }
    }
}

impl fmt::Display for Specialty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where a patient ends up after the specialist exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Home,
    Ward,
    OtherFacility,
}

impl Outcome {
    /// Draw an outcome from a uniform roll in `0..1000`.
    ///
    /// Thresholds are fixed: home below 850, ward below 995, otherwise a
    /// transfer to another facility.
    pub const fn from_roll(roll: u32) -> Outcome {
        if roll < 850 {
            Outcome::Home
        } else if roll < 995 {
            Outcome::Ward
        } else {
            Outcome::OtherFacility
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Outcome::Home => "home",
            Outcome::Ward => "ward",
            Outcome::OtherFacility => "otherFacility",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A synthetic patient, carried as an event payload through the pipeline.
///
/// The record is never stored centrally; whichever actor currently holds it
/// owns it. `triage_color` and `specialty` stay `None` until triage assigns
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub id: u64,
    pub age: u8,
    pub is_vip: bool,
    pub has_guardian: bool,
    /// Seats this patient occupies in the waiting room: 2 with a guardian,
    /// 1 otherwise.
    pub persons_count: u32,
    pub triage_color: Option<TriageColor>,
    pub specialty: Option<Specialty>,
}

impl Patient {
    /// Build a fresh patient from the generator's draws. Guardian presence
    /// follows from age; under-18s always bring one.
    pub fn new(id: u64, age: u8, is_vip: bool) -> Patient {
        let has_guardian = age < 18;
        Patient {
            id,
            age,
            is_vip,
            has_guardian,
            persons_count: if has_guardian { 2 } else { 1 },
            triage_color: None,
            specialty: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guardian_follows_age() {
        let minor = Patient::new(1, 17, false);
        assert!(minor.has_guardian);
        assert_eq!(minor.persons_count, 2);

        let adult = Patient::new(2, 18, false);
        assert!(!adult.has_guardian);
        assert_eq!(adult.persons_count, 1);
    }

    #[test]
    fn color_distribution_cutoffs() {
        assert_eq!(TriageColor::from_roll(0), TriageColor::Red);
        assert_eq!(TriageColor::from_roll(9), TriageColor::Red);
        assert_eq!(TriageColor::from_roll(10), TriageColor::Yellow);
        assert_eq!(TriageColor::from_roll(44), TriageColor::Yellow);
        assert_eq!(TriageColor::from_roll(45), TriageColor::Green);
        assert_eq!(TriageColor::from_roll(99), TriageColor::Green);
    }

    #[test]
    fn outcome_thresholds() {
        assert_eq!(Outcome::from_roll(0), Outcome::Home);
        assert_eq!(Outcome::from_roll(849), Outcome::Home);
        assert_eq!(Outcome::from_roll(850), Outcome::Ward);
        assert_eq!(Outcome::from_roll(994), Outcome::Ward);
        assert_eq!(Outcome::from_roll(995), Outcome::OtherFacility);
        assert_eq!(Outcome::from_roll(999), Outcome::OtherFacility);
    }

    #[test]
    fn color_priority_ordering() {
        assert!(TriageColor::Red.priority() < TriageColor::Yellow.priority());
        assert!(TriageColor::Yellow.priority() < TriageColor::Green.priority());
    }

    #[test]
    fn specialty_index_roundtrip() {
        for spec in Specialty::ALL {
            assert_eq!(Specialty::from_index(spec.index()), Some(spec));
        }
        assert_eq!(Specialty::from_index(6), None);
    }
}
