//! End-of-run summary rendering.
//!
//! Deterministic layout so runs can be diffed; written best-effort by the
//! director during shutdown.

use sorsim_protocol::ActorId;

use crate::state::StateInner;

pub fn render(state: &StateInner, simulated_seconds: u64) -> String {
    let mut out = String::new();
    out.push_str("SOR simulation summary\n");
    out.push_str("======================\n");
    out.push_str(&format!("totalPatients={}\n", state.total_patients));
    out.push_str(&format!("triageRed={}\n", state.triage_red));
    out.push_str(&format!("triageYellow={}\n", state.triage_yellow));
    out.push_str(&format!("triageGreen={}\n", state.triage_green));
    out.push_str(&format!("triageSentHome={}\n", state.triage_sent_home));
    out.push_str(&format!("outcomeHome={}\n", state.outcome_home));
    out.push_str(&format!("outcomeWard={}\n", state.outcome_ward));
    out.push_str(&format!("outcomeOther={}\n", state.outcome_other));

    let specialists: Vec<ActorId> = state.specialist_ids.iter().flatten().copied().collect();
    out.push_str(&format!("specialists={}\n", join_ids(&specialists)));
    out.push_str(&format!("reg2History={}\n", join_ids(&state.reg2_history)));
    out.push_str(&format!(
        "simulatedTime={}\n",
        format_dhms(simulated_seconds)
    ));
    out
}

fn join_ids(ids: &[ActorId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Render seconds as `<d>d <h>h <m>m <s>s`.
fn format_dhms(total_seconds: u64) -> String {
    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3_600;
    let minutes = (total_seconds % 3_600) / 60;
    let seconds = total_seconds % 60;
    format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dhms_formatting() {
        assert_eq!(format_dhms(0), "0d 0h 0m 0s");
        assert_eq!(format_dhms(8_000), "0d 2h 13m 20s");
        assert_eq!(format_dhms(90_061), "1d 1h 1m 1s");
    }

    #[test]
    fn summary_layout_is_deterministic() {
        let mut state = StateInner {
            total_patients: 12,
            triage_red: 1,
            triage_yellow: 4,
            triage_green: 6,
            triage_sent_home: 1,
            outcome_home: 9,
            outcome_ward: 2,
            outcome_other: 0,
            ..StateInner::default()
        };
        state.specialist_ids[0] = Some(ActorId::from_u64(5));
        state.specialist_ids[1] = Some(ActorId::from_u64(6));
        state.reg2_history.push(ActorId::from_u64(9));

        let text = render(&state, 8_000);
        assert!(text.starts_with("SOR simulation summary\n"));
        assert!(text.contains("totalPatients=12\n"));
        assert!(text.contains("specialists=5,6\n"));
        assert!(text.contains("reg2History=9\n"));
        assert!(text.contains("simulatedTime=0d 2h 13m 20s\n"));
    }

    #[test]
    fn empty_history_renders_empty_field() {
        let text = render(&StateInner::default(), 0);
        assert!(text.contains("reg2History=\n"));
    }
}
