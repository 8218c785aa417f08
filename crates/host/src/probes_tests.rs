use super::*;

#[test]
fn media_action_parses_closed_enumeration() {
    assert_eq!(MediaAction::try_from(0), Ok(MediaAction::SetVolume));
    assert_eq!(MediaAction::try_from(14), Ok(MediaAction::GetInfo));
    assert!(MediaAction::try_from(99).is_err());
}

#[test]
fn power_action_parses_closed_enumeration() {
    assert_eq!(PowerAction::try_from(2), Ok(PowerAction::Lock));
    assert!(PowerAction::try_from(7).is_err());
}

#[test]
fn null_probes_report_safe_defaults_for_host_facts() {
    let probe = NullProbes;
    assert_eq!(probe.os_label(), "unknown");
    assert_eq!(probe.cpu_cores(), (0, 0));
    assert!(!probe.is_elevated());
}

#[test]
fn null_probes_fail_closed_for_control_actions() {
    let probe = NullProbes;
    assert!(probe.execute(PowerAction::Shutdown).is_err());
    assert!(probe.invoke(MediaAction::PlayPause, 0).is_err());
}
