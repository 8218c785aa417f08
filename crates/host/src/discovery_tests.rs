use super::*;

#[test]
fn normalize_instance_name_lowercases_and_replaces_spaces() {
    assert_eq!(normalize_instance_name("My Workstation"), "my_workstation");
    assert_eq!(normalize_instance_name("already-lower"), "already-lower");
    assert_eq!(normalize_instance_name("Multiple   Spaces"), "multiple___spaces");
}
