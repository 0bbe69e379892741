use predicates::prelude::*;

#[test]
fn test_help_includes_required_options() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("filemonitor");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("--replay"))
        .stdout(predicate::str::contains("--event"))
        .stdout(predicate::str::contains("--interval"))
        .stdout(predicate::str::contains("--max-depth"))
        .stdout(predicate::str::contains("--no-codesign"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--quiet"))
        .stdout(predicate::str::contains("--verbose"))
        .stdout(predicate::str::contains("--version"))
        .stdout(predicate::str::contains("--help"));
}

#[test]
fn test_help_describes_event_option() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("filemonitor");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Event kind"))
        .stdout(predicate::str::contains("repeatable"));
}

#[test]
fn test_unknown_event_is_rejected() {
    let mut cmd = assert_cmd::cargo_bin_cmd!("filemonitor");
    cmd.args(["--event", "mount"]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("mount"));
}
