use assert_cmd::Command;

fn runner() -> Command {
    let mut cmd = Command::cargo_bin("guia-e2e").unwrap();
    for var in [
        "GUIA_BASE_URL",
        "GUIA_ID",
        "GUIA_NAME",
        "GUIA_REMOTE_WS",
        "GUIA_HEADLESS",
        "GUIA_CONNECT_ATTEMPTS",
        "GUIA_CHROME",
        "GUIA_EVIDENCE_DIR",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn prints_help() {
    runner().arg("--help").assert().success();
}

#[test]
fn rejects_a_zero_guide_id_before_opening_a_session() {
    runner().args(["--guide-id", "0"]).assert().failure();
}
