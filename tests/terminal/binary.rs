use std::{
    fs,
    io::Write,
    process::{Command, Stdio},
};

use uuid::Uuid;

#[test]
fn given_invalid_utf8_line_when_piped_to_terminal_then_session_continues() {
    let work_dir = std::env::temp_dir().join(format!("scp-terminal-bin-{}", Uuid::now_v7()));
    fs::create_dir_all(&work_dir).expect("temp work dir should be created");

    let mut child = Command::new(env!("CARGO_BIN_EXE_scp-terminal"))
        .current_dir(&work_dir)
        .env_remove("SCP_TERMINAL_CONFIG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("terminal binary should start");
    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(b"status\n\xff\xfe\nabout\n")
        .expect("input should be written");

    let output = child
        .wait_with_output()
        .expect("terminal should exit at end of input");
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(
        output.status.success(),
        "terminal should exit cleanly: {:?}, stderr: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(stdout.contains("Authorization: UNAUTHENTICATED"));
    assert!(stdout.contains("Command not recognized: \u{fffd}\u{fffd}"));
    assert!(
        stdout.contains("Secure. Contain. Protect."),
        "about should run after the malformed line: {stdout}"
    );

    let _ = fs::remove_dir_all(&work_dir);
}
