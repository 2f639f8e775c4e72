use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("gamefuck").unwrap();
    cmd.timeout(Duration::from_secs(5)).env("NO_COLOR", "1");
    cmd
}

fn source_file(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

#[test]
fn runs_program_from_file() {
    let tf = source_file("++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .success()
        .stdout("Hello")
        .stderr(predicate::str::is_empty());
}

#[test]
fn comments_and_whitespace_are_ignored() {
    let tf = source_file("{ print H }\n++++++++ ++++++++ ++++++++ ++++++++\n++++++++ ++++++++ ++++++++ ++++++++\n++++++++ .\n");
    cargo_bin().arg(tf.path()).assert().success().stdout("H");
}

#[test]
fn embedded_input_feeds_comma() {
    let tf = source_file(",.!A");
    cargo_bin()
        .arg(tf.path())
        .write_stdin("Z")
        .assert()
        .success()
        .stdout("A");
}

#[test]
fn stdin_is_read_without_embedded_input() {
    let tf = source_file(",.,.");
    cargo_bin()
        .arg(tf.path())
        .write_stdin("ok")
        .assert()
        .success()
        .stdout("ok");
}

#[test]
fn empty_stdin_reads_a_null_byte() {
    let tf = source_file(",.");
    cargo_bin()
        .arg(tf.path())
        .write_stdin("")
        .assert()
        .success()
        .stdout("\0");
}

#[test]
fn missing_argument_is_fatal() {
    cargo_bin()
        .assert()
        .code(1)
        .stderr(predicate::str::contains("expected source file argument"));
}

#[test]
fn unreadable_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    cargo_bin()
        .arg(dir.path().join("nope.gf"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("failed to open"));
}

#[test]
fn unmatched_close_bracket_aborts_before_running() {
    let tf = source_file("+.]");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unmatched ]"));
}

#[test]
fn unclosed_open_bracket_aborts_before_running() {
    let tf = source_file("+.[");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unmatched ["));
}

#[test]
fn unmatched_close_brace_aborts() {
    let tf = source_file("+.}");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("unmatched }"));
}

#[test]
fn unclosed_brace_warns_and_runs_the_rest() {
    let tf = source_file("+++. { this comment never ends .");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .success()
        .stdout("\u{3}")
        .stderr(predicate::str::contains("Warning").and(predicate::str::contains("unmatched {")));
}

#[test]
fn moving_left_of_origin_is_fatal() {
    let tf = source_file("+.<.");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .code(1)
        .stdout("\u{1}")
        .stderr(predicate::str::contains("past origin").and(predicate::str::contains("at instruction 2")));
}

#[test]
fn help_goes_to_stderr() {
    cargo_bin()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Usage"));
}
