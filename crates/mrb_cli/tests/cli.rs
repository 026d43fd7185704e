use std::io::Write;

use assert_cmd::Command;
use tempfile::NamedTempFile;

fn script(src: &str) -> NamedTempFile {
    let mut f = tempfile::Builder::new().suffix(".rb").tempfile().unwrap();
    f.write_all(src.as_bytes()).unwrap();
    f
}

fn mrb() -> Command {
    let mut cmd = Command::cargo_bin("mrb").unwrap();
    cmd.env_remove("MRB_LOG");
    cmd
}

fn stderr_of(out: &std::process::Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn usage_without_args() {
    let out = mrb().output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("Usage: mrb"));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let out = mrb().arg("frobnicate").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("Unknown command: frobnicate"));
}

#[test]
fn run_requires_a_file() {
    let out = mrb().arg("run").output().unwrap();
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr_of(&out).contains("Missing <file>"));
}

#[test]
fn run_prints_the_inspected_result() {
    let f = script("[1 + 2, 'three']\n");
    mrb()
        .arg("run")
        .arg(f.path())
        .assert()
        .success()
        .stdout("[3, \"three\"]\n");
}

#[test]
fn run_passes_arguments_through_argv() {
    let f = script("puts \"hi #{ARGV[1]}\"\nnil\n");
    mrb()
        .args(["run"])
        .arg(f.path())
        .args(["Oliver", "Sandra"])
        .assert()
        .success()
        .stdout("hi Sandra\n");
}

#[test]
fn uncaught_exception_exits_one() {
    let f = script("raise ArgumentError, 'bad'\n");
    let out = mrb().arg("run").arg(f.path()).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains("ArgumentError: bad"), "{}", stderr_of(&out));
}

#[test]
fn syntax_error_exits_one() {
    let f = script(".fail here!\n");
    let out = mrb().arg("run").arg(f.path()).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr_of(&out).contains(":1: syntax error, unexpected '.'"), "{}", stderr_of(&out));
}

#[test]
fn missing_file_exits_one() {
    let out = mrb().args(["run", "/nonexistent/script.rb"]).output().unwrap();
    assert_eq!(out.status.code(), Some(1));
}

#[test]
fn check_only_parses() {
    let f = script("puts 'never printed'\n");
    mrb().arg("check").arg(f.path()).assert().success().stdout("");
    let bad = script("def broken(\n");
    mrb().arg("check").arg(bad.path()).assert().code(1);
}
