use std::process::{Command, Output};

fn isomnt(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_isomnt"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run isomnt")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn no_arguments_prints_usage_and_fails() {
    let output = isomnt(&[]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.starts_with("Not enough arguments"));
    assert!(text.contains("Usage:"));
}

#[test]
fn mount_with_one_value_is_not_enough() {
    let output = isomnt(&["-m", "/srv/debian.iso"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("Not enough arguments"));
}

#[test]
fn unmount_with_two_values_is_too_many() {
    let output = isomnt(&["-u", "/mnt/a", "/mnt/b"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).starts_with("Too many arguments"));
}

#[test]
fn unknown_flag_is_an_invalid_option() {
    let output = isomnt(&["-x", "/mnt/a"]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(text.starts_with("Invalid option"));
    assert!(text.contains("-u <TARGET>"));
}

#[test]
fn help_succeeds() {
    let output = isomnt(&["--help"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("-m <ISO> <TARGET>"));
}
