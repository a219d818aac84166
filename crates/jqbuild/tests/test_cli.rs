mod common;

use common::Fixture;
use std::fs;
use std::process::{Command, Output};

/// The jqbuild binary inside the fixture directory, configured through the
/// environment only.
fn jqbuild_command(fixture: &Fixture, args: &[&str]) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_jqbuild"));
    command
        .args(args)
        .current_dir(fixture.temp.path())
        .env("JQBUILD_SOURCE_ROOT", &fixture.config.source_root)
        .env("JQBUILD_MINIFIER", "");
    command
}

fn run_jqbuild(fixture: &Fixture, args: &[&str]) -> Output {
    jqbuild_command(fixture, args)
        .env("RUST_LOG", "off")
        .output()
        .expect("Failed to execute jqbuild")
}

#[test]
fn test_help_lists_build_options() {
    let fixture = Fixture::new();
    let output = run_jqbuild(&fixture, &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in [
        "--exclude",
        "--include",
        "--filename",
        "--dir",
        "--slim",
        "--amd [<NAME>]",
        "--set-version <VERSION>",
        "--all",
        "-v, --verbose...",
    ] {
        assert!(stdout.contains(flag), "missing {flag} in:\n{stdout}");
    }
    assert!(stdout.contains("Increase verbosity (can be repeated: -v, -vv, -vvv)"));
}

#[test]
fn test_cli_builds_with_exclusions() {
    let fixture = Fixture::new();
    let output = run_jqbuild(
        &fixture,
        &["-e", "ajax,css", "--set-version", "9.9.9", "-d", "out", "-f", "custom.js"],
    );
    assert!(
        output.status.success(),
        "{}",
        String::from_utf8_lossy(&output.stderr)
    );

    let bundle = fs::read_to_string(fixture.temp.path().join("out/custom.js"))
        .expect("bundle written");
    assert!(bundle.contains("v9.9.9 -ajax,-ajax/xhr,"));
    assert!(!bundle.contains("jQuery.fn.css"));
}

#[test]
fn test_cli_rejects_minimum_module() {
    let fixture = Fixture::new();
    let output = run_jqbuild(&fixture, &["--exclude", "core", "--set-version", "1.0.0"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Module \"core\" is a minimum requirement."), "{stderr}");
}

#[test]
fn test_all_conflicts_with_single_build_flags() {
    let fixture = Fixture::new();
    let output = run_jqbuild(&fixture, &["--all", "--slim"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));
}

#[test]
fn test_completion_notice_shown_without_verbose() {
    let fixture = Fixture::new();
    let output = jqbuild_command(&fixture, &["--set-version", "9.9.9"])
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute jqbuild");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("jquery.js v9.9.9 created."), "{stderr}");
}
