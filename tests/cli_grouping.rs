use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn accesstree_bin() -> &'static str {
    env!("CARGO_BIN_EXE_accesstree")
}

fn write_log(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test log");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(accesstree_bin())
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to execute accesstree")
}

const LOG: &str = concat!(
    r#"10.0.0.1 - - [10/May/2018:06:25:24 +0300] "GET /index.html HTTP/1.1" 200 512 "-" "Firefox""#,
    "\n",
    r#"10.0.0.2 - - [09/May/2018:23:59:59 +0300] "POST /wp-login.php HTTP/1.1" 403 12 "http://example.com/" "curl/7.58""#,
    "\n",
    r#"10.0.0.1 - - [09/May/2018:12:00:00 +0300] "GET /index.html HTTP/1.1" 200 512 "-" "Firefox""#,
);

#[test]
fn cli_orders_dates_chronologically() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = write_log(temp_dir.path(), "access.log", LOG);

    let output = run(&["-q", "-g", "date", "-g", "uri", log.to_str().unwrap()]);
    assert!(output.status.success(), "expected success: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);

    let ninth = stdout.find("2018-05-09\n").expect("9 May branch");
    let tenth = stdout.find("2018-05-10\n").expect("10 May branch");
    assert!(ninth < tenth, "dates must sort chronologically: {stdout}");
    assert!(
        stdout.starts_with("2018-05-09\n\t1\t/index.html\t\n\t1\t/wp-login.php\t\n\t... total: 2\n"),
        "unexpected first branch: {stdout}"
    );
    assert!(stdout.ends_with("... total: 3\n\n\n"), "stdout: {stdout}");
}

#[test]
fn cli_composite_columns_with_formats() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = write_log(temp_dir.path(), "access.log", LOG);

    let output = run(&[
        "-q",
        "-g",
        "code,method,uri:.6",
        "-g",
        "ip:10",
        log.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "expected success: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("200\tGET\t/index\t\n\t2\t10.0.0.1  \t\n\t... total: 2\n"),
        "stdout: {stdout}"
    );
    assert!(
        stdout.contains("403\tPOST\t/wp-lo\t\n\t1\t10.0.0.2  \t\n"),
        "stdout: {stdout}"
    );
}

#[test]
fn cli_uses_config_default_group_and_presets() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = write_log(temp_dir.path(), "access.log", LOG);
    let config = write_log(
        temp_dir.path(),
        "accesstree.toml",
        r#"
group = ["code"]

[groups]
agents = ["ua", ["ip"]]
"#,
    );

    let by_default = run(&["-q", "-c", config.to_str().unwrap(), log.to_str().unwrap()]);
    assert!(by_default.status.success(), "expected success: {by_default:?}");
    let stdout = String::from_utf8_lossy(&by_default.stdout);
    assert_eq!(stdout, "2\t200\t\n1\t403\t\n... total: 3\n\n\n");

    let by_preset = run(&[
        "-q",
        "-c",
        config.to_str().unwrap(),
        "-p",
        "agents",
        log.to_str().unwrap(),
    ]);
    assert!(by_preset.status.success(), "expected success: {by_preset:?}");
    let stdout = String::from_utf8_lossy(&by_preset.stdout);
    assert!(
        stdout.starts_with("Firefox\t\n\t2\t10.0.0.1\t\n\t... total: 2\n"),
        "stdout: {stdout}"
    );
}

#[test]
fn cli_short_lines_are_still_counted() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = write_log(
        temp_dir.path(),
        "access.log",
        "10.0.0.9 - - [11/May/2018:00:00:00\n10.0.0.9\n",
    );

    let output = run(&["-q", "-g", "ip", "-g", "code", log.to_str().unwrap()]);
    assert!(output.status.success(), "expected success: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "10.0.0.9\t\n\t2\t\t\n\t... total: 2\n\n\n... total: 2\n\n\n");
}
