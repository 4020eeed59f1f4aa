use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn accesstree_bin() -> &'static str {
    env!("CARGO_BIN_EXE_accesstree")
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("failed to write test file");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(accesstree_bin())
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to execute accesstree")
}

fn line(ip: &str, uri: &str, ua: &str) -> String {
    format!(r#"{ip} - - [10/May/2018:06:25:24 +0300] "GET {uri} HTTP/1.1" 200 68 "-" "{ua}""#)
}

fn sample_log(dir: &Path) -> PathBuf {
    let lines = [
        line("127.0.0.1", "/wp-cron.php?doing", "WordPress"),
        line("5.5.5.5", "/robots.txt", "Googlebot/2.1"),
        line("6.6.6.6", "/wp-login.php", "Mozilla"),
        line("7.7.7.7", "/about", "Mozilla"),
    ];
    write_file(dir, "access.log", &(lines.join("\n") + "\n"))
}

#[test]
fn cli_exclude_flag_drops_and_counts_lines() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = sample_log(temp_dir.path());

    let output = run(&["-g", "uri", "-x", "uri=^/ROBOTS", log.to_str().unwrap()]);
    assert!(output.status.success(), "expected success: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let counts = format!("{:10} : (+{:10}, -{:10}) lines", 4, 3, 1);
    assert!(stdout.contains(&counts), "stdout missing counts {counts}: {stdout}");
    assert!(!stdout.contains("1\t/robots.txt"), "robots must be dropped: {stdout}");
    assert!(stdout.contains("... total: 3\n"), "stdout: {stdout}");
}

#[test]
fn cli_exclude_wins_over_include() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = sample_log(temp_dir.path());

    let output = run(&[
        "-q",
        "-g",
        "uri",
        "-i",
        "uri=^/wp-",
        "-x",
        "ip=^127\\.",
        log.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "expected success: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "1\t/wp-login.php\t\n... total: 1\n\n\n");
}

#[test]
fn cli_selects_filter_sets_from_config() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = sample_log(temp_dir.path());
    let config = write_file(
        temp_dir.path(),
        "accesstree.toml",
        r#"
[filters]
exclude = [{ ip = '^127\.0\.0\.1$' }]

[sets]
bots = [{ ua = "bot|scan" }]
wordpress = { uri = "^/wp-", ua = "mozilla" }
"#,
    );

    let hide_bots = run(&[
        "-q",
        "-g",
        "uri",
        "-c",
        config.to_str().unwrap(),
        "-s",
        "bots",
        log.to_str().unwrap(),
    ]);
    assert!(hide_bots.status.success(), "expected success: {hide_bots:?}");
    assert_eq!(
        String::from_utf8_lossy(&hide_bots.stdout),
        "1\t/about\t\n1\t/wp-login.php\t\n... total: 2\n\n\n"
    );

    let only_wordpress = run(&[
        "-q",
        "-g",
        "uri",
        "-c",
        config.to_str().unwrap(),
        "-s",
        "!2",
        log.to_str().unwrap(),
    ]);
    assert!(
        only_wordpress.status.success(),
        "expected success: {only_wordpress:?}"
    );
    assert_eq!(
        String::from_utf8_lossy(&only_wordpress.stdout),
        "1\t/wp-login.php\t\n... total: 1\n\n\n"
    );
}

#[test]
fn cli_rejects_invalid_filters() {
    let temp_dir = TempDir::new().expect("failed to create temp dir");
    let log = sample_log(temp_dir.path());

    let bad_regex = run(&["-x", "uri=(", log.to_str().unwrap()]);
    assert!(!bad_regex.status.success(), "invalid regex must fail");
    assert!(
        String::from_utf8_lossy(&bad_regex.stderr).contains("invalid pattern for field 'uri'"),
        "stderr: {}",
        String::from_utf8_lossy(&bad_regex.stderr)
    );

    let unknown_set = run(&["-s", "nope", log.to_str().unwrap()]);
    assert!(!unknown_set.status.success(), "unknown set must fail");
    assert!(
        String::from_utf8_lossy(&unknown_set.stderr).contains("invalid selection 'nope'"),
        "stderr: {}",
        String::from_utf8_lossy(&unknown_set.stderr)
    );
}
