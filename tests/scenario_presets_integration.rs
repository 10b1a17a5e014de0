//! Runs the binary against presets and scenario files and checks the
//! printed report.

use std::process::Command;

fn run_args(args: &[&str]) -> String {
    let output = Command::new(env!("CARGO_BIN_EXE_fleet-vpp"))
        .args(args)
        .output()
        .expect("fleet-vpp process should run");

    assert!(
        output.status.success(),
        "run failed for {args:?}: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout).expect("stdout should be valid UTF-8")
}

fn parse_balance(stdout: &str) -> f64 {
    let line = stdout
        .lines()
        .find(|line| line.trim_start().starts_with("Account balance:"))
        .unwrap_or_else(|| panic!("missing balance line in output: {stdout}"));

    let raw = line
        .split_once(':')
        .map(|(_, right)| right.trim())
        .unwrap_or_else(|| panic!("invalid balance format for line `{line}`"));

    let numeric = raw.strip_suffix("EUR").unwrap_or(raw).trim();
    numeric
        .parse::<f64>()
        .unwrap_or_else(|_| panic!("failed parsing `{numeric}` from line `{line}`"))
}

#[test]
fn regular_preset_reports_zero_balance() {
    let stdout = run_args(&["--preset", "regular", "--seed", "7"]);
    assert_eq!(parse_balance(&stdout), 0.0);
    assert!(stdout.contains("--- Run Report ---"));
}

#[test]
fn bidding_presets_accumulate_savings() {
    let balancing = parse_balance(&run_args(&["--preset", "balancing", "--seed", "7"]));
    let intraday = parse_balance(&run_args(&["--preset", "intraday", "--seed", "7"]));

    // With the default demo prices well below the tariff, both strategies
    // should find favorable slots.
    assert!(balancing > 0.0, "balancing balance {balancing}");
    assert!(intraday > 0.0, "intraday balance {intraday}");
}

#[test]
fn same_seed_reproduces_the_same_report() {
    let a = run_args(&["--preset", "integrated", "--seed", "11"]);
    let b = run_args(&["--preset", "integrated", "--seed", "11"]);
    assert_eq!(a, b);
}

#[test]
fn scenario_file_runs_end_to_end() {
    let stdout = run_args(&["--scenario", "scenarios/integrated.toml"]);
    assert!(stdout.contains("Committed energy"));
    assert!(parse_balance(&stdout) >= 0.0);
}
