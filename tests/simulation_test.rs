use std::process::{Command, Output};

fn run_headless(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_traffic_grid"))
        .args(args)
        .env("RUST_LOG", "warn,traffic_grid=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the simulation runs in headless mode without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_headless(&["--ticks", "300", "--seed", "9"]);

    assert!(
        output.status.success(),
        "Simulation failed to run in headless mode. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("=== SIMULATION COMPLETE ==="),
        "Simulation did not complete properly. stderr: {}",
        stderr
    );
}

/// Test that the run summary is logged and cars were spawned
#[test]
fn test_simulation_statistics_logged() {
    let output = run_headless(&["--ticks", "300", "--spawn-rate", "3", "--seed", "9"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    for key in [
        "Total cars spawned:",
        "Total cars exited:",
        "Active cars:",
        "Average wait time:",
        "Max queue length:",
    ] {
        assert!(stderr.contains(key), "Missing '{}' statistic", key);
    }

    let spawned_line = stderr
        .lines()
        .find(|line| line.contains("Total cars spawned:"))
        .expect("Could not find 'Total cars spawned' line");
    let parts: Vec<&str> = spawned_line.split("Total cars spawned:").collect();
    let spawned_count: u64 = parts
        .get(1)
        .and_then(|s| s.trim().parse().ok())
        .expect("Could not parse spawned count");

    assert!(spawned_count > 0, "No cars were spawned during simulation");
}

/// Test that several episodes are aggregated under a controller
#[test]
fn test_batch_runs_report_aggregate() {
    let output = run_headless(&[
        "--ticks",
        "200",
        "--runs",
        "3",
        "--controller",
        "longest-queue",
        "--seed",
        "4",
    ]);
    assert!(
        output.status.success(),
        "Batch run failed. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Runs: 3"), "stderr: {}", stderr);
    assert!(stderr.contains("longest-queue"), "stderr: {}", stderr);
}

#[test]
fn test_unknown_controller_is_rejected() {
    let output = run_headless(&["--controller", "psychic"]);
    assert!(!output.status.success());
}
