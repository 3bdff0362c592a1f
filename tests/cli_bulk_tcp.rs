use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "bulktcp-rs-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_bulk_tcp(out_dir: &Path, sim_stop_ms: u64, extra: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_bulk_tcp"))
        .arg("--out-dir")
        .arg(out_dir)
        .arg("--sim-stop-ms")
        .arg(sim_stop_ms.to_string())
        .args(extra)
        .env("RUST_LOG", "warn")
        .output()
        .expect("run bulk_tcp");
    assert!(
        output.status.success(),
        "bulk_tcp failed: stdout={}, stderr={}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn parse_cwnd_file(path: &Path) -> Vec<(f64, u64)> {
    let text = fs::read_to_string(path).expect("read cwnd trace");
    text.lines()
        .map(|line| {
            let mut cols = line.split_whitespace();
            let t: f64 = cols.next().expect("time").parse().expect("time is f64");
            let cwnd: u64 = cols.next().expect("cwnd").parse().expect("cwnd is u64");
            assert!(cols.next().is_none(), "extra columns in {line:?}");
            (t, cwnd)
        })
        .collect()
}

#[test]
fn default_run_writes_cwnd_trace_and_drop_reports() {
    let dir = unique_temp_dir("default");
    let output = run_bulk_tcp(&dir, 1500, &[]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(stdout.lines().next(), Some("use TcpNewReno"));
    assert!(stdout.contains("done @ "));

    let samples = parse_cwnd_file(&dir.join("TcpNewReno-bulk.cwnd"));
    assert!(!samples.is_empty(), "no cwnd samples");
    assert!(samples.iter().all(|&(t, _)| t >= 0.5));
    assert!(samples.iter().all(|&(_, cwnd)| cwnd >= 1));
    assert!(samples.windows(2).all(|w| w[0].0 <= w[1].0));

    // two senders overflow the 10-packet bottleneck queue
    let drops: Vec<&str> = stdout
        .lines()
        .filter(|l| l.contains("dropped a packet"))
        .collect();
    assert!(!drops.is_empty());
    for line in drops {
        assert!(line.contains(" bytes) with seq_no:"), "{line}");
    }
}

#[test]
fn tcp_type_selects_the_variant_and_names_the_trace_file() {
    let dir = unique_temp_dir("tahoe");
    let output = run_bulk_tcp(&dir, 1500, &["--tcpType", "TcpTahoe"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().next(), Some("use TcpTahoe"));
    assert!(dir.join("TcpTahoe-bulk.cwnd").exists());
    assert!(!dir.join("TcpNewReno-bulk.cwnd").exists());
}

#[test]
fn unknown_tcp_type_falls_back_to_newreno() {
    let dir = unique_temp_dir("fallback");
    let output = run_bulk_tcp(&dir, 1500, &["--tcpType", "TcpVegas"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid TCP version, use TCP NewReno"));
    assert_eq!(stdout.lines().next(), Some("use TcpNewReno"));
    assert!(dir.join("TcpNewReno-bulk.cwnd").exists());
}

#[test]
fn trace_json_contains_cwnd_and_drop_records() {
    let dir = unique_temp_dir("json");
    let json_path = dir.join("trace.json");
    run_bulk_tcp(
        &dir,
        1500,
        &["--trace-json", json_path.to_str().expect("utf8 path")],
    );

    let text = fs::read_to_string(&json_path).expect("read trace json");
    let v: Value = serde_json::from_str(&text).expect("parse trace json");
    let records = v.as_array().expect("array of records");
    assert!(!records.is_empty());

    let mut last_t = 0;
    for rec in records {
        let t = rec["t_ns"].as_u64().expect("t_ns");
        assert!(t >= last_t, "records out of time order");
        last_t = t;
        match rec["kind"].as_str().expect("kind") {
            "cwnd_sample" => assert_eq!(rec["conn_id"], 1),
            "drop" => assert!(rec["pkt_id"].is_u64()),
            other => panic!("unexpected kind {other}"),
        }
    }
    assert!(records.iter().any(|r| r["kind"] == "drop"));
    assert!(records.iter().any(|r| r["kind"] == "cwnd_sample"));
}

#[test]
fn scenario_file_overrides_defaults() {
    let dir = unique_temp_dir("scenario");
    let scenario = dir.join("scenario.json");
    fs::write(
        &scenario,
        r#"{ "topology": { "senders": 1 }, "data_bytes": 20000, "tcp": { "variant": "TcpReno" } }"#,
    )
    .expect("write scenario");

    let output = run_bulk_tcp(
        &dir,
        5000,
        &["--scenario", scenario.to_str().expect("utf8 path")],
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().next(), Some("use TcpReno"));
    assert!(stdout.contains("tcp1: acked_bytes=20000, finished=true"));
    assert!(!stdout.contains("tcp2:"));
}

#[test]
fn invalid_scenario_exits_with_error() {
    let dir = unique_temp_dir("bad");
    let output = Command::new(env!("CARGO_BIN_EXE_bulk_tcp"))
        .arg("--out-dir")
        .arg(&dir)
        .args(["--senders", "0"])
        .env("RUST_LOG", "off")
        .output()
        .expect("run bulk_tcp");
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("at least one sender"), "{stderr}");
}
