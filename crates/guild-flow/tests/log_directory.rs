//! End-to-end reconstruction over a real log directory.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use guild_config::FlowConfig;
use guild_core::{Severity, Target};
use guild_flow::{FlowError, FlowReconstructor, TraceRequest, kinds};
use pretty_assertions::assert_eq;

fn stamp(now: DateTime<Utc>, minutes_ago: i64) -> String {
    (now - TimeDelta::minutes(minutes_ago)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn write_log(dir: &Path, name: &str, lines: &[String], age: Duration) {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n")).unwrap();
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - age).unwrap();
}

fn full_flow(now: DateTime<Utc>, task: &str) -> Vec<String> {
    vec![
        format!("{} task_id: {task} task received", stamp(now, 50)),
        format!("{} task_id: {task} planning started", stamp(now, 40)),
        format!("{} task_id: {task} implementation started", stamp(now, 30)),
        format!("{} task_id: {task} review requested", stamp(now, 20)),
        format!("{} task_id: {task} task completed", stamp(now, 10)),
    ]
}

fn request(dir: &Path) -> TraceRequest {
    TraceRequest::from_target(
        &FlowConfig::default(),
        &Target::process_logs(Some(dir.to_path_buf()), Some(24), None),
    )
}

#[test]
fn clean_directory_scores_one_hundred() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    write_log(tmp.path(), "agent.log", &full_flow(now, "T-1"), Duration::from_secs(5));

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.metrics.bypass_count, 0);
    assert!((report.metrics.compliance_score - 100.0).abs() < f64::EPSILON);
    assert!(report.violations.is_empty());
}

#[test]
fn removing_a_stage_only_affects_its_execution() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let mut broken = full_flow(now, "T-2");
    broken.remove(3);
    write_log(tmp.path(), "a.log", &full_flow(now, "T-1"), Duration::from_secs(5));
    write_log(tmp.path(), "b.log", &broken, Duration::from_secs(5));

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();

    let completeness = &report.metrics.execution_completeness;
    assert!((completeness["T-1"] - 1.0).abs() < f64::EPSILON);
    assert!((completeness["T-2"] - 0.0).abs() < f64::EPSILON);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].kind(), kinds::INCOMPLETE_FLOW);
    assert_eq!(report.violations[0].metadata()["execution_id"], "T-2");
    assert!((report.metrics.per_stage_compliance_rate["review"] - 0.5).abs() < f64::EPSILON);
}

#[test]
fn files_outside_window_are_skipped_wholesale() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    write_log(tmp.path(), "fresh.log", &full_flow(now, "T-1"), Duration::from_secs(5));
    // Recent lines, but the file itself is stale.
    write_log(
        tmp.path(),
        "stale.log",
        &[format!("{} task_id: T-1 push --no-verify", stamp(now, 5))],
        Duration::from_secs(48 * 3600),
    );
    write_log(
        tmp.path(),
        "ignored.txt",
        &[format!("{} task_id: T-1 bypassed review", stamp(now, 5))],
        Duration::from_secs(5),
    );

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();

    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.metrics.bypass_count, 0);
}

#[test]
fn bypass_in_window_is_critical() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let mut lines = full_flow(now, "T-3");
    lines.push(format!("{} task_id: T-3 force push to main", stamp(now, 5)));
    write_log(tmp.path(), "agent.log", &lines, Duration::from_secs(5));

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();

    assert_eq!(report.metrics.bypass_count, 1);
    assert!((report.metrics.compliance_score - 80.0).abs() < f64::EPSILON);
    let bypass = report
        .violations
        .iter()
        .find(|v| v.kind() == kinds::PROCESS_BYPASS)
        .unwrap();
    assert_eq!(bypass.severity(), Severity::Critical);
    assert_eq!(bypass.metadata()["execution_id"], "T-3");
}

#[test]
fn binary_garbage_is_tolerated() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let mut bytes = full_flow(now, "T-4").join("\n").into_bytes();
    bytes.extend_from_slice(&[0xff, 0xfe, 0x00, b'\n']);
    fs::write(tmp.path().join("agent.log"), bytes).unwrap();

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();
    assert_eq!(report.metrics.total_executions, 1);
}

#[test]
fn missing_directory_is_an_error_for_the_caller() {
    let tmp = tempfile::tempdir().unwrap();
    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let err = flow.reconstruct(&request(&tmp.path().join("absent"))).unwrap_err();
    assert!(matches!(err, FlowError::LogDirMissing(_)));
}

#[test]
fn untimestamped_bypass_follows_its_file_window() {
    let tmp = tempfile::tempdir().unwrap();
    let now = Utc::now();
    let mut fresh = full_flow(now, "T-5");
    fresh.push("task_id: T-5 git push --no-verify".to_string());
    write_log(tmp.path(), "fresh.log", &fresh, Duration::from_secs(5));
    write_log(
        tmp.path(),
        "stale.log",
        &["task_id: T-5 bypassed review gate".to_string()],
        Duration::from_secs(48 * 3600),
    );

    let flow = FlowReconstructor::new(FlowConfig::default()).unwrap();
    let report = flow.reconstruct_at(&request(tmp.path()), now).unwrap();

    assert_eq!(report.metrics.bypass_count, 1);
    assert_eq!(report.bypasses[0].execution_id, "T-5");
    assert!(report.bypasses[0].source_file.ends_with("fresh.log"));
}
