use std::path::Path;

use fd_config::FraudConfig;
use fd_runtime::lifecycle::FraudEngine;
use serde_json::Value;

const CONFIG: &str = r#"
[engine]
partitions = 2
channel_capacity = 16
timer_resolution = "1s"
out_of_orderness = "0ms"

[input]
path = "input.jsonl"

[output]
alerts = ["file://out/alerts.jsonl"]
current_rules = ["file://out/current-rules.jsonl"]
latency = ["file://out/latency.jsonl"]

[metrics]
enabled = true
report_interval = "1s"
"#;

fn envelope(key: &str, id: u64, t: i64, amount: &str) -> String {
    format!(
        r#"{{"envelope":{{"groupingKey":"{key}","ruleId":1,"transaction":{{"transactionId":{id},"eventTime":{t},"payeeId":7,"beneficiaryId":9,"paymentAmount":"{amount}","paymentType":"CRD","ingestionTimestamp":{t}}}}}}}"#
    )
}

fn input() -> String {
    [
        "# replay fixture".to_string(),
        r#"{"rule":{"ruleId":1,"ruleState":"ACTIVE","groupingKeyNames":["payeeId"],"aggregateFieldName":"paymentAmount","aggregatorFunctionType":"SUM","limitOperatorType":">","limit":"20.00","windowMinutes":1}}"#.to_string(),
        envelope("A", 1, 1_000, "15.00"),
        envelope("B", 2, 1_500, "15.00"),
        "not json".to_string(),
        envelope("A", 3, 2_000, "10.00"),
        r#"{"rule":{"ruleId":0,"ruleState":"CONTROL","controlType":"EXPORT_RULES_CURRENT"}}"#.to_string(),
    ]
    .join("\n")
}

fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

#[tokio::test]
async fn replay_writes_alerts_exports_and_latency() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("input.jsonl"), input()).unwrap();
    let config: FraudConfig = CONFIG.parse().unwrap();

    let engine = FraudEngine::start(config, dir.path()).await.unwrap();
    let metrics = engine.metrics().unwrap();
    let done = engine.input_done_token();
    engine.wait().await.unwrap();
    assert!(done.is_cancelled());

    let alerts = read_lines(&dir.path().join("out/alerts.jsonl"));
    assert_eq!(alerts.len(), 1, "{alerts:?}");
    assert_eq!(alerts[0]["ruleId"], 1);
    assert_eq!(alerts[0]["groupingKey"], "A");
    assert_eq!(alerts[0]["transaction"]["transactionId"], 3);

    // every partition answers the export
    let exported = read_lines(&dir.path().join("out/current-rules.jsonl"));
    assert_eq!(exported.len(), 2);
    assert!(exported.iter().all(|r| r["ruleId"] == 1));

    let latency = read_lines(&dir.path().join("out/latency.jsonl"));
    let measured: u64 = latency.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(measured, 3);

    let snap = metrics.snapshot();
    assert_eq!(snap.input_malformed, 1);
    assert_eq!(snap.routed_envelopes, 3);
    assert_eq!(snap.routed_rules, 2);
    assert_eq!(snap.alerts_written, 1);
    assert_eq!(snap.envelopes_evaluated, 3);
}

#[tokio::test]
async fn missing_input_file_fails_wait() {
    let dir = tempfile::tempdir().unwrap();
    let config: FraudConfig = CONFIG.replace("[metrics]\nenabled = true", "[metrics]\nenabled = false")
        .parse()
        .unwrap();

    let engine = FraudEngine::start(config, dir.path()).await.unwrap();
    assert!(engine.metrics().is_none());
    assert!(engine.wait().await.is_err());
}

#[tokio::test]
async fn shutdown_before_input_still_stops_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("input.jsonl"), input()).unwrap();
    let config: FraudConfig = CONFIG.parse().unwrap();

    let engine = FraudEngine::start(config, dir.path()).await.unwrap();
    engine.shutdown();
    engine.wait().await.unwrap();
    // the alerts sink is opened at bootstrap even if nothing was evaluated
    assert!(dir.path().join("out/alerts.jsonl").exists());
}
