use std::path::Path;

use fd_config::{FraudConfig, SinkUri};
use fd_core::alert::{FanOutSink, FileSink, RecordSink, StdoutSink};
use orion_error::prelude::*;
use orion_error::ErrorOweBase;

use crate::error::{RuntimeReason, RuntimeResult};

use super::types::BootstrapData;

/// Resolve the input source and open every configured sink.
pub(super) fn load_resources(config: &FraudConfig, base_dir: &Path) -> RuntimeResult<BootstrapData> {
    let input = config.input.resolve(base_dir);

    let alerts = config.output.parsed_alerts().owe(RuntimeReason::Bootstrap)?;
    let current_rules = config
        .output
        .parsed_current_rules()
        .owe(RuntimeReason::Bootstrap)?;
    let latency = config.output.parsed_latency().owe(RuntimeReason::Bootstrap)?;
    fd_debug!(
        conf,
        alert_sinks = alerts.len(),
        current_rule_sinks = current_rules.len(),
        latency_sinks = latency.len(),
        "sink destinations parsed"
    );

    Ok(BootstrapData {
        input,
        alert_sink: build_sink(alerts, base_dir)?,
        current_rule_sink: build_sink(current_rules, base_dir)?,
        latency_sink: build_sink(latency, base_dir)?,
    })
}

/// Open each destination and fan them out behind one sink. An empty list
/// yields a sink that discards everything.
fn build_sink(uris: Vec<SinkUri>, base_dir: &Path) -> RuntimeResult<Box<dyn RecordSink>> {
    let mut sinks: Vec<Box<dyn RecordSink>> = Vec::with_capacity(uris.len());
    for uri in uris {
        match uri.resolve(base_dir) {
            SinkUri::File { path } => {
                let sink = FileSink::open(&path).map_err(|e| {
                    StructError::from(RuntimeReason::Bootstrap)
                        .with_detail(format!("open sink {}: {e}", path.display()))
                })?;
                sinks.push(Box::new(sink));
            }
            SinkUri::Stdout => sinks.push(Box::new(StdoutSink)),
        }
    }
    Ok(Box::new(FanOutSink::new(sinks)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_relative_file_sinks_under_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config: FraudConfig = r#"
            [input]
            path = "input.jsonl"

            [output]
            alerts = ["file://out/alerts.jsonl", "stdout"]
        "#
        .parse()
        .unwrap();

        let data = load_resources(&config, dir.path()).unwrap();
        assert_eq!(
            data.input,
            fd_config::InputSource::File(dir.path().join("input.jsonl"))
        );
        data.alert_sink.send(r#"{"ruleId":1}"#).unwrap();
        // no destinations configured: records are discarded
        data.latency_sink.send("{}").unwrap();

        let text = std::fs::read_to_string(dir.path().join("out/alerts.jsonl")).unwrap();
        assert_eq!(text, "{\"ruleId\":1}\n");
    }

    #[test]
    fn unopenable_sink_fails_bootstrap() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blocker"), "").unwrap();
        let config: FraudConfig = r#"
            [input]
            path = "-"

            [output]
            alerts = ["file://blocker/alerts.jsonl"]
        "#
        .parse()
        .unwrap();
        assert!(load_resources(&config, dir.path()).is_err());
    }
}
