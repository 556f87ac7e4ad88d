use std::path::Path;
use std::sync::Arc;

use fd_config::InputSource;
use fd_core::error::{CoreReason, CoreResult};
use fd_core::model::{Envelope, Rule};
use orion_error::prelude::*;
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::error::{RuntimeReason, RuntimeResult};
use crate::metrics::RuntimeMetrics;
use crate::router::Router;

// ---------------------------------------------------------------------------
// InputRecord
// ---------------------------------------------------------------------------

/// One line of replay input: `{"rule": ...}` or `{"envelope": ...}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputRecord {
    Rule(Rule),
    Envelope(Envelope),
}

/// Decode one input line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Option<CoreResult<InputRecord>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(line).map_err(|e| {
        StructError::from(CoreReason::DataFormat).with_detail(e.to_string())
    }))
}

// ---------------------------------------------------------------------------
// Replay
// ---------------------------------------------------------------------------

/// Counts from one pass over replay input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub rules: usize,
    pub envelopes: usize,
    /// `(line number, error)` for each line that failed to decode.
    pub malformed: Vec<(usize, String)>,
}

impl ReplaySummary {
    fn record(&mut self, line_no: usize, parsed: CoreResult<InputRecord>) -> Option<InputRecord> {
        match parsed {
            Ok(record) => {
                match record {
                    InputRecord::Rule(_) => self.rules += 1,
                    InputRecord::Envelope(_) => self.envelopes += 1,
                }
                Some(record)
            }
            Err(e) => {
                self.malformed.push((line_no, e.to_string()));
                None
            }
        }
    }
}

async fn open_input(source: &InputSource) -> RuntimeResult<Box<dyn AsyncBufRead + Unpin + Send>> {
    match source {
        InputSource::Stdin => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
        InputSource::File(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|e| {
                StructError::from(RuntimeReason::Bootstrap)
                    .with_detail(format!("open input {}: {e}", path.display()))
            })?;
            Ok(Box::new(BufReader::new(file)))
        }
    }
}

/// Read replay input and feed it through `router` until end of input or
/// cancellation, then flush the router.
///
/// Malformed lines are logged and skipped.
pub async fn run_replay(
    source: InputSource,
    mut router: Router,
    metrics: Option<Arc<RuntimeMetrics>>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let reader = open_input(&source)
        .await
        .map_err(|e| anyhow::anyhow!("{e}"))?;
    let mut lines = reader.lines();
    let mut summary = ReplaySummary::default();
    let mut line_no = 0usize;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                fd_info!(pipe, line = line_no, "input cancelled");
                break;
            }
            next = lines.next_line() => next?,
        };
        let Some(line) = next else { break };
        line_no += 1;
        let Some(parsed) = parse_line(&line) else { continue };
        if let Some(m) = &metrics {
            m.inc_input_line();
        }
        match summary.record(line_no, parsed) {
            Some(record) => router.dispatch(record).await,
            None => {
                if let Some(m) = &metrics {
                    m.inc_input_malformed();
                }
                if let Some((_, error)) = summary.malformed.last() {
                    fd_warn!(pipe, line = line_no, error = %error, "skipping malformed input line");
                }
            }
        }
    }

    fd_info!(
        pipe,
        rules = summary.rules,
        envelopes = summary.envelopes,
        malformed = summary.malformed.len(),
        "input finished"
    );
    router.finish().await;
    Ok(())
}

/// Decode every line of a replay file without evaluating anything.
pub fn scan_file(path: &Path) -> anyhow::Result<ReplaySummary> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read input {}: {e}", path.display()))?;
    let mut summary = ReplaySummary::default();
    for (idx, line) in text.lines().enumerate() {
        if let Some(parsed) = parse_line(line) {
            summary.record(idx + 1, parsed);
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RULE: &str = r#"{"rule":{"ruleId":1,"ruleState":"ACTIVE","aggregateFieldName":"COUNT",
        "limitOperatorType":">=","limit":3,"windowMinutes":1}}"#;
    const ENVELOPE: &str = r#"{"envelope":{"groupingKey":"A","ruleId":1,"transaction":{
        "transactionId":1,"eventTime":1000,"payeeId":1,"beneficiaryId":2,
        "paymentAmount":"5.00","paymentType":"CSH","ingestionTimestamp":1000}}}"#;

    #[test]
    fn parses_rule_and_envelope_lines() {
        let rule = parse_line(&RULE.replace('\n', "")).unwrap().unwrap();
        assert!(matches!(rule, InputRecord::Rule(r) if r.id == 1));

        let env = parse_line(&ENVELOPE.replace('\n', "")).unwrap().unwrap();
        match env {
            InputRecord::Envelope(e) => {
                assert_eq!(e.grouping_key, "A");
                assert_eq!(e.transaction.payment_amount.minor_units(), 500);
            }
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert!(parse_line("").is_none());
        assert!(parse_line("   ").is_none());
        assert!(parse_line("# rules below").is_none());
    }

    #[test]
    fn malformed_lines_are_errors() {
        assert!(parse_line("{not json").unwrap().is_err());
        assert!(parse_line(r#"{"other":{}}"#).unwrap().is_err());
        // a rule that fails validation is rejected at decode time
        assert!(parse_line(r#"{"rule":{"ruleId":2,"ruleState":"CONTROL"}}"#)
            .unwrap()
            .is_err());
    }

    #[test]
    fn scan_counts_and_reports_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        let body = format!(
            "# header\n{}\n\n{}\nbroken\n",
            RULE.replace('\n', ""),
            ENVELOPE.replace('\n', "")
        );
        std::fs::write(&path, body).unwrap();

        let summary = scan_file(&path).unwrap();
        assert_eq!(summary.rules, 1);
        assert_eq!(summary.envelopes, 1);
        assert_eq!(summary.malformed.len(), 1);
        assert_eq!(summary.malformed[0].0, 5);
    }
}
