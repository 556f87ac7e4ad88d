use crate::alert::Alert;
use crate::model::Rule;

/// Everything the evaluator emits, tagged by stream.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineOutput {
    Alert(Alert),
    /// Processing wall-clock minus ingestion timestamp, in milliseconds.
    Latency(i64),
    /// One rule of an EXPORT_RULES_CURRENT response.
    CurrentRule(Rule),
}

/// Receiver for evaluator output.
pub trait OutputCollector {
    fn collect(&mut self, output: EngineOutput);
}

impl OutputCollector for Vec<EngineOutput> {
    fn collect(&mut self, output: EngineOutput) {
        self.push(output);
    }
}
