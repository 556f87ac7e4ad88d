mod aggregator;
mod control;
mod evaluator;
mod output;

pub use aggregator::Aggregator;
pub use control::ControlOutcome;
pub use evaluator::{EvaluatorStats, RuleEvaluator};
pub use output::{EngineOutput, OutputCollector};
