use crate::model::ControlType;
use crate::rules::RuleTable;
use crate::window::{EvictReport, WindowStore};

use super::output::{EngineOutput, OutputCollector};

/// What a control command did on this partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Exported { rules: usize },
    StateCleared(EvictReport),
    RulesDeleted { rules: usize },
}

pub(super) fn handle_control(
    command: ControlType,
    rules: &mut RuleTable,
    store: &mut WindowStore,
    out: &mut impl OutputCollector,
) -> ControlOutcome {
    match command {
        ControlType::ExportRulesCurrent => {
            let mut exported = 0;
            for (_, rule) in rules.entries() {
                out.collect(EngineOutput::CurrentRule(rule.clone()));
                exported += 1;
            }
            ControlOutcome::Exported { rules: exported }
        }
        ControlType::ClearStateAll => ControlOutcome::StateCleared(store.clear_all()),
        ControlType::DeleteRulesAll => {
            let deleted = rules.len();
            rules.clear();
            ControlOutcome::RulesDeleted { rules: deleted }
        }
    }
}
