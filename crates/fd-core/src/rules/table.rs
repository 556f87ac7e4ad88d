use std::collections::BTreeMap;

use crate::model::{ControlType, Rule, RuleId, RuleKind, RuleState};

/// Result of applying one control-plane update to a [`RuleTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleUpdate {
    Stored,
    Removed { existed: bool },
    /// A CONTROL rule; never stored, handed to the command handler instead.
    Control(ControlType),
}

// ---------------------------------------------------------------------------
// RuleTable
// ---------------------------------------------------------------------------

/// Partition-local replica of the broadcast rule set.
///
/// Ordinary rules live in an id-ordered map. The rule that sizes the
/// eviction horizon is tracked separately in `widest` and only ever replaced
/// by a strictly wider ACTIVE rule; deletes and `clear` leave it in place.
#[derive(Debug, Default)]
pub struct RuleTable {
    rules: BTreeMap<RuleId, Rule>,
    widest: Option<Rule>,
}

impl RuleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: RuleId) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn put(&mut self, rule: Rule) {
        self.rules.insert(rule.id, rule);
    }

    /// Remove by id. Returns `true` if an entry existed.
    pub fn remove(&mut self, id: RuleId) -> bool {
        self.rules.remove(&id).is_some()
    }

    /// Entries in ascending id order.
    pub fn entries(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().map(|(id, rule)| (*id, rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Drop every ordinary rule. The widest-window reference survives.
    pub fn clear(&mut self) {
        self.rules.clear();
    }

    pub fn widest_window_rule(&self) -> Option<&Rule> {
        self.widest.as_ref()
    }

    /// Apply a broadcast rule in arrival order.
    pub fn apply_update(&mut self, rule: Rule) -> RuleUpdate {
        self.track_widest(&rule);
        match (rule.state, &rule.kind) {
            (RuleState::Delete, _) => RuleUpdate::Removed {
                existed: self.remove(rule.id),
            },
            (_, RuleKind::Control(ct)) => RuleUpdate::Control(*ct),
            _ => {
                self.put(rule);
                RuleUpdate::Stored
            }
        }
    }

    fn track_widest(&mut self, rule: &Rule) {
        if !rule.is_active() {
            return;
        }
        let Some(candidate) = rule.window_millis() else {
            return;
        };
        let wider = match self.widest.as_ref().and_then(Rule::window_millis) {
            Some(current) => candidate > current,
            None => true,
        };
        if wider {
            self.widest = Some(rule.clone());
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
