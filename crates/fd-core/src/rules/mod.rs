mod table;

pub use table::{RuleTable, RuleUpdate};
