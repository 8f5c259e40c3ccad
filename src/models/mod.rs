pub mod rule;
pub mod rule_change;
