use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::rule_change::{
    RuleChange as DomainRuleChange, RuleChangeAction, RuleRevision,
};
use crate::models::rule::{parse_json_column, to_json_column};

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::pricing_rule_changes)]
pub struct RuleChange {
    pub id: i32,
    pub hub_id: i32,
    pub category: String,
    pub action: String,
    pub changed_by: String,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::pricing_rule_changes)]
pub struct NewRuleChange<'a> {
    pub hub_id: i32,
    pub category: &'a str,
    pub action: &'a str,
    pub changed_by: &'a str,
    pub previous_value: Option<String>,
    pub new_value: Option<String>,
}

impl<'a> NewRuleChange<'a> {
    /// Build an audit row for a mutation of `category`.
    pub fn new(
        hub_id: i32,
        category: &'a str,
        action: RuleChangeAction,
        changed_by: &'a str,
        previous_value: Option<RuleRevision>,
        new_value: Option<RuleRevision>,
    ) -> Self {
        Self {
            hub_id,
            category,
            action: action.as_str(),
            changed_by,
            previous_value: to_json_column(&previous_value),
            new_value: to_json_column(&new_value),
        }
    }
}

impl From<RuleChange> for DomainRuleChange {
    fn from(value: RuleChange) -> Self {
        let action = RuleChangeAction::parse(&value.action).unwrap_or_else(|| {
            log::warn!(
                "Unknown audit action {} on change {}, treating as update",
                value.action,
                value.id
            );
            RuleChangeAction::Updated
        });

        Self {
            id: value.id,
            hub_id: value.hub_id,
            action,
            changed_by: value.changed_by,
            previous_value: parse_json_column(
                value.previous_value.as_deref(),
                "previous_value",
                &value.category,
            ),
            new_value: parse_json_column(
                value.new_value.as_deref(),
                "new_value",
                &value.category,
            ),
            created_at: value.created_at,
            category: value.category,
        }
    }
}
