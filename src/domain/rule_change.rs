use std::collections::HashMap;

use chrono::NaiveDateTime;
use pushkind_common::pagination::Pagination;
use serde::{Deserialize, Serialize};

use crate::domain::rule::{
    BudgetThreshold, NewPricingRule, PriceTier, PricingRule, TimeMultipliers, UpdatePricingRule,
};

/// Kind of administrative mutation recorded in the audit trail.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RuleChangeAction {
    /// A rule was created.
    Created,
    /// A rule was updated.
    Updated,
    /// A rule was deleted.
    Deleted,
}

impl RuleChangeAction {
    /// Stable string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Parse the stored string form back into an action.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "updated" => Some(Self::Updated),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Snapshot of a rule's editable fields as they stood before or after a
/// mutation. Persisted as JSON inside the audit row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleRevision {
    pub base_credits: f64,
    pub price_tiers: Option<Vec<PriceTier>>,
    pub priority_multipliers: Option<HashMap<String, f64>>,
    pub budget_multipliers: Option<Vec<BudgetThreshold>>,
    pub time_multipliers: Option<TimeMultipliers>,
    pub is_active: bool,
}

impl From<&PricingRule> for RuleRevision {
    fn from(rule: &PricingRule) -> Self {
        Self {
            base_credits: rule.base_credits,
            price_tiers: rule.price_tiers.clone(),
            priority_multipliers: rule.priority_multipliers.clone(),
            budget_multipliers: rule.budget_multipliers.clone(),
            time_multipliers: rule.time_multipliers,
            is_active: rule.is_active,
        }
    }
}

impl From<&NewPricingRule> for RuleRevision {
    fn from(rule: &NewPricingRule) -> Self {
        Self {
            base_credits: rule.base_credits,
            price_tiers: rule.price_tiers.clone(),
            priority_multipliers: rule.priority_multipliers.clone(),
            budget_multipliers: rule.budget_multipliers.clone(),
            time_multipliers: rule.time_multipliers,
            is_active: rule.is_active,
        }
    }
}

impl From<&UpdatePricingRule> for RuleRevision {
    fn from(updates: &UpdatePricingRule) -> Self {
        Self {
            base_credits: updates.base_credits,
            price_tiers: updates.price_tiers.clone(),
            priority_multipliers: updates.priority_multipliers.clone(),
            budget_multipliers: updates.budget_multipliers.clone(),
            time_multipliers: updates.time_multipliers,
            is_active: updates.is_active,
        }
    }
}

/// One immutable audit entry paired with a rule mutation. Entries are
/// append-only and are never read by the cost calculator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleChange {
    /// Unique identifier of the audit entry.
    pub id: i32,
    /// Owning hub identifier.
    pub hub_id: i32,
    /// Category of the affected rule.
    pub category: String,
    /// What kind of mutation happened.
    pub action: RuleChangeAction,
    /// Email of the administrator who performed the mutation.
    pub changed_by: String,
    /// Rule fields before the mutation, absent for creations.
    pub previous_value: Option<RuleRevision>,
    /// Rule fields after the mutation, absent for deletions.
    pub new_value: Option<RuleRevision>,
    /// Timestamp for when the mutation happened.
    pub created_at: NaiveDateTime,
}

/// Query definition used to list audit entries for a hub.
#[derive(Debug, Clone)]
pub struct RuleChangeListQuery {
    /// Owning hub identifier.
    pub hub_id: i32,
    /// Optional filter on the affected category.
    pub category: Option<String>,
    /// Optional pagination options applied to the query.
    pub pagination: Option<Pagination>,
}

impl RuleChangeListQuery {
    /// Construct a query that targets all audit entries belonging to `hub_id`.
    pub fn new(hub_id: i32) -> Self {
        Self {
            hub_id,
            category: None,
            pagination: None,
        }
    }

    /// Filter the results to entries affecting `category`.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Apply pagination to the query with the given page number and page size.
    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}
