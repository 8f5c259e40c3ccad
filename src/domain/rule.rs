use std::collections::HashMap;

use chrono::NaiveDateTime;
use pushkind_common::pagination::Pagination;
use serde::{Deserialize, Serialize};

/// One additive adjustment applied when the partner's service price falls
/// inside the inclusive `[min_price, max_price]` range. `max_price = None`
/// leaves the tier unbounded at the top.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceTier {
    pub min_price: f64,
    pub max_price: Option<f64>,
    pub credit_adjustment: f64,
}

impl PriceTier {
    /// Whether `price` falls inside this tier. Both bounds are inclusive.
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min_price && self.max_price.is_none_or(|max| price <= max)
    }
}

/// One multiplier applied when the member's budget ceiling falls inside the
/// inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BudgetThreshold {
    pub min: f64,
    pub max: Option<f64>,
    pub multiplier: f64,
}

impl BudgetThreshold {
    /// Whether `budget` falls inside this threshold. Both bounds are inclusive.
    pub fn contains(&self, budget: f64) -> bool {
        budget >= self.min && self.max.is_none_or(|max| budget <= max)
    }
}

/// Timing multipliers for a rule. At most one of them applies per request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeMultipliers {
    pub peak_season: f64,
    pub last_minute: f64,
    pub advance_booking: f64,
}

/// Domain representation of a dynamic pricing rule for one service category.
///
/// The structured sub-tables are optional: a rule without price tiers or
/// priority multipliers falls back to the built-in defaults, while missing
/// budget or time multipliers disable those stages entirely.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingRule {
    /// Unique identifier of the rule.
    pub id: i32,
    /// Owning hub identifier.
    pub hub_id: i32,
    /// Service category this rule prices, unique per hub.
    pub category: String,
    /// Starting cost in credits before adjustments.
    pub base_credits: f64,
    /// Ordered, non-overlapping price tiers, ascending by `min_price`.
    pub price_tiers: Option<Vec<PriceTier>>,
    /// Multiplier per priority tier name.
    pub priority_multipliers: Option<HashMap<String, f64>>,
    /// Ordered budget thresholds, ascending by `min`.
    pub budget_multipliers: Option<Vec<BudgetThreshold>>,
    /// Timing multipliers.
    pub time_multipliers: Option<TimeMultipliers>,
    /// Inactive rules are excluded from the loaded set.
    pub is_active: bool,
    /// Timestamp for when the rule record was created.
    pub created_at: NaiveDateTime,
    /// Timestamp for the last update to the rule record.
    pub updated_at: NaiveDateTime,
}

/// Payload required to insert a new pricing rule for a hub.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPricingRule {
    /// Owning hub identifier.
    pub hub_id: i32,
    /// Service category this rule prices.
    pub category: String,
    /// Starting cost in credits before adjustments.
    pub base_credits: f64,
    pub price_tiers: Option<Vec<PriceTier>>,
    pub priority_multipliers: Option<HashMap<String, f64>>,
    pub budget_multipliers: Option<Vec<BudgetThreshold>>,
    pub time_multipliers: Option<TimeMultipliers>,
    /// Whether the rule participates in pricing immediately.
    pub is_active: bool,
}

impl NewPricingRule {
    /// Construct a rule payload with a trimmed category and no sub-tables.
    pub fn new(hub_id: i32, category: impl Into<String>, base_credits: f64) -> Self {
        let category = category.into().trim().to_string();
        Self {
            hub_id,
            category,
            base_credits,
            price_tiers: None,
            priority_multipliers: None,
            budget_multipliers: None,
            time_multipliers: None,
            is_active: true,
        }
    }

    /// Attach price tiers to the rule payload.
    pub fn with_price_tiers(mut self, tiers: Vec<PriceTier>) -> Self {
        self.price_tiers = Some(tiers);
        self
    }

    /// Attach priority multipliers to the rule payload.
    pub fn with_priority_multipliers(mut self, multipliers: HashMap<String, f64>) -> Self {
        self.priority_multipliers = Some(multipliers);
        self
    }

    /// Attach budget thresholds to the rule payload.
    pub fn with_budget_multipliers(mut self, thresholds: Vec<BudgetThreshold>) -> Self {
        self.budget_multipliers = Some(thresholds);
        self
    }

    /// Attach timing multipliers to the rule payload.
    pub fn with_time_multipliers(mut self, multipliers: TimeMultipliers) -> Self {
        self.time_multipliers = Some(multipliers);
        self
    }

    /// Override whether the rule starts out active.
    pub fn with_is_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Patch data applied when updating an existing pricing rule. The category
/// is the rule's key and cannot be changed after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePricingRule {
    /// New starting cost in credits.
    pub base_credits: f64,
    /// Replacement price tiers, `None` clears them.
    pub price_tiers: Option<Vec<PriceTier>>,
    /// Replacement priority multipliers, `None` clears them.
    pub priority_multipliers: Option<HashMap<String, f64>>,
    /// Replacement budget thresholds, `None` clears them.
    pub budget_multipliers: Option<Vec<BudgetThreshold>>,
    /// Replacement timing multipliers, `None` clears them.
    pub time_multipliers: Option<TimeMultipliers>,
    /// New active flag.
    pub is_active: bool,
    /// Timestamp captured when the patch was created.
    pub updated_at: NaiveDateTime,
}

impl UpdatePricingRule {
    /// Build a patch that keeps the rule active and replaces everything else.
    pub fn new(base_credits: f64) -> Self {
        let now = chrono::Local::now().naive_utc();
        Self {
            base_credits,
            price_tiers: None,
            priority_multipliers: None,
            budget_multipliers: None,
            time_multipliers: None,
            is_active: true,
            updated_at: now,
        }
    }

    /// Replace the price tiers.
    pub fn price_tiers(mut self, tiers: Option<Vec<PriceTier>>) -> Self {
        self.price_tiers = tiers;
        self
    }

    /// Replace the priority multipliers.
    pub fn priority_multipliers(mut self, multipliers: Option<HashMap<String, f64>>) -> Self {
        self.priority_multipliers = multipliers;
        self
    }

    /// Replace the budget thresholds.
    pub fn budget_multipliers(mut self, thresholds: Option<Vec<BudgetThreshold>>) -> Self {
        self.budget_multipliers = thresholds;
        self
    }

    /// Replace the timing multipliers.
    pub fn time_multipliers(mut self, multipliers: Option<TimeMultipliers>) -> Self {
        self.time_multipliers = multipliers;
        self
    }

    /// Update the active flag.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }
}

/// Query definition used to list pricing rules for a hub.
#[derive(Debug, Clone)]
pub struct PricingRuleListQuery {
    /// Owning hub identifier.
    pub hub_id: i32,
    /// Optional case-insensitive substring search on the category.
    pub search: Option<String>,
    /// When set, only rules with this active flag are returned.
    pub is_active: Option<bool>,
    /// Optional pagination options applied to the query.
    pub pagination: Option<Pagination>,
}

impl PricingRuleListQuery {
    /// Construct a query that targets all pricing rules belonging to `hub_id`.
    pub fn new(hub_id: i32) -> Self {
        Self {
            hub_id,
            search: None,
            is_active: None,
            pagination: None,
        }
    }

    /// Filter the results by a search term applied to the category.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    /// Filter the results by the active flag.
    pub fn is_active(mut self, is_active: bool) -> Self {
        self.is_active = Some(is_active);
        self
    }

    /// Apply pagination to the query with the given page number and page size.
    pub fn paginate(mut self, page: usize, per_page: usize) -> Self {
        self.pagination = Some(Pagination { page, per_page });
        self
    }
}
