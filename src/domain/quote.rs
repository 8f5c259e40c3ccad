use serde::{Deserialize, Serialize};

/// Priority tier assumed when a request does not specify one.
pub const DEFAULT_PRIORITY: &str = "standard";

/// Per-request input to the cost calculator. Not persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PricingContext {
    /// Service category being quoted.
    pub category: String,
    /// Price quoted by the fulfilling partner, if known.
    pub partner_service_price: Option<f64>,
    /// Priority tier name, `None` means [`DEFAULT_PRIORITY`].
    pub priority: Option<String>,
    /// Member's budget ceiling for the request, if any.
    pub budget_max: Option<f64>,
    /// Requested date is within 48 hours.
    #[serde(default)]
    pub is_last_minute: bool,
    /// Requested date is more than 30 days out.
    #[serde(default)]
    pub is_advance_booking: bool,
    /// Requested date falls in a peak month.
    #[serde(default)]
    pub is_peak_season: bool,
}

impl PricingContext {
    /// Construct a context for `category` with no adjustments.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..Self::default()
        }
    }

    /// Attach the partner's service price.
    pub fn with_partner_price(mut self, price: f64) -> Self {
        self.partner_service_price = Some(price);
        self
    }

    /// Attach a priority tier name.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Attach the member's budget ceiling.
    pub fn with_budget_max(mut self, budget_max: f64) -> Self {
        self.budget_max = Some(budget_max);
        self
    }

    /// Mark the request as last-minute.
    pub fn last_minute(mut self) -> Self {
        self.is_last_minute = true;
        self
    }

    /// Mark the request as an advance booking.
    pub fn advance_booking(mut self) -> Self {
        self.is_advance_booking = true;
        self
    }

    /// Mark the request as falling in peak season.
    pub fn peak_season(mut self) -> Self {
        self.is_peak_season = true;
        self
    }
}

/// Itemized result of a cost calculation. Not persisted.
///
/// `lines` is an ordered, human-readable explanation of every contributing
/// factor, terminated by a separator and a total line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricingBreakdown {
    /// Starting cost in credits before adjustments.
    pub base_cost: f64,
    /// Additive adjustment from the matched price tier.
    pub tier_adjustment: f64,
    /// Multiplier from the request's priority tier.
    pub priority_multiplier: f64,
    /// Multiplier from the member's budget ceiling.
    pub budget_multiplier: f64,
    /// Multiplier from the request's timing.
    pub time_multiplier: f64,
    /// Final cost in credits, always a non-negative integer.
    pub final_cost: i64,
    /// Human-readable line items.
    pub lines: Vec<String>,
}
