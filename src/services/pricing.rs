use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDateTime};
use lazy_static::lazy_static;
use pushkind_common::domain::auth::AuthenticatedUser;
use pushkind_common::routes::empty_string_as_none;
use serde::Deserialize;

use crate::cache::RuleCache;
use crate::domain::quote::{DEFAULT_PRIORITY, PricingBreakdown, PricingContext};
use crate::domain::rule::{PriceTier, PricingRule};
use crate::repository::PricingRuleReader;

/// Categories without an explicit rule or a default table entry cost this
/// many credits before adjustments.
const FALLBACK_BASE_CREDITS: f64 = 1.0;

lazy_static! {
    /// Built-in base cost per service category, used when a hub has no
    /// active rule for the category.
    static ref DEFAULT_BASE_CREDITS: HashMap<&'static str, f64> = HashMap::from([
        ("private_aviation", 3.0),
        ("yacht_charter", 3.0),
        ("real_estate", 2.0),
        ("collectibles", 2.0),
        ("events_access", 2.0),
        ("security", 2.0),
        ("wellness", 1.0),
        ("travel", 2.0),
        ("dining", 1.0),
        ("chauffeur", 1.0),
        ("shopping", 1.0),
    ]);
}

/// Built-in price tiers, used when a rule defines none.
const DEFAULT_PRICE_TIERS: [PriceTier; 4] = [
    PriceTier {
        min_price: 0.0,
        max_price: Some(10_000.0),
        credit_adjustment: 0.0,
    },
    PriceTier {
        min_price: 10_001.0,
        max_price: Some(50_000.0),
        credit_adjustment: 2.0,
    },
    PriceTier {
        min_price: 50_001.0,
        max_price: Some(100_000.0),
        credit_adjustment: 5.0,
    },
    PriceTier {
        min_price: 100_001.0,
        max_price: None,
        credit_adjustment: 10.0,
    },
];

/// Built-in priority multipliers, used when a rule defines none.
fn default_priority_multiplier(priority: &str) -> f64 {
    match priority {
        "standard" => 1.0,
        "priority" => 1.5,
        "urgent" => 2.0,
        "immediate" => 3.0,
        _ => 1.0,
    }
}

/// Convert a pricing context into an itemized credit cost.
///
/// The stage order is fixed: the additive base and tier subtotal is formed
/// first, then the priority, budget and time multipliers compound on top of
/// it, and the result is rounded up to a whole credit. Budget and time
/// stages have no built-in fallback tables; a rule that does not define
/// them leaves those multipliers at 1.
pub fn calculate_dynamic_credit_cost(
    context: &PricingContext,
    rule: Option<&PricingRule>,
) -> PricingBreakdown {
    let mut lines = Vec::new();

    let base_cost = match rule {
        Some(rule) => rule.base_credits,
        None => DEFAULT_BASE_CREDITS
            .get(context.category.as_str())
            .copied()
            .unwrap_or(FALLBACK_BASE_CREDITS),
    };
    lines.push(format!(
        "Base cost ({}): {} credits",
        context.category, base_cost
    ));

    let mut tier_adjustment = 0.0;
    if let Some(price) = context.partner_service_price.filter(|price| *price > 0.0) {
        let tiers = rule
            .and_then(|rule| rule.price_tiers.as_deref())
            .unwrap_or(&DEFAULT_PRICE_TIERS);
        if let Some(tier) = tiers.iter().find(|tier| tier.contains(price)) {
            tier_adjustment = tier.credit_adjustment;
        }
        if tier_adjustment > 0.0 {
            lines.push(format!(
                "Partner price tier ({price}): +{tier_adjustment} credits"
            ));
        }
    }

    let priority = context.priority.as_deref().unwrap_or(DEFAULT_PRIORITY);
    let priority_multiplier = match rule.and_then(|rule| rule.priority_multipliers.as_ref()) {
        Some(multipliers) => multipliers.get(priority).copied().unwrap_or(1.0),
        None => default_priority_multiplier(priority),
    };
    if priority_multiplier > 1.0 {
        lines.push(format!("Priority ({priority}): x{priority_multiplier}"));
    }

    let mut budget_multiplier = 1.0;
    if let Some(budget) = context.budget_max.filter(|budget| *budget > 0.0) {
        if let Some(thresholds) = rule.and_then(|rule| rule.budget_multipliers.as_ref()) {
            if let Some(threshold) = thresholds
                .iter()
                .find(|threshold| threshold.contains(budget))
            {
                budget_multiplier = threshold.multiplier;
            }
        }
        if budget_multiplier > 1.0 {
            lines.push(format!("Budget level ({budget}): x{budget_multiplier}"));
        }
    }

    // At most one timing multiplier applies, last minute winning over
    // advance booking, which wins over peak season.
    let mut time_multiplier = 1.0;
    if let Some(time) = rule.and_then(|rule| rule.time_multipliers.as_ref()) {
        if context.is_last_minute {
            time_multiplier = time.last_minute;
            lines.push(format!("Last minute booking: x{time_multiplier}"));
        } else if context.is_advance_booking {
            time_multiplier = time.advance_booking;
            lines.push(format!("Advance booking: x{time_multiplier}"));
        } else if context.is_peak_season {
            time_multiplier = time.peak_season;
            lines.push(format!("Peak season: x{time_multiplier}"));
        }
    }

    let subtotal = base_cost + tier_adjustment;
    let final_cost = (subtotal * priority_multiplier * budget_multiplier * time_multiplier).ceil();
    let final_cost = (final_cost as i64).max(0);

    lines.push("-".repeat(24));
    lines.push(format!("Total: {final_cost} credits"));

    PricingBreakdown {
        base_cost,
        tier_adjustment,
        priority_multiplier,
        budget_multiplier,
        time_multiplier,
        final_cost,
        lines,
    }
}

/// Whether `event_at` counts as a last-minute booking: between now and
/// 48 hours from now.
pub fn is_last_minute(event_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    let delta = event_at.signed_duration_since(now);
    delta >= Duration::zero() && delta <= Duration::hours(48)
}

/// Whether `event_at` counts as an advance booking: more than 30 days out.
pub fn is_advance_booking(event_at: NaiveDateTime, now: NaiveDateTime) -> bool {
    event_at.signed_duration_since(now) > Duration::days(30)
}

/// Whether `event_at` falls in a peak month: December, January, July or
/// August.
pub fn is_peak_season(event_at: NaiveDateTime) -> bool {
    matches!(event_at.month(), 12 | 1 | 7 | 8)
}

/// Query parameters accepted by the quote endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct QuoteQuery {
    /// Service category being quoted.
    pub category: String,
    /// Price quoted by the fulfilling partner, if known.
    pub partner_service_price: Option<f64>,
    /// Priority tier name.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub priority: Option<String>,
    /// Member's budget ceiling for the request.
    pub budget_max: Option<f64>,
    /// Requested service date, used to derive the timing flags.
    pub event_at: Option<NaiveDateTime>,
    /// Explicit timing flags, OR-ed with the derived ones.
    #[serde(default)]
    pub is_last_minute: bool,
    #[serde(default)]
    pub is_advance_booking: bool,
    #[serde(default)]
    pub is_peak_season: bool,
}

impl QuoteQuery {
    /// Resolve the query into a pricing context, deriving timing flags from
    /// `event_at` relative to `now` when the caller did not set them.
    pub fn into_context(self, now: NaiveDateTime) -> PricingContext {
        let mut context = PricingContext {
            category: self.category,
            partner_service_price: self.partner_service_price,
            priority: self.priority,
            budget_max: self.budget_max,
            is_last_minute: self.is_last_minute,
            is_advance_booking: self.is_advance_booking,
            is_peak_season: self.is_peak_season,
        };

        if let Some(event_at) = self.event_at {
            context.is_last_minute |= is_last_minute(event_at, now);
            context.is_advance_booking |= is_advance_booking(event_at, now);
            context.is_peak_season |= is_peak_season(event_at);
        }

        context
    }
}

/// Quote the credit cost of a request for the user's hub.
///
/// The rule is resolved through the cache; a missing rule or an unreachable
/// store degrades to the built-in defaults, so a quote is always produced.
pub fn quote_credit_cost<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    query: QuoteQuery,
) -> PricingBreakdown
where
    R: PricingRuleReader + ?Sized,
{
    let context = query.into_context(chrono::Local::now().naive_utc());
    let rule = cache.get_rule(repo, user.hub_id, &context.category);
    calculate_dynamic_credit_cost(&context, rule.as_ref())
}

/// Convenience wrapper returning only the final cost in credits.
pub fn get_dynamic_credit_cost<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    query: QuoteQuery,
) -> i64
where
    R: PricingRuleReader + ?Sized,
{
    quote_credit_cost(repo, cache, user, query).final_cost
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    use crate::domain::rule::{BudgetThreshold, TimeMultipliers};

    fn fixed_datetime() -> NaiveDateTime {
        match NaiveDate::from_ymd_opt(2024, 3, 15) {
            Some(date) => date.and_hms_opt(12, 0, 0).unwrap_or_default(),
            None => NaiveDateTime::default(),
        }
    }

    fn rule_with(category: &str, base_credits: f64) -> PricingRule {
        PricingRule {
            id: 1,
            hub_id: 1,
            category: category.to_string(),
            base_credits,
            price_tiers: None,
            priority_multipliers: None,
            budget_multipliers: None,
            time_multipliers: None,
            is_active: true,
            created_at: fixed_datetime(),
            updated_at: fixed_datetime(),
        }
    }

    #[test]
    fn default_base_cost_for_known_category() {
        let context = PricingContext::new("private_aviation");

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.base_cost, 3.0);
        assert_eq!(breakdown.final_cost, 3);
    }

    #[test]
    fn unknown_category_costs_one_credit() {
        let context = PricingContext::new("submarine_rental");

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.base_cost, 1.0);
        assert_eq!(breakdown.final_cost, 1);
    }

    #[test]
    fn urgent_dining_at_seventy_five_thousand_costs_twelve() {
        let context = PricingContext::new("dining")
            .with_partner_price(75_000.0)
            .with_priority("urgent");

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.base_cost, 1.0);
        assert_eq!(breakdown.tier_adjustment, 5.0);
        assert_eq!(breakdown.priority_multiplier, 2.0);
        assert_eq!(breakdown.final_cost, 12);
    }

    #[test]
    fn tier_boundary_belongs_to_lower_tier() {
        let context = PricingContext::new("travel").with_partner_price(10_000.0);

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.tier_adjustment, 0.0);
    }

    #[test]
    fn unbounded_top_tier_matches_large_prices() {
        let context = PricingContext::new("yacht_charter").with_partner_price(2_000_000.0);

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.tier_adjustment, 10.0);
    }

    #[test]
    fn zero_partner_price_skips_tier_stage() {
        let context = PricingContext::new("dining").with_partner_price(0.0);

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.tier_adjustment, 0.0);
        assert_eq!(breakdown.final_cost, 1);
    }

    #[test]
    fn rule_price_tiers_override_defaults() {
        let rule = PricingRule {
            price_tiers: Some(vec![PriceTier {
                min_price: 0.0,
                max_price: None,
                credit_adjustment: 7.0,
            }]),
            ..rule_with("dining", 2.0)
        };
        let context = PricingContext::new("dining").with_partner_price(500.0);

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.tier_adjustment, 7.0);
        assert_eq!(breakdown.final_cost, 9);
    }

    #[test]
    fn empty_rule_tier_list_means_no_adjustment() {
        // A rule with an explicitly empty tier table opts out of tier
        // pricing instead of inheriting the defaults.
        let rule = PricingRule {
            price_tiers: Some(Vec::new()),
            ..rule_with("dining", 2.0)
        };
        let context = PricingContext::new("dining").with_partner_price(75_000.0);

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.tier_adjustment, 0.0);
    }

    #[test]
    fn unknown_priority_multiplies_by_one() {
        let context = PricingContext::new("dining").with_priority("whenever");

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.priority_multiplier, 1.0);
        assert_eq!(breakdown.final_cost, 1);
    }

    #[test]
    fn budget_stage_needs_rule_thresholds() {
        // No default table substitution for budgets, unlike tiers and
        // priorities.
        let context = PricingContext::new("dining").with_budget_max(500_000.0);

        let breakdown = calculate_dynamic_credit_cost(&context, None);
        assert_eq!(breakdown.budget_multiplier, 1.0);

        let rule = rule_with("dining", 1.0);
        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));
        assert_eq!(breakdown.budget_multiplier, 1.0);
    }

    #[test]
    fn budget_thresholds_apply_first_match() {
        let rule = PricingRule {
            budget_multipliers: Some(vec![
                BudgetThreshold {
                    min: 0.0,
                    max: Some(100_000.0),
                    multiplier: 1.0,
                },
                BudgetThreshold {
                    min: 100_000.01,
                    max: None,
                    multiplier: 1.5,
                },
            ]),
            ..rule_with("real_estate", 2.0)
        };
        let context = PricingContext::new("real_estate").with_budget_max(250_000.0);

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.budget_multiplier, 1.5);
        assert_eq!(breakdown.final_cost, 3);
    }

    #[test]
    fn time_stage_needs_rule_multipliers() {
        let context = PricingContext::new("dining").last_minute();

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(breakdown.time_multiplier, 1.0);
    }

    #[test]
    fn last_minute_wins_over_other_time_flags() {
        let rule = PricingRule {
            time_multipliers: Some(TimeMultipliers {
                peak_season: 1.2,
                last_minute: 1.5,
                advance_booking: 0.9,
            }),
            ..rule_with("dining", 2.0)
        };
        let context = PricingContext::new("dining")
            .last_minute()
            .advance_booking()
            .peak_season();

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.time_multiplier, 1.5);
        assert_eq!(breakdown.final_cost, 3);
    }

    #[test]
    fn advance_booking_wins_over_peak_season() {
        let rule = PricingRule {
            time_multipliers: Some(TimeMultipliers {
                peak_season: 1.2,
                last_minute: 1.5,
                advance_booking: 0.9,
            }),
            ..rule_with("dining", 2.0)
        };
        let context = PricingContext::new("dining").advance_booking().peak_season();

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.time_multiplier, 0.9);
    }

    #[test]
    fn multipliers_compound_on_the_subtotal() {
        let rule = PricingRule {
            priority_multipliers: Some(HashMap::from([("urgent".to_string(), 2.0)])),
            budget_multipliers: Some(vec![BudgetThreshold {
                min: 0.0,
                max: None,
                multiplier: 1.25,
            }]),
            time_multipliers: Some(TimeMultipliers {
                peak_season: 1.2,
                last_minute: 1.5,
                advance_booking: 1.0,
            }),
            ..rule_with("events_access", 2.0)
        };
        let context = PricingContext::new("events_access")
            .with_partner_price(20_000.0)
            .with_priority("urgent")
            .with_budget_max(50_000.0)
            .last_minute();

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        // ceil((2 + 2) * 2 * 1.25 * 1.5) = 15
        assert_eq!(breakdown.final_cost, 15);
    }

    #[test]
    fn fractional_results_round_up() {
        let rule = PricingRule {
            priority_multipliers: Some(HashMap::from([("priority".to_string(), 1.5)])),
            ..rule_with("wellness", 1.0)
        };
        let context = PricingContext::new("wellness").with_priority("priority");

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.final_cost, 2);
    }

    #[test]
    fn final_cost_never_goes_negative() {
        let rule = PricingRule {
            price_tiers: Some(vec![PriceTier {
                min_price: 0.0,
                max_price: None,
                credit_adjustment: -10.0,
            }]),
            ..rule_with("dining", 1.0)
        };
        let context = PricingContext::new("dining").with_partner_price(500.0);

        let breakdown = calculate_dynamic_credit_cost(&context, Some(&rule));

        assert_eq!(breakdown.final_cost, 0);
    }

    #[test]
    fn calculation_is_idempotent() {
        let context = PricingContext::new("dining")
            .with_partner_price(75_000.0)
            .with_priority("urgent");

        let first = calculate_dynamic_credit_cost(&context, None);
        let second = calculate_dynamic_credit_cost(&context, None);

        assert_eq!(first, second);
    }

    #[test]
    fn breakdown_ends_with_separator_and_total() {
        let context = PricingContext::new("private_aviation");

        let breakdown = calculate_dynamic_credit_cost(&context, None);

        let len = breakdown.lines.len();
        assert!(len >= 3);
        assert!(breakdown.lines[len - 2].chars().all(|c| c == '-'));
        assert_eq!(breakdown.lines[len - 1], "Total: 3 credits");
    }

    #[test]
    fn last_minute_window_is_zero_to_forty_eight_hours() {
        let now = fixed_datetime();

        assert!(is_last_minute(now, now));
        assert!(is_last_minute(now + Duration::hours(48), now));
        assert!(!is_last_minute(now + Duration::hours(49), now));
        assert!(!is_last_minute(now - Duration::hours(1), now));
    }

    #[test]
    fn advance_booking_starts_after_thirty_days() {
        let now = fixed_datetime();

        assert!(!is_advance_booking(now + Duration::days(30), now));
        assert!(is_advance_booking(now + Duration::days(31), now));
    }

    #[test]
    fn peak_season_months() {
        let date = |year: i32, month: u32| {
            NaiveDate::from_ymd_opt(year, month, 10)
                .and_then(|date| date.and_hms_opt(10, 0, 0))
                .unwrap_or_default()
        };

        assert!(is_peak_season(date(2024, 12)));
        assert!(is_peak_season(date(2024, 1)));
        assert!(is_peak_season(date(2024, 7)));
        assert!(is_peak_season(date(2024, 8)));
        assert!(!is_peak_season(date(2024, 3)));
        assert!(!is_peak_season(date(2024, 10)));
    }

    #[test]
    fn quote_query_derives_flags_from_event_date() {
        let now = fixed_datetime();
        let query = QuoteQuery {
            category: "dining".to_string(),
            event_at: Some(now + Duration::hours(12)),
            ..QuoteQuery::default()
        };

        let context = query.into_context(now);

        assert!(context.is_last_minute);
        assert!(!context.is_advance_booking);
        assert!(!context.is_peak_season);
    }

    #[test]
    fn quote_query_keeps_explicit_flags() {
        let now = fixed_datetime();
        let query = QuoteQuery {
            category: "dining".to_string(),
            is_peak_season: true,
            ..QuoteQuery::default()
        };

        let context = query.into_context(now);

        assert!(context.is_peak_season);
    }
}
