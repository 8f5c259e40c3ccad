use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Serialize, de::DeserializeOwned};

use crate::domain::rule::{
    NewPricingRule as DomainNewPricingRule, PricingRule as DomainPricingRule,
    UpdatePricingRule as DomainUpdatePricingRule,
};

/// Parse a JSON sub-table column into its typed shape.
///
/// A malformed blob is logged and treated as absent, which disables the
/// corresponding calculation stage instead of aborting the calculation.
pub(crate) fn parse_json_column<T: DeserializeOwned>(
    raw: Option<&str>,
    column: &str,
    category: &str,
) -> Option<T> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    match serde_json::from_str(raw) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            log::warn!("Discarding malformed {column} blob for rule {category}: {err}");
            None
        }
    }
}

/// Serialize a typed sub-table into its JSON column form.
pub(crate) fn to_json_column<T: Serialize>(value: &Option<T>) -> Option<String> {
    value
        .as_ref()
        .and_then(|value| serde_json::to_string(value).ok())
}

#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::pricing_rules)]
pub struct PricingRule {
    pub id: i32,
    pub hub_id: i32,
    pub category: String,
    pub base_credits: f64,
    pub price_tiers: Option<String>,
    pub priority_multipliers: Option<String>,
    pub budget_multipliers: Option<String>,
    pub time_multipliers: Option<String>,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = crate::schema::pricing_rules)]
pub struct NewPricingRule<'a> {
    pub hub_id: i32,
    pub category: &'a str,
    pub base_credits: f64,
    pub price_tiers: Option<String>,
    pub priority_multipliers: Option<String>,
    pub budget_multipliers: Option<String>,
    pub time_multipliers: Option<String>,
    pub is_active: bool,
}

#[derive(AsChangeset)]
#[diesel(table_name = crate::schema::pricing_rules)]
#[diesel(treat_none_as_null = true)]
pub struct UpdatePricingRule {
    pub base_credits: f64,
    pub price_tiers: Option<String>,
    pub priority_multipliers: Option<String>,
    pub budget_multipliers: Option<String>,
    pub time_multipliers: Option<String>,
    pub is_active: bool,
    pub updated_at: NaiveDateTime,
}

impl From<PricingRule> for DomainPricingRule {
    fn from(value: PricingRule) -> Self {
        let category = value.category;
        Self {
            id: value.id,
            hub_id: value.hub_id,
            base_credits: value.base_credits,
            price_tiers: parse_json_column(value.price_tiers.as_deref(), "price_tiers", &category),
            priority_multipliers: parse_json_column(
                value.priority_multipliers.as_deref(),
                "priority_multipliers",
                &category,
            ),
            budget_multipliers: parse_json_column(
                value.budget_multipliers.as_deref(),
                "budget_multipliers",
                &category,
            ),
            time_multipliers: parse_json_column(
                value.time_multipliers.as_deref(),
                "time_multipliers",
                &category,
            ),
            is_active: value.is_active,
            created_at: value.created_at,
            updated_at: value.updated_at,
            category,
        }
    }
}

impl<'a> From<&'a DomainNewPricingRule> for NewPricingRule<'a> {
    fn from(value: &'a DomainNewPricingRule) -> Self {
        Self {
            hub_id: value.hub_id,
            category: value.category.as_str(),
            base_credits: value.base_credits,
            price_tiers: to_json_column(&value.price_tiers),
            priority_multipliers: to_json_column(&value.priority_multipliers),
            budget_multipliers: to_json_column(&value.budget_multipliers),
            time_multipliers: to_json_column(&value.time_multipliers),
            is_active: value.is_active,
        }
    }
}

impl From<&DomainUpdatePricingRule> for UpdatePricingRule {
    fn from(value: &DomainUpdatePricingRule) -> Self {
        Self {
            base_credits: value.base_credits,
            price_tiers: to_json_column(&value.price_tiers),
            priority_multipliers: to_json_column(&value.priority_multipliers),
            budget_multipliers: to_json_column(&value.budget_multipliers),
            time_multipliers: to_json_column(&value.time_multipliers),
            is_active: value.is_active,
            updated_at: value.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::PriceTier;

    #[test]
    fn parse_json_column_accepts_valid_blob() {
        let tiers: Option<Vec<PriceTier>> = parse_json_column(
            Some(r#"[{"min_price":0.0,"max_price":10000.0,"credit_adjustment":0.0}]"#),
            "price_tiers",
            "dining",
        );

        let tiers = tiers.expect("expected tiers to parse");
        assert_eq!(tiers.len(), 1);
        assert_eq!(tiers[0].max_price, Some(10_000.0));
    }

    #[test]
    fn parse_json_column_defaults_malformed_blob_to_absent() {
        let tiers: Option<Vec<PriceTier>> =
            parse_json_column(Some("{not json"), "price_tiers", "dining");

        assert!(tiers.is_none());
    }

    #[test]
    fn parse_json_column_treats_blank_as_absent() {
        let tiers: Option<Vec<PriceTier>> = parse_json_column(Some("   "), "price_tiers", "dining");

        assert!(tiers.is_none());

        let tiers: Option<Vec<PriceTier>> = parse_json_column(None, "price_tiers", "dining");

        assert!(tiers.is_none());
    }
}
