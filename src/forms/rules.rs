use std::collections::HashMap;
use std::io::{Read, Seek};

use actix_multipart::form::{MultipartForm, tempfile::TempFile};
use csv::Trim;
use pushkind_common::routes::empty_string_as_none;
use serde::Deserialize;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::domain::rule::{
    BudgetThreshold, NewPricingRule, PriceTier, TimeMultipliers, UpdatePricingRule,
};

/// Maximum length allowed for a category identifier.
const CATEGORY_MAX_LEN: u64 = 64;

/// Result type returned by the pricing rule form helpers.
pub type RuleFormResult<T> = Result<T, RuleFormError>;

/// Errors that can occur while processing pricing rule forms.
#[derive(Debug, Error)]
pub enum RuleFormError {
    /// Validation failures from the `validator` crate.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
    /// The provided category is empty after sanitization.
    #[error("category cannot be empty")]
    EmptyCategory,
    /// A structured sub-table field does not hold valid JSON.
    #[error("{field} is not valid JSON: {source}")]
    InvalidTable {
        field: &'static str,
        source: serde_json::Error,
    },
    /// A multiplier must be greater than zero.
    #[error("{field} must contain only positive multipliers")]
    NonPositiveMultiplier { field: &'static str },
    /// A CSV row carries a negative base credit value.
    #[error("row {row} has a negative base credit value")]
    NegativeBaseCredits { row: usize },
    /// CSV parsing failures.
    #[error("failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),
    /// Reading the uploaded file failed.
    #[error("failed to read uploaded file")]
    FileRead(#[from] std::io::Error),
}

/// Parse an optional JSON textarea into its typed sub-table. Blank input
/// counts as absent.
fn parse_table<T: serde::de::DeserializeOwned>(
    raw: Option<&str>,
    field: &'static str,
) -> RuleFormResult<Option<T>> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|source| RuleFormError::InvalidTable { field, source }),
    }
}

fn ensure_positive_priority(
    multipliers: &Option<HashMap<String, f64>>,
) -> RuleFormResult<()> {
    if let Some(multipliers) = multipliers {
        if multipliers.values().any(|multiplier| *multiplier <= 0.0) {
            return Err(RuleFormError::NonPositiveMultiplier {
                field: "priority_multipliers",
            });
        }
    }
    Ok(())
}

fn ensure_positive_budget(thresholds: &Option<Vec<BudgetThreshold>>) -> RuleFormResult<()> {
    if let Some(thresholds) = thresholds {
        if thresholds
            .iter()
            .any(|threshold| threshold.multiplier <= 0.0)
        {
            return Err(RuleFormError::NonPositiveMultiplier {
                field: "budget_multipliers",
            });
        }
    }
    Ok(())
}

fn ensure_positive_time(multipliers: &Option<TimeMultipliers>) -> RuleFormResult<()> {
    if let Some(multipliers) = multipliers {
        if multipliers.peak_season <= 0.0
            || multipliers.last_minute <= 0.0
            || multipliers.advance_booking <= 0.0
        {
            return Err(RuleFormError::NonPositiveMultiplier {
                field: "time_multipliers",
            });
        }
    }
    Ok(())
}

/// Normalize a category into its identifier form: trimmed, lowercased,
/// whitespace collapsed into single underscores.
fn sanitize_category(input: &str) -> String {
    let mut sanitized = String::with_capacity(input.len());
    let mut previous_separator = false;

    for ch in input.trim().chars() {
        if ch.is_whitespace() {
            if !previous_separator {
                sanitized.push('_');
                previous_separator = true;
            }
        } else if ch.is_control() {
            continue;
        } else {
            for lower in ch.to_lowercase() {
                sanitized.push(lower);
            }
            previous_separator = false;
        }
    }

    sanitized
}

/// Form payload emitted when submitting the "Add rule" form. The
/// structured sub-tables arrive as JSON textareas and may be left blank.
#[derive(Debug, Deserialize, Validate)]
pub struct AddRuleForm {
    /// Category identifier entered by the user.
    #[validate(length(min = 1, max = CATEGORY_MAX_LEN))]
    pub category: String,
    /// Starting cost in credits before adjustments.
    #[validate(range(min = 0.0))]
    pub base_credits: f64,
    /// JSON array of price tiers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price_tiers: Option<String>,
    /// JSON object mapping priority names to multipliers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub priority_multipliers: Option<String>,
    /// JSON array of budget thresholds.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub budget_multipliers: Option<String>,
    /// JSON object with the three timing multipliers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub time_multipliers: Option<String>,
    /// Whether the rule takes effect immediately.
    #[serde(default)]
    pub is_active: bool,
}

impl AddRuleForm {
    /// Validates and parses the payload into a domain `NewPricingRule`.
    pub fn into_new_rule(self, hub_id: i32) -> RuleFormResult<NewPricingRule> {
        self.validate()?;

        let category = sanitize_category(&self.category);
        if category.is_empty() {
            return Err(RuleFormError::EmptyCategory);
        }

        let price_tiers: Option<Vec<PriceTier>> =
            parse_table(self.price_tiers.as_deref(), "price_tiers")?;
        let priority_multipliers: Option<HashMap<String, f64>> =
            parse_table(self.priority_multipliers.as_deref(), "priority_multipliers")?;
        let budget_multipliers: Option<Vec<BudgetThreshold>> =
            parse_table(self.budget_multipliers.as_deref(), "budget_multipliers")?;
        let time_multipliers: Option<TimeMultipliers> =
            parse_table(self.time_multipliers.as_deref(), "time_multipliers")?;

        ensure_positive_priority(&priority_multipliers)?;
        ensure_positive_budget(&budget_multipliers)?;
        ensure_positive_time(&time_multipliers)?;

        let mut new_rule = NewPricingRule::new(hub_id, category, self.base_credits)
            .with_is_active(self.is_active);
        new_rule.price_tiers = price_tiers;
        new_rule.priority_multipliers = priority_multipliers;
        new_rule.budget_multipliers = budget_multipliers;
        new_rule.time_multipliers = time_multipliers;

        Ok(new_rule)
    }
}

/// Form payload emitted when submitting the "Edit rule" form. The category
/// is the rule's key and is not editable.
#[derive(Debug, Deserialize, Validate)]
pub struct EditRuleForm {
    /// Starting cost in credits before adjustments.
    #[validate(range(min = 0.0))]
    pub base_credits: f64,
    /// JSON array of price tiers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub price_tiers: Option<String>,
    /// JSON object mapping priority names to multipliers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub priority_multipliers: Option<String>,
    /// JSON array of budget thresholds.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub budget_multipliers: Option<String>,
    /// JSON object with the three timing multipliers.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub time_multipliers: Option<String>,
    /// Whether the rule stays active.
    #[serde(default)]
    pub is_active: bool,
}

impl EditRuleForm {
    /// Validates and parses the payload into a domain `UpdatePricingRule`.
    pub fn into_update_rule(self) -> RuleFormResult<UpdatePricingRule> {
        self.validate()?;

        let price_tiers: Option<Vec<PriceTier>> =
            parse_table(self.price_tiers.as_deref(), "price_tiers")?;
        let priority_multipliers: Option<HashMap<String, f64>> =
            parse_table(self.priority_multipliers.as_deref(), "priority_multipliers")?;
        let budget_multipliers: Option<Vec<BudgetThreshold>> =
            parse_table(self.budget_multipliers.as_deref(), "budget_multipliers")?;
        let time_multipliers: Option<TimeMultipliers> =
            parse_table(self.time_multipliers.as_deref(), "time_multipliers")?;

        ensure_positive_priority(&priority_multipliers)?;
        ensure_positive_budget(&budget_multipliers)?;
        ensure_positive_time(&time_multipliers)?;

        Ok(UpdatePricingRule::new(self.base_credits)
            .price_tiers(price_tiers)
            .priority_multipliers(priority_multipliers)
            .budget_multipliers(budget_multipliers)
            .time_multipliers(time_multipliers)
            .is_active(self.is_active))
    }
}

#[derive(MultipartForm)]
/// Multipart form for uploading a CSV file with new pricing rules.
pub struct UploadRulesForm {
    #[multipart(limit = "10MB")]
    /// Uploaded CSV file containing rule data.
    pub csv: TempFile,
}

#[derive(Deserialize)]
struct RuleCsvRow {
    #[serde(default, deserialize_with = "empty_string_as_none")]
    category: Option<String>,
    base_credits: Option<f64>,
    is_active: Option<bool>,
}

impl UploadRulesForm {
    /// Parse the uploaded CSV file into a list of [`NewPricingRule`]
    /// records. Imported rules start without structured sub-tables, so
    /// they price with the built-in defaults until edited.
    pub fn into_new_rules(&mut self, hub_id: i32) -> RuleFormResult<Vec<NewPricingRule>> {
        self.csv.file.rewind()?;
        parse_rules(self.csv.file.by_ref(), hub_id)
    }
}

fn parse_rules<R: Read>(reader: R, hub_id: i32) -> RuleFormResult<Vec<NewPricingRule>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(reader);

    let mut rules = Vec::new();

    for (index, row) in csv_reader.deserialize::<RuleCsvRow>().enumerate() {
        let record = row?;

        let Some(category) = record.category else {
            continue;
        };

        let category = sanitize_category(&category);
        if category.is_empty() {
            continue;
        }

        let base_credits = record.base_credits.unwrap_or(1.0);
        if base_credits < 0.0 {
            return Err(RuleFormError::NegativeBaseCredits { row: index + 1 });
        }

        let rule = NewPricingRule::new(hub_id, category, base_credits)
            .with_is_active(record.is_active.unwrap_or(true));

        rules.push(rule);
    }

    Ok(rules)
}
