use pushkind_common::domain::auth::AuthenticatedUser;
use pushkind_common::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use pushkind_common::routes::check_role;
use serde::Deserialize;

use crate::SERVICE_ACCESS_ROLE;
use crate::cache::RuleCache;
use crate::domain::rule::{PricingRule, PricingRuleListQuery};
use crate::domain::rule_change::{RuleChange, RuleChangeListQuery};
use crate::forms::rules::{AddRuleForm, EditRuleForm, UploadRulesForm};
use crate::repository::{PricingRuleReader, PricingRuleWriter, RuleChangeReader};
use crate::services::{ServiceError, ServiceResult};

/// Query parameters accepted by the rules index page.
#[derive(Debug, Default, Deserialize)]
pub struct RulesQuery {
    /// Optional search string entered by the user.
    pub search: Option<String>,
    /// Page number requested by the user interface.
    pub page: Option<usize>,
}

/// Data required to render the rules index template.
pub struct RulesPageData {
    /// Paginated list of pricing rules to show in the table.
    pub rules: Paginated<PricingRule>,
    /// Search query echoed back to the template when present.
    pub search: Option<String>,
}

/// Query parameters accepted by the rule history page.
#[derive(Debug, Default, Deserialize)]
pub struct RuleHistoryQuery {
    /// Page number requested by the user interface.
    pub page: Option<usize>,
}

/// Data required to render the rule history template.
pub struct RuleHistoryPageData {
    /// The rule whose history is shown.
    pub rule: PricingRule,
    /// Paginated audit entries, newest first.
    pub changes: Paginated<RuleChange>,
}

/// Loads the pricing rules list for the index page.
pub fn load_rules<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: RulesQuery,
) -> ServiceResult<RulesPageData>
where
    R: PricingRuleReader + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let page = query.page.unwrap_or(1);
    let mut list_query =
        PricingRuleListQuery::new(user.hub_id).paginate(page, DEFAULT_ITEMS_PER_PAGE);

    if let Some(value) = query.search.as_ref() {
        list_query = list_query.search(value);
    }

    let (total, rules) = repo.list_rules(list_query).map_err(ServiceError::from)?;

    let total_pages = total.div_ceil(DEFAULT_ITEMS_PER_PAGE);
    let rules = Paginated::new(rules, page, total_pages);

    Ok(RulesPageData {
        rules,
        search: query.search,
    })
}

/// Creates a new pricing rule for the authenticated user's hub.
///
/// On success the hub's rule cache is invalidated so the new rule takes
/// effect on the next quote.
pub fn create_rule<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    form: AddRuleForm,
) -> ServiceResult<PricingRule>
where
    R: PricingRuleReader + PricingRuleWriter + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let new_rule = form
        .into_new_rule(user.hub_id)
        .map_err(|err| ServiceError::Form(err.to_string()))?;

    if repo
        .get_rule_by_category(&new_rule.category, user.hub_id)
        .map_err(ServiceError::from)?
        .is_some()
    {
        return Err(ServiceError::Conflict);
    }

    let rule = repo
        .create_rule(&new_rule, &user.email)
        .map_err(ServiceError::from)?;

    cache.invalidate(user.hub_id);

    Ok(rule)
}

/// Updates an existing pricing rule for the authenticated user's hub.
pub fn modify_rule<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    rule_id: i32,
    form: EditRuleForm,
) -> ServiceResult<PricingRule>
where
    R: PricingRuleWriter + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let updates = form
        .into_update_rule()
        .map_err(|err| ServiceError::Form(err.to_string()))?;

    let rule = repo
        .update_rule(rule_id, user.hub_id, &updates, &user.email)
        .map_err(ServiceError::from)?;

    cache.invalidate(user.hub_id);

    Ok(rule)
}

/// Deletes a pricing rule for the authenticated user's hub.
pub fn remove_rule<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    rule_id: i32,
) -> ServiceResult<()>
where
    R: PricingRuleWriter + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    repo.delete_rule(rule_id, user.hub_id, &user.email)
        .map_err(ServiceError::from)?;

    cache.invalidate(user.hub_id);

    Ok(())
}

/// Imports pricing rules from an uploaded CSV file.
///
/// Categories that already have a rule are skipped; the number of created
/// rules is returned.
pub fn import_rules<R>(
    repo: &R,
    cache: &RuleCache,
    user: &AuthenticatedUser,
    mut form: UploadRulesForm,
) -> ServiceResult<usize>
where
    R: PricingRuleReader + PricingRuleWriter + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let new_rules = form
        .into_new_rules(user.hub_id)
        .map_err(|err| ServiceError::Form(err.to_string()))?;

    let mut created = 0;
    for new_rule in &new_rules {
        if repo
            .get_rule_by_category(&new_rule.category, user.hub_id)
            .map_err(ServiceError::from)?
            .is_some()
        {
            continue;
        }

        repo.create_rule(new_rule, &user.email)
            .map_err(ServiceError::from)?;
        created += 1;
    }

    if created > 0 {
        cache.invalidate(user.hub_id);
    }

    Ok(created)
}

/// Loads a rule together with its audit trail for the history page.
pub fn load_rule_history<R>(
    repo: &R,
    user: &AuthenticatedUser,
    rule_id: i32,
    query: RuleHistoryQuery,
) -> ServiceResult<RuleHistoryPageData>
where
    R: PricingRuleReader + RuleChangeReader + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let rule = repo
        .get_rule_by_id(rule_id, user.hub_id)
        .map_err(ServiceError::from)?
        .ok_or(ServiceError::NotFound)?;

    let page = query.page.unwrap_or(1);
    let list_query = RuleChangeListQuery::new(user.hub_id)
        .category(&rule.category)
        .paginate(page, DEFAULT_ITEMS_PER_PAGE);

    let (total, changes) = repo
        .list_rule_changes(list_query)
        .map_err(ServiceError::from)?;

    let total_pages = total.div_ceil(DEFAULT_ITEMS_PER_PAGE);
    let changes = Paginated::new(changes, page, total_pages);

    Ok(RuleHistoryPageData { rule, changes })
}
