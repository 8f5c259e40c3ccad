use pushkind_common::db::{DbConnection, DbPool};
use pushkind_common::repository::errors::RepositoryResult;

use crate::domain::rule::{NewPricingRule, PricingRule, PricingRuleListQuery, UpdatePricingRule};
use crate::domain::rule_change::{RuleChange, RuleChangeListQuery};

pub mod rule;
pub mod rule_change;

#[cfg(test)]
pub mod mock;

#[derive(Clone)]
/// Diesel-backed repository implementation that wraps an r2d2 pool.
pub struct DieselRepository {
    pool: DbPool, // r2d2::Pool is cheap to clone
}

impl DieselRepository {
    /// Create a new repository using the provided connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> RepositoryResult<DbConnection> {
        Ok(self.pool.get()?)
    }
}

/// Read-only operations over pricing rule records.
pub trait PricingRuleReader {
    fn get_rule_by_id(&self, id: i32, hub_id: i32) -> RepositoryResult<Option<PricingRule>>;
    fn get_rule_by_category(
        &self,
        category: &str,
        hub_id: i32,
    ) -> RepositoryResult<Option<PricingRule>>;
    fn list_rules(
        &self,
        query: PricingRuleListQuery,
    ) -> RepositoryResult<(usize, Vec<PricingRule>)>;
    /// All rules flagged active for a hub, the read behind the rule cache.
    fn list_active_rules(&self, hub_id: i32) -> RepositoryResult<Vec<PricingRule>>;
}

/// Write operations over pricing rule records. Every mutation appends a
/// matching audit entry in the same transaction.
pub trait PricingRuleWriter {
    fn create_rule(
        &self,
        new_rule: &NewPricingRule,
        changed_by: &str,
    ) -> RepositoryResult<PricingRule>;
    fn update_rule(
        &self,
        rule_id: i32,
        hub_id: i32,
        updates: &UpdatePricingRule,
        changed_by: &str,
    ) -> RepositoryResult<PricingRule>;
    fn delete_rule(&self, rule_id: i32, hub_id: i32, changed_by: &str) -> RepositoryResult<()>;
}

/// Read-only operations over the rule audit trail.
pub trait RuleChangeReader {
    fn list_rule_changes(
        &self,
        query: RuleChangeListQuery,
    ) -> RepositoryResult<(usize, Vec<RuleChange>)>;
}
