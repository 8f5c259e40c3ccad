use mockall::mock;

use super::{PricingRuleReader, PricingRuleWriter, RuleChangeReader};
use crate::domain::{
    rule::{NewPricingRule, PricingRule, PricingRuleListQuery, UpdatePricingRule},
    rule_change::{RuleChange, RuleChangeListQuery},
};
use pushkind_common::repository::errors::RepositoryResult;

mock! {
    pub PricingRuleReader {}

    impl PricingRuleReader for PricingRuleReader {
        fn get_rule_by_id(&self, id: i32, hub_id: i32) -> RepositoryResult<Option<PricingRule>>;
        fn get_rule_by_category(&self, category: &str, hub_id: i32) -> RepositoryResult<Option<PricingRule>>;
        fn list_rules(&self, query: PricingRuleListQuery) -> RepositoryResult<(usize, Vec<PricingRule>)>;
        fn list_active_rules(&self, hub_id: i32) -> RepositoryResult<Vec<PricingRule>>;
    }
}

mock! {
    pub PricingRuleWriter {}

    impl PricingRuleWriter for PricingRuleWriter {
        fn create_rule(&self, new_rule: &NewPricingRule, changed_by: &str) -> RepositoryResult<PricingRule>;
        fn update_rule(&self, rule_id: i32, hub_id: i32, updates: &UpdatePricingRule, changed_by: &str) -> RepositoryResult<PricingRule>;
        fn delete_rule(&self, rule_id: i32, hub_id: i32, changed_by: &str) -> RepositoryResult<()>;
    }
}

mock! {
    pub RuleChangeReader {}

    impl RuleChangeReader for RuleChangeReader {
        fn list_rule_changes(&self, query: RuleChangeListQuery) -> RepositoryResult<(usize, Vec<RuleChange>)>;
    }
}
