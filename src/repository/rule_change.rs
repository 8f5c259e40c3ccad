use diesel::prelude::*;
use pushkind_common::repository::errors::RepositoryResult;

use crate::{
    domain::rule_change::{RuleChange as DomainRuleChange, RuleChangeListQuery},
    models::rule_change::RuleChange as DbRuleChange,
    repository::{DieselRepository, RuleChangeReader},
};

impl RuleChangeReader for DieselRepository {
    fn list_rule_changes(
        &self,
        query: RuleChangeListQuery,
    ) -> RepositoryResult<(usize, Vec<DomainRuleChange>)> {
        use crate::schema::pricing_rule_changes;

        let mut conn = self.conn()?;

        let mut count_query = pricing_rule_changes::table
            .filter(pricing_rule_changes::hub_id.eq(query.hub_id))
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(category) = query.category.as_ref() {
            count_query = count_query.filter(pricing_rule_changes::category.eq(category));
        }

        let total = count_query.count().get_result::<i64>(&mut conn)? as usize;

        let mut items = pricing_rule_changes::table
            .filter(pricing_rule_changes::hub_id.eq(query.hub_id))
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(category) = query.category.as_ref() {
            items = items.filter(pricing_rule_changes::category.eq(category));
        }

        // Newest entries first, matching how the history page reads.
        items = items.order((
            pricing_rule_changes::created_at.desc(),
            pricing_rule_changes::id.desc(),
        ));

        if let Some(pagination) = &query.pagination {
            let offset = ((pagination.page.max(1) - 1) * pagination.per_page) as i64;
            let limit = pagination.per_page as i64;
            items = items.offset(offset).limit(limit);
        }

        let db_changes = items.load::<DbRuleChange>(&mut conn)?;

        Ok((total, db_changes.into_iter().map(Into::into).collect()))
    }
}
