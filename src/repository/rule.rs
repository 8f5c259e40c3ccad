use diesel::prelude::*;
use pushkind_common::repository::errors::{RepositoryError, RepositoryResult};

use crate::{
    domain::{
        rule::{
            NewPricingRule as DomainNewPricingRule, PricingRule as DomainPricingRule,
            PricingRuleListQuery, UpdatePricingRule as DomainUpdatePricingRule,
        },
        rule_change::{RuleChangeAction, RuleRevision},
    },
    models::{
        rule::{
            NewPricingRule as DbNewPricingRule, PricingRule as DbPricingRule,
            UpdatePricingRule as DbUpdatePricingRule,
        },
        rule_change::NewRuleChange as DbNewRuleChange,
    },
    repository::{DieselRepository, PricingRuleReader, PricingRuleWriter},
};

impl PricingRuleReader for DieselRepository {
    fn get_rule_by_id(&self, id: i32, hub_id: i32) -> RepositoryResult<Option<DomainPricingRule>> {
        use crate::schema::pricing_rules;

        let mut conn = self.conn()?;
        let rule = pricing_rules::table
            .filter(pricing_rules::id.eq(id))
            .filter(pricing_rules::hub_id.eq(hub_id))
            .first::<DbPricingRule>(&mut conn)
            .optional()?;

        Ok(rule.map(Into::into))
    }

    fn get_rule_by_category(
        &self,
        category: &str,
        hub_id: i32,
    ) -> RepositoryResult<Option<DomainPricingRule>> {
        use crate::schema::pricing_rules;

        let mut conn = self.conn()?;
        let rule = pricing_rules::table
            .filter(pricing_rules::category.eq(category))
            .filter(pricing_rules::hub_id.eq(hub_id))
            .first::<DbPricingRule>(&mut conn)
            .optional()?;

        Ok(rule.map(Into::into))
    }

    fn list_rules(
        &self,
        query: PricingRuleListQuery,
    ) -> RepositoryResult<(usize, Vec<DomainPricingRule>)> {
        use crate::schema::pricing_rules;

        let mut conn = self.conn()?;

        let mut count_query = pricing_rules::table
            .filter(pricing_rules::hub_id.eq(query.hub_id))
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(term) = query.search.as_ref() {
            let pattern = format!("%{}%", term);
            count_query = count_query.filter(pricing_rules::category.like(pattern));
        }

        if let Some(is_active) = query.is_active {
            count_query = count_query.filter(pricing_rules::is_active.eq(is_active));
        }

        let total = count_query.count().get_result::<i64>(&mut conn)? as usize;

        let mut items = pricing_rules::table
            .filter(pricing_rules::hub_id.eq(query.hub_id))
            .into_boxed::<diesel::sqlite::Sqlite>();

        if let Some(term) = query.search.as_ref() {
            let pattern = format!("%{}%", term);
            items = items.filter(pricing_rules::category.like(pattern));
        }

        if let Some(is_active) = query.is_active {
            items = items.filter(pricing_rules::is_active.eq(is_active));
        }

        items = items.order(pricing_rules::category.asc());

        if let Some(pagination) = &query.pagination {
            let offset = ((pagination.page.max(1) - 1) * pagination.per_page) as i64;
            let limit = pagination.per_page as i64;
            items = items.offset(offset).limit(limit);
        }

        let db_rules = items.load::<DbPricingRule>(&mut conn)?;

        Ok((total, db_rules.into_iter().map(Into::into).collect()))
    }

    fn list_active_rules(&self, hub_id: i32) -> RepositoryResult<Vec<DomainPricingRule>> {
        use crate::schema::pricing_rules;

        let mut conn = self.conn()?;
        let db_rules = pricing_rules::table
            .filter(pricing_rules::hub_id.eq(hub_id))
            .filter(pricing_rules::is_active.eq(true))
            .order(pricing_rules::category.asc())
            .load::<DbPricingRule>(&mut conn)?;

        Ok(db_rules.into_iter().map(Into::into).collect())
    }
}

impl PricingRuleWriter for DieselRepository {
    fn create_rule(
        &self,
        new_rule: &DomainNewPricingRule,
        changed_by: &str,
    ) -> RepositoryResult<DomainPricingRule> {
        use crate::schema::{pricing_rule_changes, pricing_rules};

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let db_new = DbNewPricingRule::from(new_rule);

            let created = diesel::insert_into(pricing_rules::table)
                .values(&db_new)
                .get_result::<DbPricingRule>(conn)?;

            let created: DomainPricingRule = created.into();

            let audit = DbNewRuleChange::new(
                created.hub_id,
                &created.category,
                RuleChangeAction::Created,
                changed_by,
                None,
                Some(RuleRevision::from(&created)),
            );
            diesel::insert_into(pricing_rule_changes::table)
                .values(&audit)
                .execute(conn)?;

            Ok::<DomainPricingRule, diesel::result::Error>(created)
        })
        .map_err(Into::into)
    }

    fn update_rule(
        &self,
        rule_id: i32,
        hub_id: i32,
        updates: &DomainUpdatePricingRule,
        changed_by: &str,
    ) -> RepositoryResult<DomainPricingRule> {
        use crate::schema::{pricing_rule_changes, pricing_rules};

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let existing = pricing_rules::table
                .filter(pricing_rules::id.eq(rule_id))
                .filter(pricing_rules::hub_id.eq(hub_id))
                .first::<DbPricingRule>(conn)
                .optional()?
                .ok_or(RepositoryError::NotFound)?;
            let existing: DomainPricingRule = existing.into();

            let db_updates = DbUpdatePricingRule::from(updates);
            let target = pricing_rules::table
                .filter(pricing_rules::id.eq(rule_id))
                .filter(pricing_rules::hub_id.eq(hub_id));

            let updated = diesel::update(target)
                .set(&db_updates)
                .get_result::<DbPricingRule>(conn)?;
            let updated: DomainPricingRule = updated.into();

            let audit = DbNewRuleChange::new(
                hub_id,
                &updated.category,
                RuleChangeAction::Updated,
                changed_by,
                Some(RuleRevision::from(&existing)),
                Some(RuleRevision::from(&updated)),
            );
            diesel::insert_into(pricing_rule_changes::table)
                .values(&audit)
                .execute(conn)?;

            Ok::<DomainPricingRule, RepositoryError>(updated)
        })
    }

    fn delete_rule(&self, rule_id: i32, hub_id: i32, changed_by: &str) -> RepositoryResult<()> {
        use crate::schema::{pricing_rule_changes, pricing_rules};

        let mut conn = self.conn()?;
        conn.transaction(|conn| {
            let existing = pricing_rules::table
                .filter(pricing_rules::id.eq(rule_id))
                .filter(pricing_rules::hub_id.eq(hub_id))
                .first::<DbPricingRule>(conn)
                .optional()?
                .ok_or(RepositoryError::NotFound)?;
            let existing: DomainPricingRule = existing.into();

            let target = pricing_rules::table
                .filter(pricing_rules::id.eq(rule_id))
                .filter(pricing_rules::hub_id.eq(hub_id));
            diesel::delete(target).execute(conn)?;

            let audit = DbNewRuleChange::new(
                hub_id,
                &existing.category,
                RuleChangeAction::Deleted,
                changed_by,
                Some(RuleRevision::from(&existing)),
                None,
            );
            diesel::insert_into(pricing_rule_changes::table)
                .values(&audit)
                .execute(conn)?;

            Ok::<(), RepositoryError>(())
        })
    }
}
