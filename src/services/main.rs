use pushkind_common::domain::auth::AuthenticatedUser;
use pushkind_common::pagination::{DEFAULT_ITEMS_PER_PAGE, Paginated};
use pushkind_common::routes::check_role;
use serde::Deserialize;

use crate::SERVICE_ACCESS_ROLE;
use crate::domain::rule_change::{RuleChange, RuleChangeListQuery};
use crate::repository::RuleChangeReader;
use crate::services::{ServiceError, ServiceResult};

/// Query parameters accepted by the index page service.
#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    /// Page number requested by the user interface.
    pub page: Option<usize>,
}

/// Data required to render the main index template.
pub struct IndexPageData {
    /// Paginated list of recent rule changes, newest first.
    pub changes: Paginated<RuleChange>,
}

/// Loads the recent pricing rule changes for the main index page.
pub fn load_index_page<R>(
    repo: &R,
    user: &AuthenticatedUser,
    query: IndexQuery,
) -> ServiceResult<IndexPageData>
where
    R: RuleChangeReader + ?Sized,
{
    if !check_role(SERVICE_ACCESS_ROLE, &user.roles) {
        return Err(ServiceError::Unauthorized);
    }

    let page = query.page.unwrap_or(1);
    let list_query = RuleChangeListQuery::new(user.hub_id).paginate(page, DEFAULT_ITEMS_PER_PAGE);

    let (total, changes) = repo
        .list_rule_changes(list_query)
        .map_err(ServiceError::from)?;

    let total_pages = total.div_ceil(DEFAULT_ITEMS_PER_PAGE);
    let changes = Paginated::new(changes, page, total_pages);

    Ok(IndexPageData { changes })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{NaiveDate, NaiveDateTime};

    use crate::domain::rule_change::RuleChangeAction;
    use crate::repository::mock::MockRuleChangeReader;

    fn fixed_datetime() -> NaiveDateTime {
        match NaiveDate::from_ymd_opt(2024, 1, 1) {
            Some(date) => date.and_hms_opt(0, 0, 0).unwrap_or_default(),
            None => NaiveDateTime::default(),
        }
    }

    fn sample_change(id: i32, hub_id: i32, category: &str) -> RuleChange {
        RuleChange {
            id,
            hub_id,
            category: category.to_string(),
            action: RuleChangeAction::Updated,
            changed_by: "admin@example.com".to_string(),
            previous_value: None,
            new_value: None,
            created_at: fixed_datetime(),
        }
    }

    fn user_with_roles(roles: &[&str]) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: "user-1".to_string(),
            email: "user@example.com".to_string(),
            hub_id: 99,
            name: "Tester".to_string(),
            roles: roles.iter().map(|role| (*role).to_string()).collect(),
            exp: 0,
        }
    }

    #[test]
    fn load_index_page_returns_unauthorized_when_role_missing() {
        let repo = MockRuleChangeReader::new();
        let user = user_with_roles(&[]);

        let result = load_index_page(&repo, &user, IndexQuery::default());

        assert!(matches!(result, Err(ServiceError::Unauthorized)));
    }

    #[test]
    fn load_index_page_returns_paginated_changes() {
        let mut repo = MockRuleChangeReader::new();
        let user = user_with_roles(&[SERVICE_ACCESS_ROLE]);
        let query = IndexQuery { page: Some(2) };

        let expected_hub = user.hub_id;

        repo.expect_list_rule_changes()
            .times(1)
            .withf(move |query| {
                assert_eq!(query.hub_id, expected_hub);
                match &query.pagination {
                    Some(pagination) => {
                        assert_eq!(pagination.page, 2);
                        assert_eq!(pagination.per_page, DEFAULT_ITEMS_PER_PAGE);
                    }
                    None => panic!("expected pagination to be set"),
                }
                true
            })
            .returning(move |_| {
                Ok((
                    30,
                    vec![
                        sample_change(1, expected_hub, "dining"),
                        sample_change(2, expected_hub, "travel"),
                    ],
                ))
            });

        let data = load_index_page(&repo, &user, query).expect("expected success");

        let serialized = match serde_json::to_value(&data.changes) {
            Ok(value) => value,
            Err(err) => panic!("serialization failed: {err}"),
        };

        let items = match serialized.get("items").and_then(|value| value.as_array()) {
            Some(items) => items,
            None => panic!("missing items field"),
        };
        assert_eq!(items.len(), 2);
    }
}
