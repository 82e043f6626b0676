use serde::{Deserialize, Serialize};

use crate::{
    data::NormalizedRow,
    roles::{ColumnRoleMap, Role},
};

/// Roles whose values make up the free-text search haystack.
const SEARCH_ROLES: [Role; 3] = [Role::Region, Role::Channel, Role::Product];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EqualityConstraint {
    pub role: Role,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub constraints: Vec<EqualityConstraint>,
    pub query: Option<String>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_constraint(mut self, role: Role, value: impl Into<String>) -> Self {
        self.constraints.push(EqualityConstraint {
            role,
            value: value.into(),
        });
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    fn active_constraints(&self) -> impl Iterator<Item = &EqualityConstraint> {
        self.constraints.iter().filter(|c| !c.value.is_empty())
    }

    fn normalized_query(&self) -> Option<String> {
        self.query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.active_constraints().next().is_none() && self.normalized_query().is_none()
    }

    pub fn matches(&self, row: &NormalizedRow, roles: &ColumnRoleMap) -> bool {
        self.matches_with_query(row, roles, self.normalized_query().as_deref())
    }

    fn matches_with_query(
        &self,
        row: &NormalizedRow,
        roles: &ColumnRoleMap,
        query: Option<&str>,
    ) -> bool {
        for constraint in self.active_constraints() {
            if row.text(roles, constraint.role) != constraint.value {
                return false;
            }
        }
        if let Some(query) = query {
            let haystack = SEARCH_ROLES
                .iter()
                .map(|role| row.text(roles, *role))
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase();
            if !haystack.contains(query) {
                return false;
            }
        }
        true
    }
}

/// Returns the rows satisfying every constraint and the query, in input order.
pub fn filter(
    rows: &[NormalizedRow],
    roles: &ColumnRoleMap,
    criteria: &FilterCriteria,
) -> Vec<NormalizedRow> {
    let query = criteria.normalized_query();
    rows.iter()
        .filter(|row| criteria.matches_with_query(row, roles, query.as_deref()))
        .cloned()
        .collect()
}
