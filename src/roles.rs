//! Semantic column roles and the synonym table used to discover them.
//!
//! Resolution is a lookup against [`DEFAULT_ROLE_SYNONYMS`]: for each role the
//! synonyms are tried in order and the first header (compared trimmed and
//! lower-cased) that equals one of them fills the role. A [`RoleTable`] can be
//! built from configuration to replace the synonyms of individual roles.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Revenue,
    Units,
    Margin,
    Date,
    Region,
    Channel,
    Product,
    Cost,
    Price,
}

impl Role {
    pub const ALL: [Role; 9] = [
        Role::Revenue,
        Role::Units,
        Role::Margin,
        Role::Date,
        Role::Region,
        Role::Channel,
        Role::Product,
        Role::Cost,
        Role::Price,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Revenue => "revenue",
            Role::Units => "units",
            Role::Margin => "margin",
            Role::Date => "date",
            Role::Region => "region",
            Role::Channel => "channel",
            Role::Product => "product",
            Role::Cost => "cost",
            Role::Price => "price",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Role::Revenue | Role::Units | Role::Margin | Role::Cost | Role::Price
        )
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const DEFAULT_ROLE_SYNONYMS: &[(Role, &[&str])] = &[
    (Role::Revenue, &["revenue", "sales", "amount"]),
    (Role::Units, &["units", "quantity"]),
    (Role::Margin, &["margin", "margin%", "gross_margin"]),
    (Role::Date, &["date"]),
    (Role::Region, &["region"]),
    (Role::Channel, &["channel"]),
    (Role::Product, &["product"]),
    (Role::Cost, &["cost", "cogs"]),
    (Role::Price, &["price", "unit_price"]),
];

/// Ordered synonyms per role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleTable {
    entries: Vec<(Role, Vec<String>)>,
}

impl Default for RoleTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_ROLE_SYNONYMS
                .iter()
                .map(|(role, synonyms)| (*role, synonyms.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

impl RoleTable {
    /// Replaces the synonyms of the given roles, keeping the defaults for the rest.
    pub fn with_overrides(overrides: &BTreeMap<Role, Vec<String>>) -> Self {
        let mut table = Self::default();
        for (role, synonyms) in &mut table.entries {
            if let Some(custom) = overrides.get(role) {
                *synonyms = custom
                    .iter()
                    .map(|s| s.trim().to_ascii_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }
        table
    }

    pub fn synonyms(&self, role: Role) -> &[String] {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, synonyms)| synonyms.as_slice())
            .unwrap_or_default()
    }

    pub fn resolve(&self, headers: &[String]) -> ColumnRoleMap {
        let lowered = headers
            .iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .collect::<Vec<_>>();
        let mut resolved = BTreeMap::new();
        for (role, synonyms) in &self.entries {
            let hit = synonyms.iter().find_map(|synonym| {
                lowered
                    .iter()
                    .position(|header| header == synonym)
                    .map(|index| ResolvedColumn {
                        name: headers[index].clone(),
                        index,
                    })
            });
            if let Some(column) = hit {
                resolved.insert(*role, column);
            }
        }
        ColumnRoleMap { resolved }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedColumn {
    pub name: String,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ColumnRoleMap {
    resolved: BTreeMap<Role, ResolvedColumn>,
}

impl ColumnRoleMap {
    pub fn get(&self, role: Role) -> Option<&ResolvedColumn> {
        self.resolved.get(&role)
    }

    pub fn index(&self, role: Role) -> Option<usize> {
        self.resolved.get(&role).map(|c| c.index)
    }

    pub fn column_name(&self, role: Role) -> Option<&str> {
        self.resolved.get(&role).map(|c| c.name.as_str())
    }

    pub fn has(&self, role: Role) -> bool {
        self.resolved.contains_key(&role)
    }

    /// Role filled by the column at `index`, if any.
    pub fn role_of(&self, index: usize) -> Option<Role> {
        self.resolved
            .iter()
            .find(|(_, column)| column.index == index)
            .map(|(role, _)| *role)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, &ResolvedColumn)> {
        self.resolved.iter().map(|(role, column)| (*role, column))
    }
}

pub fn resolve_roles(headers: &[String]) -> ColumnRoleMap {
    RoleTable::default().resolve(headers)
}
