//! Dashboard configuration loaded from YAML.
//!
//! ```yaml
//! forecast_window: 5
//! cohort_regions: 3
//! roles:
//!   revenue: [net_sales, revenue]
//! ```

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    aggregate::{COHORT_MAX_MONTHS, COHORT_MAX_REGIONS},
    error::{DashboardError, Result},
    roles::{Role, RoleTable},
    rolling::DEFAULT_WINDOW,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardConfig {
    pub forecast_window: usize,
    pub cohort_regions: usize,
    pub cohort_months: usize,
    pub roles: BTreeMap<Role, Vec<String>>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            forecast_window: DEFAULT_WINDOW,
            cohort_regions: COHORT_MAX_REGIONS,
            cohort_months: COHORT_MAX_MONTHS,
            roles: BTreeMap::new(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| DashboardError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&contents).map_err(|err| match err {
            DashboardError::Config { message, .. } => DashboardError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents).map_err(|err| DashboardError::Config {
            path: Default::default(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.forecast_window == 0 {
            return Err(DashboardError::InvalidArgument(
                "forecast_window must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn role_table(&self) -> RoleTable {
        RoleTable::with_overrides(&self.roles)
    }
}
