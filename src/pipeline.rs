//! Dashboard state: the current dataset snapshot and the result derived from it.
//!
//! A load replaces the whole snapshot; nothing derived from a previous
//! dataset survives it. Loads are stamped with a generation so that when
//! several are in flight only the most recently started one is installed.

use std::{path::Path, sync::Arc};

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    aggregate::{self, AggregateSeries, CohortGrid, Forecast, FunnelStages, KpiSnapshot},
    config::DashboardConfig,
    data::{self, Dataset, MarginMode, NormalizedRow},
    error::Result,
    filter::{self, FilterCriteria},
    io_utils,
    roles::{ColumnRoleMap, Role, RoleTable},
    tokenizer,
};

pub const SAMPLE_DATA_PATH: &str = "sample-data.csv";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub generation: u64,
    pub kpis: KpiSnapshot,
    pub headers: Vec<String>,
    pub roles: ColumnRoleMap,
    pub margin_mode: MarginMode,
    pub rows: Vec<NormalizedRow>,
    pub time_series: AggregateSeries,
    pub by_region: AggregateSeries,
    pub by_product: AggregateSeries,
    pub funnel: AggregateSeries,
    pub forecast: Forecast,
    pub cohorts: CohortGrid,
}

impl PipelineResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Same header lookup as [`Dataset::column_index`].
    pub fn column_index(&self, name: &str) -> Option<usize> {
        data::header_position(&self.headers, name)
    }
}

/// Runs filter and aggregation over one dataset snapshot.
pub fn run_pipeline(
    dataset: &Dataset,
    criteria: &FilterCriteria,
    config: &DashboardConfig,
    generation: u64,
) -> Result<PipelineResult> {
    let roles = &dataset.roles;
    let rows = filter::filter(&dataset.rows, roles, criteria);
    let kpis = aggregate::kpis(&rows, roles, dataset.margin_mode);
    let time_series = aggregate::revenue_by_date(&rows, roles);
    let forecast = aggregate::forecast(&time_series, config.forecast_window)?;
    debug!(
        "Pipeline generation {generation}: {} of {} row(s) after filtering",
        rows.len(),
        dataset.len()
    );
    Ok(PipelineResult {
        generation,
        kpis,
        headers: dataset.headers.clone(),
        roles: roles.clone(),
        margin_mode: dataset.margin_mode,
        by_region: aggregate::revenue_by(&rows, roles, Role::Region),
        by_product: aggregate::revenue_by(&rows, roles, Role::Product),
        funnel: FunnelStages::from_units(kpis.total_units).as_series(),
        cohorts: aggregate::cohort_grid(
            &rows,
            roles,
            config.cohort_regions,
            config.cohort_months,
        ),
        time_series,
        forecast,
        rows,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    generation: u64,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct Dashboard {
    config: DashboardConfig,
    role_table: RoleTable,
    criteria: FilterCriteria,
    snapshot: Option<Arc<Dataset>>,
    issued: u64,
    installed: u64,
}

impl Default for Dashboard {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            role_table: config.role_table(),
            config,
            criteria: FilterCriteria::default(),
            snapshot: None,
            issued: 0,
            installed: 0,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn snapshot(&self) -> Option<Arc<Dataset>> {
        self.snapshot.clone()
    }

    pub fn generation(&self) -> u64 {
        self.installed
    }

    /// Starts a load; any ticket issued earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket {
            generation: self.issued,
        }
    }

    /// Installs `text` as the new dataset if `ticket` is still the latest
    /// load. Returns `Ok(None)` for a stale ticket, leaving state untouched.
    pub fn complete_load(
        &mut self,
        ticket: LoadTicket,
        text: &str,
    ) -> Result<Option<PipelineResult>> {
        if ticket.generation != self.issued {
            warn!(
                "Discarding stale load (generation {} superseded by {})",
                ticket.generation, self.issued
            );
            return Ok(None);
        }
        let parsed = tokenizer::parse(text)?;
        let dataset = Dataset::from_parsed(parsed, &self.role_table);
        for (role, column) in dataset.roles.iter() {
            debug!("Role {role} -> column '{}'", column.name);
        }
        info!(
            "Loaded {} row(s) across {} column(s); margin mode {:?}",
            dataset.len(),
            dataset.headers.len(),
            dataset.margin_mode
        );
        self.snapshot = Some(Arc::new(dataset));
        self.installed = ticket.generation;
        self.result().map(Some)
    }

    pub fn load_text(&mut self, text: &str) -> Result<PipelineResult> {
        let ticket = self.begin_load();
        match self.complete_load(ticket, text)? {
            Some(result) => Ok(result),
            None => self.result(),
        }
    }

    pub fn load_path(&mut self, path: &Path, encoding_label: Option<&str>) -> Result<PipelineResult> {
        let ticket = self.begin_load();
        let text = io_utils::read_input(path, encoding_label)?;
        match self.complete_load(ticket, &text)? {
            Some(result) => Ok(result),
            None => self.result(),
        }
    }

    /// Loads the bundled sample. Any failure leaves the dashboard as it was.
    pub fn load_sample(&mut self, path: &Path) -> Option<PipelineResult> {
        let ticket = self.begin_load();
        let outcome = io_utils::read_input(path, None)
            .and_then(|text| self.complete_load(ticket, &text));
        match outcome {
            Ok(result) => result,
            Err(err) => {
                warn!("Sample data unavailable from {path:?}: {err}");
                None
            }
        }
    }

    pub fn set_criteria(&mut self, criteria: FilterCriteria) -> Result<PipelineResult> {
        debug!("Applying filter criteria {criteria:?}");
        self.criteria = criteria;
        self.result()
    }

    pub fn clear_filters(&mut self) -> Result<PipelineResult> {
        self.set_criteria(FilterCriteria::default())
    }

    /// Recomputes the full result from the current snapshot.
    pub fn result(&self) -> Result<PipelineResult> {
        match &self.snapshot {
            Some(dataset) => run_pipeline(dataset, &self.criteria, &self.config, self.installed),
            None => {
                let empty = Dataset::from_parsed(tokenizer::ParsedCsv::default(), &self.role_table);
                run_pipeline(&empty, &self.criteria, &self.config, self.installed)
            }
        }
    }
}
