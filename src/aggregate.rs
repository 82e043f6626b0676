//! Grouping, reduction and the derived series behind each dashboard panel.
//!
//! Everything here is a pure function of the filtered rows. Groups keep the
//! order in which their keys were first seen; NaN cells count as zero in sums
//! and are left out of averages.

use std::collections::HashMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{
    data::{MarginMode, NormalizedRow, format_date, month_of},
    error::Result,
    roles::{ColumnRoleMap, Role},
    rolling,
};

pub const COHORT_MAX_REGIONS: usize = 4;
pub const COHORT_MAX_MONTHS: usize = 6;

// Funnel stage estimates, scaled from purchases (total units).
pub const CHECKOUT_MULTIPLIER: f64 = 1.4;
pub const ADD_TO_CART_MULTIPLIER: f64 = 2.2;
pub const VISITS_MULTIPLIER: f64 = 5.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateSeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

impl AggregateSeries {
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn labels(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.label.as_str()).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn total(&self) -> f64 {
        sum(self.points.iter().map(|p| p.value))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn sorted_by_label(mut self) -> Self {
        self.points.sort_by(|a, b| a.label.cmp(&b.label));
        self
    }
}

pub fn sum(values: impl IntoIterator<Item = f64>) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

/// Mean of the non-NaN values; NaN when there are none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> f64 {
    let (total, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(total, count), v| (total + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        total / count as f64
    }
}

pub fn group_and_reduce<K, R>(rows: &[NormalizedRow], mut key_fn: K, mut reduce_fn: R) -> AggregateSeries
where
    K: FnMut(&NormalizedRow) -> String,
    R: FnMut(&[&NormalizedRow]) -> f64,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, Vec<&NormalizedRow>)> = Vec::new();
    for row in rows {
        let key = key_fn(row);
        match positions.get(&key) {
            Some(&idx) => buckets[idx].1.push(row),
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push((key, vec![row]));
            }
        }
    }
    AggregateSeries {
        name: String::new(),
        points: buckets
            .into_iter()
            .map(|(label, bucket)| SeriesPoint {
                value: reduce_fn(&bucket),
                label,
            })
            .collect(),
    }
}

fn sum_role(bucket: &[&NormalizedRow], roles: &ColumnRoleMap, role: Role) -> f64 {
    sum(bucket.iter().map(|row| row.number(roles, role)))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarginKpi {
    pub mode: MarginMode,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiSnapshot {
    pub total_revenue: f64,
    pub total_units: f64,
    pub average_price: f64,
    pub margin: Option<MarginKpi>,
}

pub fn kpis(rows: &[NormalizedRow], roles: &ColumnRoleMap, mode: MarginMode) -> KpiSnapshot {
    let total_revenue = sum(rows.iter().map(|r| r.number(roles, Role::Revenue)));
    let total_units = sum(rows.iter().map(|r| r.number(roles, Role::Units)));
    let margins = rows.iter().map(|r| r.margin(roles, mode));
    let margin = match mode {
        MarginMode::CurrencySum => Some(sum(margins)),
        MarginMode::PercentageAverage => Some(mean(margins)).filter(|v| !v.is_nan()),
        MarginMode::Unavailable => None,
    }
    .map(|value| MarginKpi { mode, value });
    KpiSnapshot {
        total_revenue,
        total_units,
        average_price: total_revenue / total_units.max(1.0),
        margin,
    }
}

/// Revenue per calendar day, labels ascending. Rows with an invalid date
/// share the empty label.
pub fn revenue_by_date(rows: &[NormalizedRow], roles: &ColumnRoleMap) -> AggregateSeries {
    if !roles.has(Role::Date) || !roles.has(Role::Revenue) {
        return AggregateSeries::default().named("Revenue");
    }
    group_and_reduce(
        rows,
        |row| format_date(row.date(roles)),
        |bucket| sum_role(bucket, roles, Role::Revenue),
    )
    .sorted_by_label()
    .named("Revenue")
}

/// Revenue per distinct value of a categorical role, in first-seen order.
pub fn revenue_by(rows: &[NormalizedRow], roles: &ColumnRoleMap, role: Role) -> AggregateSeries {
    let name = format!("Revenue by {}", capitalize(role.as_str()));
    if !roles.has(role) || !roles.has(Role::Revenue) {
        return AggregateSeries::default().named(name);
    }
    group_and_reduce(
        rows,
        |row| row.text(roles, role),
        |bucket| sum_role(bucket, roles, Role::Revenue),
    )
    .named(name)
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CohortGrid {
    pub regions: Vec<String>,
    pub months: Vec<u32>,
    /// `cells[r][m]` is the unit total for `regions[r]` in `months[m]`.
    pub cells: Vec<Vec<f64>>,
}

impl CohortGrid {
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty() || self.months.is_empty()
    }
}

pub fn cohort_grid(
    rows: &[NormalizedRow],
    roles: &ColumnRoleMap,
    max_regions: usize,
    max_months: usize,
) -> CohortGrid {
    if !roles.has(Role::Region) || !roles.has(Role::Date) || !roles.has(Role::Units) {
        return CohortGrid::default();
    }
    let regions = rows
        .iter()
        .map(|row| row.text(roles, Role::Region))
        .unique()
        .take(max_regions)
        .collect::<Vec<_>>();
    let months = rows
        .iter()
        .filter_map(|row| month_of(row.date(roles)))
        .unique()
        .take(max_months)
        .collect::<Vec<_>>();

    let mut cells = vec![vec![0.0; months.len()]; regions.len()];
    for row in rows {
        let Some(month) = month_of(row.date(roles)) else {
            continue;
        };
        let region = row.text(roles, Role::Region);
        if let (Some(r), Some(m)) = (
            regions.iter().position(|candidate| *candidate == region),
            months.iter().position(|candidate| *candidate == month),
        ) {
            let units = row.number(roles, Role::Units);
            if !units.is_nan() {
                cells[r][m] += units;
            }
        }
    }
    CohortGrid {
        regions,
        months,
        cells,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FunnelStages {
    pub visits: f64,
    pub add_to_cart: f64,
    pub checkout: f64,
    pub purchases: f64,
}

impl FunnelStages {
    pub fn from_units(total_units: f64) -> Self {
        let purchases = total_units.max(1.0);
        Self {
            visits: (purchases * VISITS_MULTIPLIER).round(),
            add_to_cart: (purchases * ADD_TO_CART_MULTIPLIER).round(),
            checkout: (purchases * CHECKOUT_MULTIPLIER).round(),
            purchases,
        }
    }

    pub fn as_series(&self) -> AggregateSeries {
        let points = [
            ("Visits", self.visits),
            ("Add to Cart", self.add_to_cart),
            ("Checkout", self.checkout),
            ("Purchases", self.purchases),
        ]
        .into_iter()
        .map(|(label, value)| SeriesPoint {
            label: label.to_string(),
            value,
        })
        .collect();
        AggregateSeries {
            name: "Funnel".to_string(),
            points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub window: usize,
    pub actual: AggregateSeries,
    pub moving_average: AggregateSeries,
}

/// Overlays a trailing moving average on a series.
pub fn forecast(series: &AggregateSeries, window: usize) -> Result<Forecast> {
    let averaged = rolling::rolling_average(&series.values(), window)?;
    let moving_average = AggregateSeries {
        name: format!("{window}-pt MA"),
        points: series
            .points
            .iter()
            .zip(averaged)
            .map(|(point, value)| SeriesPoint {
                label: point.label.clone(),
                value,
            })
            .collect(),
    };
    Ok(Forecast {
        window,
        actual: series.clone(),
        moving_average,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Dataset, roles::RoleTable};

    const SALES: &str = "date,region,channel,product,units,revenue,cost\n\
        2024-01-05,East,Online,Widget,10,100,60\n\
        2024-01-03,West,Retail,Gadget,5,50,20\n\
        2024-02-01,East,Retail,Widget,2,n/a,5\n\
        not-a-date,North,Online,Gizmo,1,10,4\n\
        2024-01-03,South,Online,Gadget,3,30,10\n";

    fn dataset() -> Dataset {
        Dataset::from_text(SALES, &RoleTable::default()).unwrap()
    }

    #[test]
    fn group_and_reduce_keeps_first_seen_order() {
        let data = dataset();
        let series = revenue_by(&data.rows, &data.roles, Role::Product);
        assert_eq!(series.name, "Revenue by Product");
        assert_eq!(series.labels(), vec!["Widget", "Gadget", "Gizmo"]);
        assert_eq!(series.values(), vec![100.0, 80.0, 10.0]);
    }

    #[test]
    fn revenue_by_date_sorts_labels_and_groups_invalid_dates() {
        let data = dataset();
        let series = revenue_by_date(&data.rows, &data.roles);
        assert_eq!(
            series.labels(),
            vec!["", "2024-01-03", "2024-01-05", "2024-02-01"]
        );
        assert_eq!(series.values(), vec![10.0, 80.0, 100.0, 0.0]);
    }

    #[test]
    fn kpis_treat_nan_as_zero_and_derive_margin() {
        let data = dataset();
        let kpi = kpis(&data.rows, &data.roles, data.margin_mode);
        assert_eq!(kpi.total_revenue, 190.0);
        assert_eq!(kpi.total_units, 21.0);
        assert!((kpi.average_price - 190.0 / 21.0).abs() < 1e-9);
        let margin = kpi.margin.unwrap();
        assert_eq!(margin.mode, MarginMode::CurrencySum);
        assert_eq!(margin.value, 40.0 + 30.0 + 6.0 + 20.0);
    }

    #[test]
    fn kpis_average_percentage_margin_column() {
        let data = Dataset::from_text(
            "revenue,units,margin%\n100,1,30%\n50,1,\n20,2,10%\n",
            &RoleTable::default(),
        )
        .unwrap();
        let kpi = kpis(&data.rows, &data.roles, data.margin_mode);
        let margin = kpi.margin.unwrap();
        assert_eq!(margin.mode, MarginMode::PercentageAverage);
        assert_eq!(margin.value, 20.0);
    }

    #[test]
    fn kpis_on_empty_rows_are_neutral() {
        let data = dataset();
        let kpi = kpis(&[], &data.roles, data.margin_mode);
        assert_eq!(kpi.total_revenue, 0.0);
        assert_eq!(kpi.total_units, 0.0);
        assert_eq!(kpi.average_price, 0.0);
    }

    #[test]
    fn missing_roles_give_empty_series() {
        let data = Dataset::from_text("units\n4\n", &RoleTable::default()).unwrap();
        assert!(revenue_by_date(&data.rows, &data.roles).is_empty());
        assert!(revenue_by(&data.rows, &data.roles, Role::Region).is_empty());
        assert!(cohort_grid(&data.rows, &data.roles, 4, 6).is_empty());
        assert_eq!(kpis(&data.rows, &data.roles, data.margin_mode).margin, None);
    }

    #[test]
    fn cohort_grid_caps_regions_and_months() {
        let data = dataset();
        let grid = cohort_grid(&data.rows, &data.roles, 2, 6);
        assert_eq!(grid.regions, vec!["East", "West"]);
        assert_eq!(grid.months, vec![1, 2]);
        assert_eq!(grid.cells, vec![vec![10.0, 2.0], vec![5.0, 0.0]]);
    }

    #[test]
    fn funnel_scales_from_units() {
        let stages = FunnelStages::from_units(15.0);
        assert_eq!(stages.purchases, 15.0);
        assert_eq!(stages.checkout, 21.0);
        assert_eq!(stages.add_to_cart, 33.0);
        assert_eq!(stages.visits, 83.0);
        assert_eq!(FunnelStages::from_units(0.0).purchases, 1.0);
        assert_eq!(
            stages.as_series().labels(),
            vec!["Visits", "Add to Cart", "Checkout", "Purchases"]
        );
    }

    #[test]
    fn forecast_overlays_moving_average() {
        let data = dataset();
        let series = revenue_by_date(&data.rows, &data.roles);
        let overlay = forecast(&series, 2).unwrap();
        assert_eq!(overlay.actual, series);
        assert_eq!(overlay.moving_average.values(), vec![10.0, 45.0, 90.0, 50.0]);
        assert!(forecast(&series, 0).is_err());
    }
}
