pub mod aggregate;
pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod filter;
pub mod format;
pub mod io_utils;
pub mod pipeline;
pub mod roles;
pub mod rolling;
pub mod table;
pub mod tokenizer;

use std::{env, path::Path, sync::OnceLock};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{LevelFilter, info};

use crate::{
    cli::{Cli, Commands, ExportArgs, SourceArgs, SummaryArgs, TableArgs},
    config::DashboardConfig,
    data::Value,
    pipeline::{Dashboard, PipelineResult, SAMPLE_DATA_PATH},
    table::SortState,
};

pub use crate::error::DashboardError;

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sales_dashboard", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => handle_summary(&args),
        Commands::Table(args) => handle_table(&args),
        Commands::Export(args) => handle_export(&args),
    }
}

fn build_dashboard(source: &SourceArgs) -> Result<Dashboard> {
    let mut config = match &source.config {
        Some(path) => DashboardConfig::load(path)
            .with_context(|| format!("Loading dashboard config from {path:?}"))?,
        None => DashboardConfig::default(),
    };
    if let Some(window) = source.window {
        config.forecast_window = window;
    }
    config.validate()?;

    let mut dashboard = Dashboard::new(config);
    match &source.input {
        Some(path) => {
            info!("Loading '{}'", path.display());
            dashboard
                .load_path(path, source.input_encoding.as_deref())
                .with_context(|| format!("Loading sales data from {path:?}"))?;
        }
        None if source.sample => {
            info!("Loading sample data from '{SAMPLE_DATA_PATH}'");
            dashboard
                .load_path(Path::new(SAMPLE_DATA_PATH), source.input_encoding.as_deref())
                .with_context(|| format!("Loading sample data from '{SAMPLE_DATA_PATH}'"))?;
        }
        None => {
            info!("Loading sample data from '{SAMPLE_DATA_PATH}'");
            dashboard.load_sample(Path::new(SAMPLE_DATA_PATH));
        }
    }
    Ok(dashboard)
}

fn resolve_sort(result: &PipelineResult, columns: &[String]) -> Result<SortState> {
    let mut sort = SortState::default();
    for name in columns.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
        let index = result
            .column_index(name)
            .ok_or_else(|| anyhow!("Column '{name}' not found for sort"))?;
        sort.click(index);
    }
    Ok(sort)
}

fn handle_summary(args: &SummaryArgs) -> Result<()> {
    let mut dashboard = build_dashboard(&args.source)?;
    let result = dashboard.set_criteria(args.filters.criteria())?;
    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Serializing pipeline result")?;
        println!("{json}");
        return Ok(());
    }
    if result.headers.is_empty() {
        println!("No data loaded.");
        return Ok(());
    }
    print!("{}", summary::render(&result));
    info!(
        "Summarized {} row(s) (generation {})",
        result.row_count(),
        result.generation
    );
    Ok(())
}

fn handle_table(args: &TableArgs) -> Result<()> {
    let mut dashboard = build_dashboard(&args.source)?;
    let result = dashboard.set_criteria(args.filters.criteria())?;
    if result.headers.is_empty() {
        println!("No data loaded.");
        return Ok(());
    }
    let sort = resolve_sort(&result, &args.sort)?;
    let mut rows = table::display_rows(&result, &sort);
    if let Some(limit) = args.limit {
        rows.truncate(limit);
    }
    table::print_table(&table::display_headers(&result), &rows);
    info!("Displayed {} of {} row(s)", rows.len(), result.row_count());
    Ok(())
}

fn handle_export(args: &ExportArgs) -> Result<()> {
    let mut dashboard = build_dashboard(&args.source)?;
    let result = dashboard.set_criteria(args.filters.criteria())?;
    if result.headers.is_empty() {
        info!("No data loaded; nothing to export");
        return Ok(());
    }
    let sort = resolve_sort(&result, &args.sort)?;
    let mut writer = io_utils::open_csv_writer(args.output.as_deref())?;
    let headers = table::display_headers(&result);
    let appended = headers.len() > result.headers.len();
    writer
        .write_record(&headers)
        .context("Writing output headers")?;
    for row in table::sorted_rows(&result.rows, &sort) {
        let mut record = row.values.iter().map(Value::as_display).collect::<Vec<_>>();
        if appended {
            record.push(
                row.derived_margin
                    .filter(|m| !m.is_nan())
                    .map(|m| m.to_string())
                    .unwrap_or_default(),
            );
        }
        writer.write_record(&record).context("Writing output row")?;
    }
    writer.flush().context("Flushing output")?;
    info!(
        "Exported {} row(s) to {}",
        result.row_count(),
        args.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "stdout".into())
    );
    Ok(())
}

mod summary {
    use std::fmt::Write as _;

    use crate::{
        aggregate::AggregateSeries,
        data::MarginMode,
        format,
        pipeline::PipelineResult,
        table::render_table,
    };

    fn strings<const N: usize>(values: [&str; N]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn series_rows(series: &AggregateSeries, value_fmt: fn(f64) -> String) -> Vec<Vec<String>> {
        series
            .points
            .iter()
            .map(|p| vec![p.label.clone(), value_fmt(p.value)])
            .collect()
    }

    pub(super) fn render(result: &PipelineResult) -> String {
        let mut out = String::new();
        let kpis = &result.kpis;
        let mut kpi_rows = vec![
            vec!["Revenue".to_string(), format::money(kpis.total_revenue)],
            vec!["Units".to_string(), format::count(kpis.total_units)],
            vec!["Avg price".to_string(), format::price(kpis.average_price)],
        ];
        match kpis.margin {
            Some(margin) if margin.mode == MarginMode::PercentageAverage => {
                kpi_rows.push(vec!["Avg margin".to_string(), format::percent(margin.value)]);
            }
            Some(margin) => kpi_rows.push(vec!["Margin".to_string(), format::money(margin.value)]),
            None => {}
        }
        section(&mut out, "KPIs", &strings(["metric", "value"]), &kpi_rows);

        let forecast = &result.forecast;
        let forecast_rows = forecast
            .actual
            .points
            .iter()
            .zip(&forecast.moving_average.points)
            .map(|(actual, average)| {
                vec![
                    actual.label.clone(),
                    format::money(actual.value),
                    format::money(average.value),
                ]
            })
            .collect::<Vec<_>>();
        let ma_header = forecast.moving_average.name.clone();
        section(
            &mut out,
            "Revenue over time",
            &["date".to_string(), "revenue".to_string(), ma_header],
            &forecast_rows,
        );
        section(
            &mut out,
            &result.by_region.name,
            &strings(["region", "revenue"]),
            &series_rows(&result.by_region, format::money),
        );
        section(
            &mut out,
            &result.by_product.name,
            &strings(["product", "revenue"]),
            &series_rows(&result.by_product, format::money),
        );
        section(
            &mut out,
            &result.funnel.name,
            &strings(["stage", "count"]),
            &series_rows(&result.funnel, format::count),
        );

        let cohorts = &result.cohorts;
        if !cohorts.is_empty() {
            let mut headers = vec!["region".to_string()];
            headers.extend(cohorts.months.iter().map(|m| format!("M{m}")));
            let rows = cohorts
                .regions
                .iter()
                .zip(&cohorts.cells)
                .map(|(region, cells)| {
                    let mut row = vec![region.clone()];
                    row.extend(cells.iter().map(|v| format::count(*v)));
                    row
                })
                .collect::<Vec<_>>();
            section(&mut out, "Units by region and month", &headers, &rows);
        }
        out
    }

    fn section(out: &mut String, title: &str, headers: &[String], rows: &[Vec<String>]) {
        let _ = writeln!(out, "== {title}");
        if rows.is_empty() {
            let _ = writeln!(out, "(no data)\n");
            return;
        }
        let _ = writeln!(out, "{}", render_table(headers, rows));
    }
}
