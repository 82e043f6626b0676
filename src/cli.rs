use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    filter::FilterCriteria,
    roles::Role,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Sales analytics over CSV files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print KPIs, chart series, funnel, forecast and cohort grid
    Summary(SummaryArgs),
    /// Print the filtered rows as a table
    Table(TableArgs),
    /// Write the filtered rows as CSV
    Export(ExportArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Input CSV file ('-' for stdin); without it the sample is tried and may be absent
    #[arg(short = 'i', long = "input", conflicts_with = "sample")]
    pub input: Option<PathBuf>,
    /// Load ./sample-data.csv and fail if it cannot be read
    #[arg(long)]
    pub sample: bool,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// YAML dashboard configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Moving-average window for the forecast overlay (overrides config)
    #[arg(long)]
    pub window: Option<usize>,
}

#[derive(Debug, Args, Default)]
pub struct FilterArgs {
    /// Keep rows whose region equals this value
    #[arg(long)]
    pub region: Option<String>,
    /// Keep rows whose channel equals this value
    #[arg(long)]
    pub channel: Option<String>,
    /// Keep rows whose product equals this value
    #[arg(long)]
    pub product: Option<String>,
    /// Case-insensitive search across region, channel and product
    #[arg(short = 'q', long = "search")]
    pub search: Option<String>,
}

impl FilterArgs {
    pub fn criteria(&self) -> FilterCriteria {
        let mut criteria = FilterCriteria::new();
        for (role, value) in [
            (Role::Region, &self.region),
            (Role::Channel, &self.channel),
            (Role::Product, &self.product),
        ] {
            if let Some(value) = value {
                criteria = criteria.with_constraint(role, value.clone());
            }
        }
        if let Some(query) = &self.search {
            criteria = criteria.with_query(query.clone());
        }
        criteria
    }
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Emit the full pipeline result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct TableArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Column to sort by; repeat to simulate header clicks (second click on the same column sorts descending)
    #[arg(long = "sort", action = clap::ArgAction::Append)]
    pub sort: Vec<String>,
    /// Limit number of rows displayed
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub source: SourceArgs,
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Column to sort by; repeat to toggle direction
    #[arg(long = "sort", action = clap::ArgAction::Append)]
    pub sort: Vec<String>,
}
