use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use dora_metrics::CalendarVariant;
use std::path::PathBuf;

pub mod commands;

#[derive(Parser)]
#[command(name = "dora-metrics")]
#[command(version)]
#[command(about = "Delivery performance metrics from CI pipelines and pull requests")]
#[command(long_about = "dora-metrics reads pipeline runs from Buildkite and pull requests from GitHub \
                       over a time window and reports deployment frequency, change failure rate, \
                       mean time to recovery and lead time for changes.")]
pub struct Cli {
    /// Configuration file (defaults to ./dora-metrics.toml when present)
    #[arg(long, global = true, help = "Path to a dora-metrics TOML configuration file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate a metrics report for the pipelines described in a request file
    Report {
        /// Request file, TOML or JSON
        #[arg(long, help = "Report request (.toml or .json) naming the window and pipelines")]
        request: PathBuf,
        /// Pretty-print the JSON report
        #[arg(long, help = "Indent the JSON output")]
        pretty: bool,
    },
    /// Count work days between two instants
    WorkDays {
        #[arg(long, help = "Start of the range (RFC 3339)")]
        start: DateTime<Utc>,
        #[arg(long, help = "End of the range (RFC 3339)")]
        end: DateTime<Utc>,
        #[arg(long, default_value = "UTC", help = "Fixed UTC offset for day boundaries, e.g. +08:00")]
        timezone: String,
        #[arg(long, default_value = "regular", help = "Holiday calendar: regular, cn, vn")]
        calendar: CalendarVariant,
    },
    /// List the step names seen in a pipeline's runs
    Steps {
        #[arg(long, help = "Buildkite organization slug")]
        org: String,
        #[arg(long, help = "Buildkite pipeline slug")]
        pipeline: String,
        #[arg(long, help = "Start of the range (RFC 3339)")]
        start: DateTime<Utc>,
        #[arg(long, help = "End of the range (RFC 3339)")]
        end: DateTime<Utc>,
        /// Stop the listing at this step (inclusive)
        #[arg(long, help = "Only list steps up to and including this one")]
        until: Option<String>,
        #[arg(long = "branch", help = "Restrict to runs on this branch (repeatable)")]
        branches: Vec<String>,
    },
}
