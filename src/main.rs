use anyhow::Result;
use clap::Parser;
use dora_metrics::{init_telemetry, DoraMetricsConfig};

mod cli;

use cli::commands::report::ReportCommand;
use cli::commands::steps::StepsCommand;
use cli::commands::work_days::WorkDaysCommand;
use cli::commands::Command;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    DoraMetricsConfig::load_env_file()?;
    let config = DoraMetricsConfig::load(cli.config.as_deref())?;
    init_telemetry(&config.observability.log_level)?;

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Commands::Report { request, pretty } => runtime.block_on(async {
            ReportCommand::new(request)
                .with_pretty(pretty)
                .execute(&config)
                .await
        }),
        Commands::WorkDays {
            start,
            end,
            timezone,
            calendar,
        } => runtime.block_on(async {
            WorkDaysCommand {
                start,
                end,
                timezone,
                calendar,
            }
            .execute(&config)
            .await
        }),
        Commands::Steps {
            org,
            pipeline,
            start,
            end,
            until,
            branches,
        } => runtime.block_on(async {
            StepsCommand {
                org,
                pipeline,
                start,
                end,
                until,
                branches,
            }
            .execute(&config)
            .await
        }),
    }
}
