mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Days, Local, NaiveDate};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wbreport_core::AppConfig;
use wbreport_sheet::ReportStore;
use wbreport_stats::StatsClient;

#[derive(Debug, Parser)]
#[command(name = "wbreport")]
#[command(about = "Merge Wildberries seller statistics into spreadsheet reports")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch statistics for one day and merge them into a report
    Parse {
        /// Day to report (YYYY-MM-DD or DD.MM.YYYY); defaults to today
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        /// Update this report in place instead of creating a new one
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Fetch statistics for an inclusive date range
    Range {
        /// First day; defaults to yesterday
        #[arg(long, value_parser = parse_date)]
        from: Option<NaiveDate>,

        /// Last day; defaults to today
        #[arg(long, value_parser = parse_date)]
        to: Option<NaiveDate>,

        /// Update this report in place instead of creating a new one
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Check that the statistics API accepts the configured key
    Ping,
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    wbreport_core::normalize_date(raw)
        .ok_or_else(|| format!("'{raw}' is not a date; use YYYY-MM-DD or DD.MM.YYYY"))
}

/// Resolves the requested days against `today`.
fn date_span(command: &Commands, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    match command {
        Commands::Parse { date, .. } => {
            let day = date.unwrap_or(today);
            Some((day, day))
        }
        Commands::Range { from, to, .. } => {
            let to = to.unwrap_or(today);
            let from =
                from.unwrap_or_else(|| today.checked_sub_days(Days::new(1)).unwrap_or(today));
            Some((from, to))
        }
        Commands::Ping => None,
    }
}

async fn run(command: Commands, config: &AppConfig) -> anyhow::Result<()> {
    let client = StatsClient::from_config(config)?;

    let Some((from, to)) = date_span(&command, Local::now().date_naive()) else {
        client.ping().await?;
        report::notify("statistics API accepted the key");
        return Ok(());
    };

    let output = match command {
        Commands::Parse { output, .. } | Commands::Range { output, .. } => output,
        Commands::Ping => None,
    };
    let path = output.unwrap_or_else(|| {
        report::timestamped_path(&config.output_dir, Local::now().naive_local())
    });
    let store = ReportStore::from_config(config, path);

    report::notify(&format!("fetching statistics for {}", report::span_label(from, to)));
    let summary = report::run_report(&client, &store, from, to).await?;
    report::notify(&summary.to_string());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match wbreport_core::load_app_config() {
        Ok(config) => config,
        Err(err) => {
            report::notify(&report::describe_failure(&err.into()));
            return Ok(ExitCode::FAILURE);
        }
    };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match run(cli.command, &config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "report run failed");
            report::notify(&report::describe_failure(&err));
            Ok(ExitCode::FAILURE)
        }
    }
}
