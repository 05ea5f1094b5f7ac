//! The report run: fetch a date span, aggregate it per day, merge the days
//! into the report file, and describe the result for the operator.

use std::fmt;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use wbreport_core::{aggregate_range, format_display_date, ConfigError, DailyAggregate};
use wbreport_sheet::{ReportStore, SheetError, UpsertOutcome};
use wbreport_stats::{FailureKind, Sleeper, StatsClient, StatsError};

/// Detail lines shown before the rest are collapsed into a count.
const MAX_DETAIL_LINES: usize = 10;

/// `wb_data_<timestamp>.xlsx` inside `dir`.
pub(crate) fn timestamped_path(dir: &Path, now: NaiveDateTime) -> PathBuf {
    dir.join(format!("wb_data_{}.xlsx", now.format("%Y-%m-%d_%H-%M-%S")))
}

pub(crate) fn span_label(from: NaiveDate, to: NaiveDate) -> String {
    if from == to {
        format_display_date(from)
    } else {
        format!("{} - {}", format_display_date(from), format_display_date(to))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RunSummary {
    pub processed: usize,
    pub added: usize,
    pub updated: usize,
    pub details: Vec<String>,
    /// Days in the span without any sales.
    pub missing: Vec<NaiveDate>,
    pub path: PathBuf,
}

fn detail_line(agg: &DailyAggregate) -> String {
    format!(
        "{}: {} sales, {} articles, revenue {:.2}",
        agg.display_date(),
        agg.sales_count,
        agg.article_count(),
        agg.revenue
    )
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in &self.missing {
            writeln!(f, "no data for {}", format_display_date(*day))?;
        }
        writeln!(f, "sales processed: {}", self.processed)?;
        writeln!(f, "rows added: {}", self.added)?;
        writeln!(f, "rows updated: {}", self.updated)?;
        if !self.details.is_empty() {
            writeln!(f, "details (first {MAX_DETAIL_LINES}):")?;
            for line in self.details.iter().take(MAX_DETAIL_LINES) {
                writeln!(f, "  {line}")?;
            }
            if self.details.len() > MAX_DETAIL_LINES {
                writeln!(f, "  ... and {} more", self.details.len() - MAX_DETAIL_LINES)?;
            }
        }
        write!(f, "file: {}", self.path.display())
    }
}

/// Runs one report for `from..=to`.
///
/// The report file is bootstrapped even when no day has sales, so every
/// run leaves a file behind.
///
/// # Errors
///
/// Returns an error if the span is inverted, a required statistics feed
/// fails, or the report cannot be written.
pub(crate) async fn run_report<S: Sleeper>(
    client: &StatsClient<S>,
    store: &ReportStore,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<RunSummary> {
    anyhow::ensure!(from <= to, "range start {from} is after its end {to}");

    let sources = client.fetch_period(from, to).await?;
    let aggregates = aggregate_range(&sources, from, to);

    store.ensure_exists()?;
    let outcomes = if aggregates.is_empty() {
        Vec::new()
    } else {
        store.upsert_all(&aggregates, None)?
    };

    let missing = from
        .iter_days()
        .take_while(|day| *day <= to)
        .filter(|day| aggregates.iter().all(|agg| agg.date != *day))
        .collect();

    let summary = RunSummary {
        processed: aggregates.iter().map(|agg| agg.sales_count).sum(),
        added: outcomes
            .iter()
            .filter(|o| matches!(o, UpsertOutcome::Appended(_)))
            .count(),
        updated: outcomes
            .iter()
            .filter(|o| matches!(o, UpsertOutcome::Updated(_)))
            .count(),
        details: aggregates.iter().map(detail_line).collect(),
        missing,
        path: store.path().to_path_buf(),
    };

    tracing::info!(
        processed = summary.processed,
        added = summary.added,
        updated = summary.updated,
        path = %summary.path.display(),
        "report run complete"
    );
    Ok(summary)
}

/// Operator-facing message for a failed run.
pub(crate) fn describe_failure(err: &anyhow::Error) -> String {
    if let Some(stats) = err.downcast_ref::<StatsError>() {
        return match stats.kind() {
            FailureKind::RateLimited => "Wildberries API rate limit exceeded. \
                 Wait a minute and run the report again."
                .to_string(),
            FailureKind::Auth => {
                "Authorization failed. Check that WB_API_KEY is valid and has statistics access."
                    .to_string()
            }
            FailureKind::Timeout => "Timed out waiting for the Wildberries API. \
                 Try again later or check the network connection."
                .to_string(),
            FailureKind::BadRequest => format!("The statistics API rejected the request: {stats}"),
            FailureKind::Other => format!("Fetching statistics failed: {stats}"),
        };
    }
    if let Some(config) = err.downcast_ref::<ConfigError>() {
        return format!("Configuration error: {config}. Check the .env file or environment.");
    }
    if let Some(sheet) = err.downcast_ref::<SheetError>() {
        return format!("Could not update the report file: {sheet}");
    }
    format!("Report run failed: {err:#}")
}

/// Prints a message for the operator. If stdout is gone the message is only
/// logged.
pub(crate) fn notify(message: &str) {
    let mut out = std::io::stdout().lock();
    if let Err(err) = writeln!(out, "{message}").and_then(|()| out.flush()) {
        tracing::error!(error = %err, message, "could not deliver message to operator");
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
