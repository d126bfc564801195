use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Subcommand;
use mn_core::{ArticleRepository, BackfillWindow, ReclassifySummary, Result, RunSummary};

use crate::logging::Logger;
use crate::manager::Collector;

#[derive(Subcommand, Debug, Clone)]
pub enum CollectorCommands {
    /// Collect the latest articles for the live queries
    Collect {
        /// Article budget for this run (defaults to the configured budget)
        #[arg(short, long)]
        max_articles: Option<usize>,
    },
    /// Walk back through a date range for the backfill queries
    Backfill {
        /// Number of days before now to cover
        #[arg(short, long, default_value_t = 7)]
        days: u32,
        /// First day to cover (YYYY-MM-DD), overrides --days
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Last day to cover (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<NaiveDate>,
    },
    /// Re-run the classifier over stored medical articles
    Reclassify,
}

/// Resolves backfill arguments into a window. Explicit dates cover whole UTC days.
pub fn backfill_window(days: u32, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Result<BackfillWindow> {
    let now = Utc::now();
    match (from, to) {
        (None, None) => Ok(BackfillWindow::last_days(days, now)),
        (from, to) => {
            let end = match to {
                Some(day) => Utc.from_utc_datetime(&day.and_time(end_of_day())),
                None => now,
            };
            let start = match from {
                Some(day) => Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
                None => BackfillWindow::last_days(days, end).start,
            };
            BackfillWindow::new(start, end)
        }
    }
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
}

pub async fn handle_command<S: ArticleRepository + ?Sized>(
    command: &CollectorCommands,
    collector: &Collector<S>,
) -> Result<()> {
    let logger = Logger::new();
    match command {
        CollectorCommands::Collect { max_articles } => {
            let max = max_articles.unwrap_or(collector.config().max_articles);
            let outcome = collector.collect_bounded(max).await;
            report_run(&logger, "📊 Collection", outcome)
        }
        CollectorCommands::Backfill { days, from, to } => {
            let window = backfill_window(*days, *from, *to)?;
            let outcome = collector.collect_historical(window).await;
            report_run(&logger, "📊 Backfill", outcome)
        }
        CollectorCommands::Reclassify => {
            let summary = collector.reclassify().await?;
            report_reclassify(&logger, &summary);
            Ok(())
        }
    }
}

pub fn report_reclassify(logger: &Logger, summary: &ReclassifySummary) {
    logger.info(&format!("📊 Reclassified {} articles", summary.updated));
    for (category, count) in &summary.by_category {
        logger.info(&format!("  {}: {}", category, count));
    }
}

fn report_run(logger: &Logger, label: &str, outcome: Result<RunSummary>) -> Result<()> {
    match outcome {
        Ok(summary) => {
            logger.info(&format!("{} finished: {}", label, summary));
            Ok(())
        }
        Err(e) => {
            if let Some(partial) = e.partial_summary() {
                logger.error(&format!("{} aborted, partial result: {}", label, partial));
            }
            Err(e)
        }
    }
}
