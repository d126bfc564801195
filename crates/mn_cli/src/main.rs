use anyhow::Context;
use clap::Parser;
use mn_classifier::Classifier;
use mn_collector::{
    handle_command, init_logging, report_reclassify, Collector, CollectorCommands, Logger,
    NaverNewsClient, Reclassifier,
};
use mn_core::{ClassifierConfig, CollectorConfig, NaverConfig};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HumanDuration(Duration);

impl FromStr for HumanDuration {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut total_seconds = 0u64;
        let mut current_number = String::new();
        let mut has_unit = false;

        for c in s.chars() {
            if c.is_ascii_digit() {
                current_number.push(c);
            } else if let Ok(num) = current_number.parse::<u64>() {
                let unit = match c {
                    's' => 1,
                    'm' => 60,
                    'h' => 3600,
                    'd' => 86400,
                    _ => return Err(format!("Invalid duration unit: {}", c)),
                };
                total_seconds = num
                    .checked_mul(unit)
                    .and_then(|secs| total_seconds.checked_add(secs))
                    .ok_or_else(|| format!("Duration too large: {}", s))?;
                current_number.clear();
                has_unit = true;
            } else if !c.is_whitespace() {
                return Err(format!("Invalid character in duration: {}", c));
            }
        }

        // Bare number means seconds
        if !current_number.is_empty() {
            let num = current_number
                .parse::<u64>()
                .map_err(|_| "Invalid number in duration".to_string())?;
            total_seconds = total_seconds
                .checked_add(num)
                .ok_or_else(|| format!("Duration too large: {}", s))?;
            has_unit = true;
        }

        if !has_unit {
            return Err("Duration must include a number".to_string());
        }
        if total_seconds == 0 {
            return Err("Duration must be greater than zero".to_string());
        }

        Ok(HumanDuration(Duration::from_secs(total_seconds)))
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Medical news collector", long_about = None)]
struct Cli {
    /// Storage backend: sqlite or memory
    #[arg(long, default_value = "sqlite")]
    storage: String,
    /// SQLite database file
    #[arg(long, env = "MN_DATABASE", default_value = "data/medical_news.db")]
    database: String,
    #[arg(long, env = "NAVER_CLIENT_ID", hide_env_values = true)]
    client_id: Option<String>,
    #[arg(long, env = "NAVER_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,
    /// Override the news search endpoint
    #[arg(long, env = "NAVER_NEWS_URL")]
    base_url: Option<String>,
    /// JSON file replacing the built-in keyword tables
    #[arg(long)]
    keywords: Option<PathBuf>,
    /// Pause between backfill pages, in milliseconds
    #[arg(long, default_value_t = 500)]
    page_delay_ms: u64,
    /// Repeat `collect` on this interval (e.g. 1h, 30m, 1h15m)
    #[arg(long)]
    interval: Option<HumanDuration>,
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: CollectorCommands,
}

impl Cli {
    fn naver_config(&self) -> anyhow::Result<NaverConfig> {
        let config = NaverConfig::new(
            self.client_id.clone().unwrap_or_default(),
            self.client_secret.clone().unwrap_or_default(),
        )?;
        Ok(match &self.base_url {
            Some(url) => config.with_base_url(url)?,
            None => config,
        })
    }

    fn classifier_config(&self) -> anyhow::Result<ClassifierConfig> {
        let config = match &self.keywords {
            Some(path) => ClassifierConfig::from_json_file(path)
                .with_context(|| format!("Failed to load keywords from {}", path.display()))?,
            None => ClassifierConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    fn collector_config(&self) -> CollectorConfig {
        CollectorConfig {
            page_delay: Duration::from_millis(self.page_delay_ms),
            ..CollectorConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let logger = init_logging(cli.verbose);
    run(cli, logger).await
}

async fn run(cli: Cli, logger: Logger) -> anyhow::Result<()> {
    if cli.interval.is_some() && !matches!(cli.command, CollectorCommands::Collect { .. }) {
        anyhow::bail!("--interval only applies to the collect command");
    }

    let classifier = Classifier::new(cli.classifier_config()?);
    info!("🩺 Classifier ready with {} keywords", classifier.keyword_count());

    // Reclassification only touches stored articles, so it needs no credentials.
    if let CollectorCommands::Reclassify = cli.command {
        let storage = mn_storage::create_storage(&cli.storage, Some(cli.database.as_str())).await?;
        let summary = Reclassifier::new(classifier, storage)
            .with_logger(logger.clone())
            .run()
            .await?;
        report_reclassify(&logger, &summary);
        return Ok(());
    }

    let search = Arc::new(NaverNewsClient::new(cli.naver_config()?)?);
    let storage = mn_storage::create_storage(&cli.storage, Some(cli.database.as_str())).await?;
    let collector = Collector::new(search, classifier, storage, cli.collector_config())
        .with_logger(logger);

    match (&cli.command, cli.interval) {
        (CollectorCommands::Collect { .. }, Some(interval)) => {
            info!("⏰ Running in periodic mode every {}s", interval.0.as_secs());
            loop {
                if let Err(e) = handle_command(&cli.command, &collector).await {
                    error!("Collection cycle failed: {}", e);
                }
                info!("Waiting {}s before next collection", interval.0.as_secs());
                tokio::time::sleep(interval.0).await;
            }
        }
        (command, _) => {
            handle_command(command, &collector).await?;
        }
    }

    Ok(())
}
