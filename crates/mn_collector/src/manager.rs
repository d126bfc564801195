use mn_classifier::Classifier;
use mn_core::{
    ArticleFilter, ArticleRepository, ArticleSink, BackfillWindow, ClassifiedArticle,
    CollectorConfig, Error, ReclassifySummary, Result, RunSummary,
};
use std::sync::Arc;
use tokio::time::sleep;

use crate::logging::Logger;
use crate::pagination::{FilteredPage, PageState, Paginator};
use crate::search::{self, NewsSearch};

/// Drives fetch, classify and persist for live and backfill runs.
///
/// Generic over the sink so it can hold either a concrete backend or an
/// `Arc<dyn ArticleRepository>` handed out by the storage factory.
pub struct Collector<S: ArticleSink + ?Sized> {
    search: Arc<dyn NewsSearch>,
    classifier: Classifier,
    sink: Arc<S>,
    config: CollectorConfig,
    paginator: Paginator,
    logger: Logger,
}

impl<S: ArticleSink + ?Sized> Collector<S> {
    pub fn new(
        search: Arc<dyn NewsSearch>,
        classifier: Classifier,
        sink: Arc<S>,
        config: CollectorConfig,
    ) -> Self {
        let paginator = Paginator::new(config.page_size, config.max_start);
        Self {
            search,
            classifier,
            sink,
            config,
            paginator,
            logger: Logger::new(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// One live run with the configured article budget.
    pub async fn collect_live(&self) -> Result<RunSummary> {
        self.collect_bounded(self.config.max_articles).await
    }

    pub async fn collect_bounded(&self, max_articles: usize) -> Result<RunSummary> {
        let logger = self.logger.clone().with_prefix("[live]".to_string());
        logger.info(&format!("🚀 Collecting up to {} articles", max_articles));

        let candidates =
            search::collect_bounded(self.search.as_ref(), &self.config.live_queries, max_articles)
                .await;

        let mut summary = RunSummary {
            fetched: candidates.len(),
            ..RunSummary::default()
        };
        let medical = self.classifier.batch_classify(candidates);
        summary.classified_medical = medical.len();

        if let Err(e) = self.persist(medical, &mut summary).await {
            return Err(aborted(summary, e));
        }

        logger.info(&format!("✅ Done: {}", summary));
        Ok(summary)
    }

    /// Walks every backfill query back through `window`, page by page.
    pub async fn collect_historical(&self, window: BackfillWindow) -> Result<RunSummary> {
        let logger = self.logger.clone().with_prefix("[backfill]".to_string());
        logger.info(&format!(
            "🕰️ Backfilling {} queries over {}",
            self.config.backfill_queries.len(),
            window
        ));

        let mut summary = RunSummary::for_window(window);
        for query in &self.config.backfill_queries {
            if let Err(e) = self.backfill_query(query, &window, &mut summary).await {
                return Err(aborted(summary, e));
            }
        }

        logger.info(&format!("✅ Done: {}", summary));
        Ok(summary)
    }

    async fn backfill_query(
        &self,
        query: &str,
        window: &BackfillWindow,
        summary: &mut RunSummary,
    ) -> Result<PageState> {
        let logger = self
            .logger
            .clone()
            .with_prefix("[backfill]".to_string())
            .with_prefix(format!("[{}]", query));

        let mut state = self.paginator.first();
        while let PageState::Fetching { start } = state {
            let page = self
                .search
                .fetch(query, self.paginator.page_size(), start)
                .await;
            let FilteredPage {
                received,
                in_window,
                outcome,
            } = FilteredPage::new(page, window);

            logger.info(&format!(
                "📄 start={} received={} in_window={}",
                start,
                received,
                in_window.len()
            ));

            if !in_window.is_empty() {
                summary.fetched += in_window.len();
                let medical = self.classifier.batch_classify(in_window);
                summary.classified_medical += medical.len();
                self.persist(medical, summary).await?;
            }

            state = self.paginator.advance(state, outcome);
            if !state.is_terminal() && !self.config.page_delay.is_zero() {
                sleep(self.config.page_delay).await;
            }
        }

        logger.info(&format!("🏁 Stopped: {:?}", state));
        Ok(state)
    }

    /// Inserts every article whose URL is not stored yet. Each insert commits
    /// on its own, so a failure leaves earlier inserts in place.
    async fn persist(&self, articles: Vec<ClassifiedArticle>, summary: &mut RunSummary) -> Result<()> {
        for article in articles {
            if self.sink.exists_by_url(article.url()).await? {
                summary.skipped_duplicate += 1;
                continue;
            }
            let id = self.sink.insert(&article).await?;
            summary.saved += 1;
            self.logger.debug(&format!(
                "💾 Saved {} [{}] {}",
                id,
                article.classification.category_label(),
                article.candidate.title
            ));
        }
        Ok(())
    }
}

impl<S: ArticleRepository + ?Sized> Collector<S> {
    /// Re-runs the classifier over every stored medical article.
    pub async fn reclassify(&self) -> Result<ReclassifySummary> {
        Reclassifier::new(self.classifier.clone(), self.sink.clone())
            .with_logger(self.logger.clone())
            .run()
            .await
    }
}

/// Classifier plus repository, without any search client.
pub struct Reclassifier<R: ArticleRepository + ?Sized> {
    classifier: Classifier,
    repo: Arc<R>,
    logger: Logger,
}

impl<R: ArticleRepository + ?Sized> Reclassifier<R> {
    pub fn new(classifier: Classifier, repo: Arc<R>) -> Self {
        Self {
            classifier,
            repo,
            logger: Logger::new(),
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub async fn run(&self) -> Result<ReclassifySummary> {
        let logger = self.logger.clone().with_prefix("[reclassify]".to_string());
        let articles = self.repo.find_articles(&ArticleFilter::medical()).await?;
        let total = articles.len();
        logger.info(&format!("🔁 Reclassifying {} articles", total));

        let mut summary = ReclassifySummary::default();
        for (i, stored) in articles.iter().enumerate() {
            let classification = self.classifier.classify_candidate(&stored.article.candidate);
            self.repo
                .update_classification(stored.id, &classification)
                .await?;
            summary.updated += 1;
            if (i + 1) % 10 == 0 {
                logger.info(&format!("{}/{}", i + 1, total));
            }
        }

        summary.by_category = self.repo.category_counts().await?;
        logger.info(&format!("✅ Updated {} articles", summary.updated));
        Ok(summary)
    }
}

fn aborted(summary: RunSummary, source: Error) -> Error {
    Error::RunAborted {
        summary: Box::new(summary),
        source: Box::new(source),
    }
}
