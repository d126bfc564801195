use mn_core::{ArticleCandidate, ClassificationResult, ClassifiedArticle, ClassifierConfig};
use tracing::{debug, info};

use crate::category::CategoryTable;

/// Minimum confidence for an article to count as medical. The floor
/// correction puts any article with at least one hit at 0.6 or above, so in
/// practice a single keyword is enough.
pub const MEDICAL_THRESHOLD: f64 = 0.04;

const TITLE_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;

#[derive(Debug, Clone)]
struct Keyword {
    text: String,
    folded: String,
}

/// Deterministic keyword-scoring classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    keywords: Vec<Keyword>,
    categories: CategoryTable,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let mut keywords: Vec<Keyword> = Vec::with_capacity(config.medical_keywords.len());
        for text in config.medical_keywords {
            let folded = text.to_lowercase();
            if folded.is_empty() || keywords.iter().any(|k| k.folded == folded) {
                continue;
            }
            keywords.push(Keyword { text, folded });
        }

        Self {
            keywords,
            categories: CategoryTable::new(config.categories, config.fallback),
        }
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }

    pub fn classify(&self, title: &str, description: &str) -> ClassificationResult {
        let text = format!("{} {}", title, description).to_lowercase();
        let title = title.to_lowercase();

        let mut matched_keywords = Vec::new();
        let mut score = 0.0;
        for keyword in &self.keywords {
            if !text.contains(&keyword.folded) {
                continue;
            }
            matched_keywords.push(keyword.text.clone());
            score += if title.contains(&keyword.folded) {
                TITLE_WEIGHT
            } else {
                BODY_WEIGHT
            };
        }

        let max_score = TITLE_WEIGHT * self.keywords.len() as f64;
        let mut confidence_score = if max_score > 0.0 {
            (score / max_score).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // Floor correction: more distinct hits, more confidence, whatever the weights.
        if !matched_keywords.is_empty() {
            let floor = (0.5 + 0.1 * matched_keywords.len() as f64).min(1.0);
            confidence_score = confidence_score.max(floor);
        }

        let is_medical = confidence_score >= MEDICAL_THRESHOLD && !matched_keywords.is_empty();
        let category = is_medical.then(|| self.categories.categorize(&text));

        debug!(
            "classified: medical={} category={} confidence={:.2} keywords={:?}",
            is_medical,
            category.map(|c| c.label()).unwrap_or("none"),
            confidence_score,
            matched_keywords
        );

        ClassificationResult {
            is_medical,
            category,
            confidence_score,
            matched_keywords,
        }
    }

    pub fn classify_candidate(&self, candidate: &ArticleCandidate) -> ClassificationResult {
        self.classify(&candidate.title, &candidate.description)
    }

    /// Classifies every candidate and keeps the medical ones, in input order.
    pub fn batch_classify(&self, candidates: Vec<ArticleCandidate>) -> Vec<ClassifiedArticle> {
        let total = candidates.len();
        let medical: Vec<ClassifiedArticle> = candidates
            .into_iter()
            .filter_map(|candidate| {
                let classification = self.classify_candidate(&candidate);
                classification
                    .is_medical
                    .then(|| ClassifiedArticle::new(candidate, classification))
            })
            .collect();

        info!("🩺 Classified {} articles, {} medical", total, medical.len());
        medical
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
