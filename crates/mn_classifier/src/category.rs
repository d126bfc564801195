use mn_core::config::CategoryKeywords;
use mn_core::Category;

/// Ordered category table. Keywords are stored case-folded.
#[derive(Debug, Clone)]
pub(crate) struct CategoryTable {
    entries: Vec<(Category, Vec<String>)>,
    fallback: Category,
}

impl CategoryTable {
    pub(crate) fn new(entries: Vec<CategoryKeywords>, fallback: Category) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| {
                let keywords = entry
                    .keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                (entry.category, keywords)
            })
            .collect();
        Self { entries, fallback }
    }

    /// Category with the strictly highest keyword hit count in `text` (already
    /// case-folded). Ties keep the earlier entry; no hits at all gives the fallback.
    pub(crate) fn categorize(&self, text: &str) -> Category {
        let mut best: Option<(Category, usize)> = None;
        for (category, keywords) in &self.entries {
            let hits = keywords.iter().filter(|k| text.contains(k.as_str())).count();
            if hits > 0 && best.map_or(true, |(_, top)| hits > top) {
                best = Some((*category, hits));
            }
        }
        best.map(|(category, _)| category).unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CategoryTable {
        CategoryTable::new(
            vec![
                CategoryKeywords {
                    category: Category::Pharma,
                    keywords: vec!["신약".to_string(), "임상".to_string()],
                },
                CategoryKeywords {
                    category: Category::Disease,
                    keywords: vec!["암".to_string(), "COVID".to_string(), "".to_string()],
                },
            ],
            Category::Other,
        )
    }

    #[test]
    fn test_categorize_picks_highest_count() {
        assert_eq!(table().categorize("폐암 신약 임상 돌입"), Category::Pharma);
        assert_eq!(table().categorize("covid 이후 암 검진 감소"), Category::Disease);
    }

    #[test]
    fn test_empty_keywords_do_not_match_everything() {
        assert_eq!(table().categorize("정치 뉴스"), Category::Other);
    }
}
