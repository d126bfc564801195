use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::types::Category;
use crate::{Error, Result};

/// Inclusive `[start, end]` range a backfill run must stay within.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BackfillWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to `now`.
    pub fn last_days(days: u32, now: DateTime<Utc>) -> Self {
        Self {
            start: now - Duration::days(i64::from(days)),
            end: now,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }

    /// True when `at` lies before the window, i.e. pagination has gone too far back.
    pub fn is_before(&self, at: DateTime<Utc>) -> bool {
        at < self.start
    }
}

impl fmt::Display for BackfillWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {}",
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

/// Statistics for one collection run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Candidates handed to classification.
    pub fetched: usize,
    pub classified_medical: usize,
    pub saved: usize,
    pub skipped_duplicate: usize,
    /// Only set for backfill runs.
    pub window: Option<BackfillWindow>,
}

impl RunSummary {
    pub fn for_window(window: BackfillWindow) -> Self {
        Self {
            window: Some(window),
            ..Self::default()
        }
    }

    /// Adds the counters of `other`, keeping this summary's window.
    pub fn absorb(&mut self, other: &RunSummary) {
        self.fetched += other.fetched;
        self.classified_medical += other.classified_medical;
        self.saved += other.saved;
        self.skipped_duplicate += other.skipped_duplicate;
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched={} medical={} saved={} duplicates={}",
            self.fetched, self.classified_medical, self.saved, self.skipped_duplicate
        )?;
        if let Some(window) = &self.window {
            write!(f, " window={}", window)?;
        }
        Ok(())
    }
}

/// Result of re-running the classifier over stored articles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclassifySummary {
    pub updated: usize,
    pub by_category: BTreeMap<Category, usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_window_rejects_inverted_range() {
        let start = Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            BackfillWindow::new(start, end),
            Err(Error::InvalidWindow { .. })
        ));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let now = Utc.with_ymd_and_hms(2025, 1, 21, 3, 0, 0).unwrap();
        let window = BackfillWindow::last_days(7, now);
        assert!(window.contains(now));
        assert!(window.contains(window.start));
        assert!(!window.contains(now + Duration::seconds(1)));
        assert!(window.is_before(window.start - Duration::seconds(1)));
        assert!(!window.is_before(window.start));
    }

    #[test]
    fn test_absorb_keeps_window() {
        let now = Utc.with_ymd_and_hms(2025, 1, 21, 3, 0, 0).unwrap();
        let window = BackfillWindow::last_days(1, now);
        let mut total = RunSummary::for_window(window);
        total.absorb(&RunSummary {
            fetched: 10,
            classified_medical: 7,
            saved: 5,
            skipped_duplicate: 2,
            window: None,
        });
        total.absorb(&RunSummary {
            fetched: 1,
            ..RunSummary::default()
        });

        assert_eq!(total.fetched, 11);
        assert_eq!(total.saved, 5);
        assert_eq!(total.skipped_duplicate, 2);
        assert_eq!(total.window, Some(window));
    }
}
