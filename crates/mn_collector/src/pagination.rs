//! Backfill pagination for one query, as an explicit state machine.
//!
//! `Exhausted` covers both a genuinely empty result page and a failed fetch,
//! since the search layer reports both as an empty page.

use mn_core::config::MAX_PAGE_SIZE;
use mn_core::{ArticleCandidate, BackfillWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Next page to request starts at this offset.
    Fetching { start: u32 },
    /// A page reached back past the window start.
    WindowExceeded,
    /// A page came back empty.
    Exhausted,
    /// The upstream offset ceiling was reached.
    Done,
}

impl PageState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PageState::Fetching { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Empty,
    Continue,
    CrossedBoundary,
}

/// A page reduced to the items inside the window.
#[derive(Debug)]
pub struct FilteredPage {
    pub received: usize,
    pub in_window: Vec<ArticleCandidate>,
    pub outcome: PageOutcome,
}

impl FilteredPage {
    /// Walks the page in order and keeps the items inside `window`. Results
    /// are assumed newest first, so the first item older than the window start
    /// ends the page: it and everything after it are dropped.
    pub fn new(page: Vec<ArticleCandidate>, window: &BackfillWindow) -> Self {
        let received = page.len();
        if page.is_empty() {
            return Self {
                received,
                in_window: page,
                outcome: PageOutcome::Empty,
            };
        }

        let mut crossed = false;
        let mut in_window = Vec::new();
        for candidate in page {
            if window.is_before(candidate.published_at) {
                crossed = true;
                break;
            }
            if window.contains(candidate.published_at) {
                in_window.push(candidate);
            }
        }

        Self {
            received,
            in_window,
            outcome: if crossed {
                PageOutcome::CrossedBoundary
            } else {
                PageOutcome::Continue
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    page_size: u32,
    max_start: u32,
}

impl Paginator {
    pub fn new(page_size: u32, max_start: u32) -> Self {
        Self {
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            max_start,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn first(&self) -> PageState {
        if self.max_start >= 1 {
            PageState::Fetching { start: 1 }
        } else {
            PageState::Done
        }
    }

    pub fn advance(&self, state: PageState, outcome: PageOutcome) -> PageState {
        match (state, outcome) {
            (PageState::Fetching { .. }, PageOutcome::Empty) => PageState::Exhausted,
            (PageState::Fetching { .. }, PageOutcome::CrossedBoundary) => PageState::WindowExceeded,
            (PageState::Fetching { start }, PageOutcome::Continue) => {
                match start.checked_add(self.page_size) {
                    Some(next) if next <= self.max_start => PageState::Fetching { start: next },
                    _ => PageState::Done,
                }
            }
            (terminal, _) => terminal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, day, 12, 0, 0).unwrap()
    }

    fn item(day: u32) -> ArticleCandidate {
        ArticleCandidate {
            title: "병원".to_string(),
            description: String::new(),
            url: format!("https://news.example.com/{}", day),
            source: "test".to_string(),
            published_at: at(day),
        }
    }

    fn window() -> BackfillWindow {
        BackfillWindow::new(at(10), at(20)).unwrap()
    }

    #[test]
    fn test_offsets_step_until_ceiling() {
        let paginator = Paginator::new(100, 1000);
        let mut state = paginator.first();
        let mut starts = Vec::new();
        while let PageState::Fetching { start } = state {
            starts.push(start);
            state = paginator.advance(state, PageOutcome::Continue);
        }
        assert_eq!(starts, vec![1, 101, 201, 301, 401, 501, 601, 701, 801, 901]);
        assert_eq!(state, PageState::Done);
    }

    #[test]
    fn test_empty_page_exhausts() {
        let paginator = Paginator::new(100, 1000);
        let state = paginator.advance(PageState::Fetching { start: 101 }, PageOutcome::Empty);
        assert_eq!(state, PageState::Exhausted);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_boundary_stops_pagination() {
        let paginator = Paginator::new(100, 1000);
        let state = paginator.advance(PageState::Fetching { start: 1 }, PageOutcome::CrossedBoundary);
        assert_eq!(state, PageState::WindowExceeded);
    }

    #[test]
    fn test_terminal_states_are_sticky() {
        let paginator = Paginator::new(100, 1000);
        for terminal in [PageState::Done, PageState::Exhausted, PageState::WindowExceeded] {
            assert_eq!(paginator.advance(terminal, PageOutcome::Continue), terminal);
        }
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(Paginator::new(0, 1000).page_size(), 1);
        assert_eq!(Paginator::new(250, 1000).page_size(), 100);
        assert_eq!(Paginator::new(100, 0).first(), PageState::Done);
    }

    #[test]
    fn test_filter_keeps_window_items_and_flags_boundary() {
        let page = vec![item(25), item(19), item(12), item(5), item(11)];
        let filtered = FilteredPage::new(page, &window());

        assert_eq!(filtered.received, 5);
        assert_eq!(filtered.outcome, PageOutcome::CrossedBoundary);
        // Day 11 is in range but comes after the too-old item, so it is dropped.
        let days: Vec<_> = filtered.in_window.iter().map(|c| c.published_at).collect();
        assert_eq!(days, vec![at(19), at(12)]);
    }

    #[test]
    fn test_filter_newer_items_do_not_stop() {
        let filtered = FilteredPage::new(vec![item(25), item(21)], &window());
        assert_eq!(filtered.outcome, PageOutcome::Continue);
        assert!(filtered.in_window.is_empty());

        let empty = FilteredPage::new(Vec::new(), &window());
        assert_eq!(empty.outcome, PageOutcome::Empty);
    }
}
