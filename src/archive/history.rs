//! Caller-side accumulation of paginated history.
//!
//! The fetch client is stateless; this feed owns the growing list. A refresh
//! replaces the list wholesale, a load-more appends after what is already
//! there. Failed fetches never reach the feed, so existing history is never
//! partially overwritten.

use super::{PageResult, SyncRecord};

#[derive(Debug, Default)]
pub struct HistoryFeed {
    records: Vec<SyncRecord>,
    has_more: bool,
    next_page_token: Option<String>,
}

impl HistoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[SyncRecord] {
        &self.records
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Continuation token for the next load-more call. Opaque: thread it
    /// back verbatim, never construct or modify one.
    pub fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }

    /// First page of a fresh read: replace everything.
    pub fn apply_refresh(&mut self, page: PageResult) {
        self.records = page.items;
        self.has_more = page.has_more;
        self.next_page_token = page.next_page_token;
    }

    /// Subsequent page: append after the existing list.
    pub fn apply_more(&mut self, page: PageResult) {
        self.records.extend(page.items);
        self.has_more = page.has_more;
        self.next_page_token = page.next_page_token;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn record(tag: &str) -> SyncRecord {
        SyncRecord {
            original: format!("q-{}", tag),
            refined: format!("a-{}", tag),
            style: "The Minimalist".into(),
            date: DateTime::UNIX_EPOCH,
        }
    }

    fn page(tags: &[&str], has_more: bool, token: Option<&str>) -> PageResult {
        PageResult {
            items: tags.iter().map(|t| record(t)).collect(),
            has_more,
            next_page_token: token.map(String::from),
        }
    }

    #[test]
    fn refresh_then_load_more_accumulates_in_order() {
        let mut feed = HistoryFeed::new();

        feed.apply_refresh(page(&["1", "2"], true, Some("tok-1")));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.next_page_token(), Some("tok-1"));

        feed.apply_more(page(&["3"], false, None));
        assert_eq!(feed.len(), 3);
        assert!(!feed.has_more());

        // First page's items precede the second page's
        let originals: Vec<_> = feed.records().iter().map(|r| r.original.as_str()).collect();
        assert_eq!(originals, vec!["q-1", "q-2", "q-3"]);
    }

    #[test]
    fn refresh_replaces_wholesale() {
        let mut feed = HistoryFeed::new();
        feed.apply_refresh(page(&["old-1", "old-2", "old-3"], false, None));
        feed.apply_refresh(page(&["new-1"], false, None));

        assert_eq!(feed.len(), 1);
        assert_eq!(feed.records()[0].original, "q-new-1");
    }
}
