//! End-to-end flow over the in-process pieces: a coached conversation is
//! streamed into the transcript, the user marks entries, reconciliation
//! produces records, and fetched history accumulates page by page.

use chrono::Utc;
use stylus::archive::{HistoryFeed, PageResult, SyncRecord};
use stylus::reconcile::{Selection, reconcile};
use stylus::styles;
use stylus::transcript::Transcript;

#[test]
fn coached_session_reconciles_into_records() {
    let style = styles::by_id("minimalist").unwrap();
    let mut transcript = Transcript::for_style(style);

    // First exchange arrives as a stream
    let q1 = transcript.push_user("The very old and quite beautiful house stood there.");
    let a1 = transcript.begin_streaming();
    for chunk in ["Cut ", "\"very\" ", "and ", "\"quite\"."] {
        transcript.push_chunk(chunk);
    }
    transcript.finish_streaming();

    // Second exchange, not marked
    transcript.push_user("The house stood there.");
    transcript.push_assistant("Better. Now, what did it stand on?");

    let mut selection = Selection::new();
    selection.toggle(q1);
    selection.toggle(a1);

    let pairs = reconcile(&transcript, &selection).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].refined, "Cut \"very\" and \"quite\".");

    let now = Utc::now();
    let records: Vec<SyncRecord> = pairs
        .into_iter()
        .map(|pair| SyncRecord::from_pair(pair, style.name, now))
        .collect();
    assert_eq!(records[0].style, "The Minimalist");
    assert_eq!(records[0].date, now);

    // A successful sync clears the marks
    selection.clear();
    assert!(selection.is_empty());
}

#[test]
fn history_pages_merge_behind_the_stateless_client() {
    let mut feed = HistoryFeed::new();

    let page_one = PageResult {
        items: vec![record("newest"), record("newer")],
        has_more: true,
        next_page_token: Some("cursor-1".into()),
    };
    let page_two = PageResult {
        items: vec![record("oldest")],
        has_more: false,
        next_page_token: None,
    };

    feed.apply_refresh(page_one);
    let token = feed.next_page_token().map(String::from);
    assert_eq!(token.as_deref(), Some("cursor-1"));

    feed.apply_more(page_two);
    assert_eq!(feed.len(), 3);
    assert!(!feed.has_more());
    assert_eq!(
        feed.records()
            .iter()
            .map(|r| r.original.as_str())
            .collect::<Vec<_>>(),
        vec!["q newest", "q newer", "q oldest"]
    );
}

fn record(tag: &str) -> SyncRecord {
    SyncRecord {
        original: format!("q {}", tag),
        refined: format!("a {}", tag),
        style: "The Skeptic".into(),
        date: Utc::now(),
    }
}
