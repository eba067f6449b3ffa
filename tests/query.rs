use time::macros::datetime;
use tetl::{format_api_timestamp, parse_api_timestamp, SearchQuery, SearchWindow, DEFAULT_QUERY};

fn param<'a>(p: &'a [(String, String)], key: &str) -> Option<&'a str> {
    p.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
}

/// Default parameters match what the collector has always sent.
#[test]
fn default_params() {
    let p = SearchQuery::default().to_params();
    assert_eq!(param(&p, "query"), Some(DEFAULT_QUERY));
    assert_eq!(param(&p, "max_results"), Some("100"));
    assert_eq!(param(&p, "tweet.fields"), Some("text,created_at,referenced_tweets"));
    assert_eq!(param(&p, "expansions"), Some("in_reply_to_user_id"));
    assert_eq!(param(&p, "start_time"), None);
    assert_eq!(param(&p, "next_token"), None);
}

#[test]
fn builders_clamp_and_normalize() {
    let q = SearchQuery::new("rust")
        .with_max_results(5000)
        .with_tweet_fields([" text", "text", "", "lang "])
        .with_expansions(Vec::<String>::new());
    let p = q.to_params();
    assert_eq!(param(&p, "max_results"), Some("100"));
    assert_eq!(param(&p, "tweet.fields"), Some("text,lang"));
    assert_eq!(param(&p, "expansions"), None);
    assert_eq!(SearchQuery::default().with_max_results(1).max_results, 10);
}

/// A trailing window emits only `start_time`, formatted in UTC with a `Z` suffix.
#[test]
fn trailing_window_renders_start_time() {
    let now = datetime!(2024-03-01 12:30:15 +01:00);
    let w = SearchWindow::trailing(now, time::Duration::hours(6));
    assert!(!w.is_unbounded());
    assert!(SearchWindow::new(None, None).is_unbounded());

    let p = SearchQuery::default().with_window(w).to_params();
    assert_eq!(param(&p, "start_time"), Some("2024-03-01T05:30:15Z"));
    assert_eq!(param(&p, "end_time"), None);
}

#[test]
fn timestamps() {
    let ts = parse_api_timestamp("2022-03-01T10:00:00.000Z").unwrap();
    assert_eq!(format_api_timestamp(ts), "2022-03-01T10:00:00Z");
    assert!(parse_api_timestamp("yesterday").is_err());
}
