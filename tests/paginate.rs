#[path = "common/mod.rs"]
mod common;

use common::*;
use serde_json::json;
use std::time::Duration;
use tetl::{EtlError, Paginator, RateLimitCfg, RateLimitDecision, SearchQuery, Stop, WaitOut};

const URL: &str = "mock://search";

fn no_cooldown(ceiling: u32) -> RateLimitCfg {
    RateLimitCfg { request_ceiling: ceiling, cooldown: Duration::ZERO }
}

/// Pagination follows `next_token` and stops once the target count is reached,
/// even though the API still offers more pages.
#[test]
fn stops_at_target_count() {
    let t = MockTransport::new([
        page(plain_tweets("a", 3), Some("tok1")),
        page(plain_tweets("b", 3), Some("tok2")),
        page(plain_tweets("c", 3), Some("tok3")),
    ]);
    let got = Paginator::new(&t, no_cooldown(450)).collect(URL, &SearchQuery::default(), 5, &mut WaitOut).unwrap();
    assert_eq!(got.len(), 6, "whole pages are kept");

    let calls = t.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].param("next_token"), None);
    assert_eq!(calls[1].param("next_token"), Some("tok1"));
    assert_eq!(calls[1].param("query"), calls[0].param("query"));
    assert_eq!(calls[0].param("max_results"), Some("100"));
}

/// A response without a continuation token is the last page.
#[test]
fn stops_when_token_missing() {
    let t = MockTransport::new([page(plain_tweets("a", 2), Some("tok1")), page(plain_tweets("b", 1), None)]);
    let got = Paginator::new(&t, no_cooldown(450)).collect(URL, &SearchQuery::default(), 100, &mut WaitOut).unwrap();
    assert_eq!(got.len(), 3);
    assert_eq!(t.calls().len(), 2);
}

/// A page without `data` contributes nothing but does not end the run.
#[test]
fn missing_data_is_tolerated() {
    let t = MockTransport::new([
        json!({ "meta": { "result_count": 0, "next_token": "tok1" } }),
        page(plain_tweets("b", 2), None),
    ]);
    let got = Paginator::new(&t, no_cooldown(450)).collect(URL, &SearchQuery::default(), 100, &mut WaitOut).unwrap();
    assert_eq!(got.len(), 2);
}

/// At the request ceiling an Abort decision returns what was collected so far.
#[test]
fn rate_limit_abort_stops_early() {
    let t = MockTransport::new([
        page(plain_tweets("a", 2), Some("tok1")),
        page(plain_tweets("b", 2), Some("tok2")),
        page(plain_tweets("c", 2), Some("tok3")),
    ]);
    let got = Paginator::new(&t, no_cooldown(2)).collect(URL, &SearchQuery::default(), 100, &mut Stop).unwrap();
    assert_eq!(got.len(), 4);
    assert_eq!(t.calls().len(), 2);
}

/// A Continue decision resets the counter, so the policy is asked once per ceiling.
#[test]
fn rate_limit_continue_resets_counter() {
    let t = MockTransport::new([
        page(plain_tweets("a", 1), Some("t1")),
        page(plain_tweets("b", 1), Some("t2")),
        page(plain_tweets("c", 1), Some("t3")),
        page(plain_tweets("d", 1), Some("t4")),
        page(plain_tweets("e", 1), None),
    ]);
    let mut asked = Vec::new();
    let mut policy = |collected: usize| {
        asked.push(collected);
        RateLimitDecision::Continue
    };
    let got = Paginator::new(&t, no_cooldown(2)).collect(URL, &SearchQuery::default(), 100, &mut policy).unwrap();
    assert_eq!(got.len(), 5);
    assert_eq!(asked, vec![2, 4]);
}

/// The interactive prompt pauses on `p` and stops on anything else.
#[test]
fn prompt_policy_reads_operator_answer() {
    use tetl::{Prompt, RateLimitPolicy};

    let mut out = Vec::new();
    let mut p = Prompt::new("p\n".as_bytes(), &mut out);
    assert_eq!(p.on_rate_limit_approach(10), RateLimitDecision::Continue);

    let mut out2 = Vec::new();
    let mut q = Prompt::new("q\n".as_bytes(), &mut out2);
    assert_eq!(q.on_rate_limit_approach(10), RateLimitDecision::Abort);
    assert!(String::from_utf8_lossy(&out2).contains("10 posts obtained"));
}

/// A transport failure aborts the whole collection; no partial result comes back.
#[test]
fn transport_error_is_fatal() {
    let t = MockTransport::new([page(plain_tweets("a", 2), Some("tok1"))]);
    t.push_err(401);
    let err = Paginator::new(&t, no_cooldown(450))
        .collect(URL, &SearchQuery::default(), 100, &mut WaitOut)
        .unwrap_err();
    match err.downcast_ref::<EtlError>() {
        Some(EtlError::Transport { status, .. }) => assert_eq!(*status, 401),
        other => panic!("expected transport error, got {other:?}"),
    }
}
