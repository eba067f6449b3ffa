#![allow(dead_code)]

use serde_json::{json, Value};
use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tetl::{EtlError, EtlResult, Transport};

/// One recorded request: URL plus the query parameters it carried.
#[derive(Clone, Debug)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Transport that replays scripted responses in order and records every call.
/// Running out of script is reported as a transport error.
#[derive(Default)]
pub struct MockTransport {
    script: RefCell<VecDeque<EtlResult<Value>>>,
    pub calls: RefCell<Vec<Call>>,
}

impl MockTransport {
    pub fn new<I: IntoIterator<Item = Value>>(responses: I) -> Self {
        Self {
            script: RefCell::new(responses.into_iter().map(Ok).collect()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn push_err(&self, status: u16) {
        self.script.borrow_mut().push_back(Err(EtlError::Transport {
            status,
            url: "mock://".to_string(),
            body: "scripted failure".to_string(),
        }));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Transport for MockTransport {
    fn get_json(&self, url: &str, params: &[(String, String)]) -> EtlResult<Value> {
        self.calls.borrow_mut().push(Call { url: url.to_string(), params: params.to_vec() });
        self.script.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(EtlError::Transport { status: 599, url: url.to_string(), body: "script exhausted".to_string() })
        })
    }
}

/// Lookup endpoint stand-in: answers each `id=a,b,c` request with the subset
/// of ids that still "exist", as v1.1-style objects (numeric `id`, plus `id_str`).
pub struct LookupTransport {
    existing: HashSet<String>,
    pub calls: RefCell<Vec<Call>>,
}

impl LookupTransport {
    pub fn new<I, S>(existing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { existing: existing.into_iter().map(Into::into).collect(), calls: RefCell::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }
}

impl Transport for LookupTransport {
    fn get_json(&self, url: &str, params: &[(String, String)]) -> EtlResult<Value> {
        let call = Call { url: url.to_string(), params: params.to_vec() };
        let ids = call.param("id").unwrap_or("").to_string();
        self.calls.borrow_mut().push(call);
        let found: Vec<Value> = ids
            .split(',')
            .filter(|id| self.existing.contains(*id))
            .map(|id| json!({ "id_str": id, "text": "still here" }))
            .collect();
        Ok(Value::Array(found))
    }
}

/// A raw search-API post.
pub fn raw_tweet(id: &str, text: &str, reply_to: Option<&str>, refs: Option<Value>) -> Value {
    let mut v = json!({
        "id": id,
        "created_at": "2022-03-01T10:00:00.000Z",
        "text": text,
        "author_id": "999",
        "lang": "en",
    });
    if let Some(u) = reply_to {
        v["in_reply_to_user_id"] = json!(u);
    }
    if let Some(r) = refs {
        v["referenced_tweets"] = r;
    }
    v
}

/// A search page. `next` becomes `meta.next_token`.
pub fn page(tweets: Vec<Value>, next: Option<&str>) -> Value {
    let count = tweets.len();
    match next {
        Some(t) => json!({ "data": tweets, "meta": { "result_count": count, "next_token": t } }),
        None => json!({ "data": tweets, "meta": { "result_count": count } }),
    }
}

/// `n` plain posts with ids `{prefix}{i}`.
pub fn plain_tweets(prefix: &str, n: usize) -> Vec<Value> {
    (0..n).map(|i| raw_tweet(&format!("{prefix}{i}"), &format!("post {i}"), None, None)).collect()
}

/// Read a text file line-by-line into strings.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}
