//! Search query parameters and their rendering to a request.

use crate::date::{format_api_timestamp, SearchWindow};

pub const DEFAULT_QUERY: &str =
    r#"(#ons OR @ons OR "Office for National Statistics") -is:retweet lang:en -#fwb -from:ons"#;

/// Parameters sent on every search request (the continuation token is added by
/// the paginator, not stored here).
#[derive(Clone, Debug, PartialEq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u32,         // per page; the API accepts 10..=100
    pub tweet_fields: Vec<String>,
    pub expansions: Vec<String>,
    pub window: SearchWindow,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: DEFAULT_QUERY.to_string(),
            max_results: 100,
            tweet_fields: vec!["text".into(), "created_at".into(), "referenced_tweets".into()],
            expansions: vec!["in_reply_to_user_id".into()],
            window: SearchWindow::new(None, None),
        }
    }
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Default::default() }
    }

    pub fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = n.clamp(10, 100);
        self
    }

    pub fn with_tweet_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tweet_fields = fields.into_iter().map(Into::into).collect();
        self.normalize()
    }

    pub fn with_expansions<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expansions = fields.into_iter().map(Into::into).collect();
        self.normalize()
    }

    pub fn with_window(mut self, window: SearchWindow) -> Self {
        self.window = window;
        self
    }

    /// Trim and dedup field lists, keeping first-seen order.
    pub fn normalize(mut self) -> Self {
        let tidy = |v: &mut Vec<String>| {
            let mut seen = std::collections::HashSet::new();
            v.retain_mut(|s| {
                *s = s.trim().to_string();
                !s.is_empty() && seen.insert(s.clone())
            });
        };
        tidy(&mut self.tweet_fields);
        tidy(&mut self.expansions);
        self
    }

    /// Render to request parameters in a stable order.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut p = vec![
            ("query".to_string(), self.query.clone()),
            ("max_results".to_string(), self.max_results.to_string()),
        ];
        if !self.tweet_fields.is_empty() {
            p.push(("tweet.fields".to_string(), self.tweet_fields.join(",")));
        }
        if !self.expansions.is_empty() {
            p.push(("expansions".to_string(), self.expansions.join(",")));
        }
        if let Some(start) = self.window.start {
            p.push(("start_time".to_string(), format_api_timestamp(start)));
        }
        if let Some(end) = self.window.end {
            p.push(("end_time".to_string(), format_api_timestamp(end)));
        }
        p
    }
}
