//! Search pagination: follow `meta.next_token` until the target count is met or
//! the API stops returning tokens, pausing or stopping at the request ceiling.

use crate::api::{Params, Transport};
use crate::config::RateLimitCfg;
use crate::json_utils::next_token;
use crate::progress::ProgressScope;
use crate::query::SearchQuery;
use crate::record::RawRecord;
use crate::util::pause;
use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    /// Sleep the cooldown, reset the counter, keep collecting.
    Continue,
    /// Stop and return what has been collected so far.
    Abort,
}

/// Consulted when the request counter reaches the ceiling.
/// `collected` is the number of records gathered so far.
pub trait RateLimitPolicy {
    fn on_rate_limit_approach(&mut self, collected: usize) -> RateLimitDecision;
}

impl<F: FnMut(usize) -> RateLimitDecision> RateLimitPolicy for F {
    fn on_rate_limit_approach(&mut self, collected: usize) -> RateLimitDecision {
        self(collected)
    }
}

/// Always wait out the cooldown.
pub struct WaitOut;

impl RateLimitPolicy for WaitOut {
    fn on_rate_limit_approach(&mut self, _collected: usize) -> RateLimitDecision {
        RateLimitDecision::Continue
    }
}

/// Always stop at the ceiling.
pub struct Stop;

impl RateLimitPolicy for Stop {
    fn on_rate_limit_approach(&mut self, _collected: usize) -> RateLimitDecision {
        RateLimitDecision::Abort
    }
}

/// Ask the operator: `p` pauses for the cooldown, anything else stops.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<io::StdinLock<'static>, io::Stderr> {
    pub fn stdin() -> Self {
        Self { input: io::stdin().lock(), output: io::stderr() }
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> RateLimitPolicy for Prompt<R, W> {
    fn on_rate_limit_approach(&mut self, collected: usize) -> RateLimitDecision {
        let _ = write!(
            self.output,
            "Approaching API rate limit. Pause, or exit with {collected} posts obtained?\n\
             Press p for pause or any other key to exit:\t"
        );
        let _ = self.output.flush();
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) if answer.trim().eq_ignore_ascii_case("p") => RateLimitDecision::Continue,
            _ => RateLimitDecision::Abort,
        }
    }
}

pub struct Paginator<'a, T: Transport + ?Sized> {
    transport: &'a T,
    rate_limit: RateLimitCfg,
    progress: bool,
}

impl<'a, T: Transport + ?Sized> Paginator<'a, T> {
    pub fn new(transport: &'a T, rate_limit: RateLimitCfg) -> Self {
        Self { transport, rate_limit, progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Collect raw records from `url` until `target` is reached or pages run out.
    /// Any transport error aborts the whole collection.
    pub fn collect(
        &self,
        url: &str,
        query: &SearchQuery,
        target: usize,
        policy: &mut dyn RateLimitPolicy,
    ) -> Result<Vec<RawRecord>> {
        let mut params: Params = query.to_params();
        let mut records: Vec<RawRecord> = Vec::new();
        let mut requests: u32 = 0;
        let mut pages: usize = 0;

        let pb = ProgressScope::count(self.progress, "Collecting posts", target as u64);
        tracing::info!(url, target, "collecting posts");

        while records.len() < target {
            let response = self
                .transport
                .get_json(url, &params)
                .with_context(|| format!("search request #{} to {}", pages + 1, url))?;
            requests += 1;
            pages += 1;

            match response.get("data").and_then(|d| d.as_array()) {
                Some(data) => records.extend(data.iter().cloned()),
                None => tracing::warn!(page = pages, "search response has no data array; treating as empty"),
            }
            pb.set_items(records.len() as u64);

            let Some(token) = next_token(&response) else {
                tracing::debug!(page = pages, "no continuation token; last page reached");
                break;
            };
            set_param(&mut params, "next_token", token);
            tracing::debug!(page = pages, collected = records.len(), "page collected");

            if requests >= self.rate_limit.request_ceiling {
                match policy.on_rate_limit_approach(records.len()) {
                    RateLimitDecision::Continue => {
                        tracing::info!(cooldown_secs = self.rate_limit.cooldown.as_secs(), "request ceiling reached; cooling down");
                        pause(self.rate_limit.cooldown);
                        requests = 0;
                    }
                    RateLimitDecision::Abort => {
                        tracing::info!(collected = records.len(), "request ceiling reached; stopping early");
                        break;
                    }
                }
            }
        }

        pb.finish(format!("{} posts", records.len()));
        tracing::info!(collected = records.len(), pages, "collection finished");
        Ok(records)
    }
}

fn set_param(params: &mut Params, key: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => params.push((key.to_string(), value)),
    }
}
