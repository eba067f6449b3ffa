//! Mention scrubbing and reply-target flagging.
//!
//! Every mention token (`@` followed by word characters) other than the
//! allow-listed handle is rewritten to a placeholder handle. The placeholder
//! is itself a handle, so scans treat it as allowed.

use crate::record::Record;
use anyhow::{bail, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

pub const DEFAULT_ALLOWED_HANDLE: &str = "@ONS";
pub const DEFAULT_PLACEHOLDER: &str = "@user";

fn mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@\w+").expect("static mention pattern"))
}

fn handle_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@\w+$").expect("static handle pattern"))
}

/// All mention tokens in `text`, non-overlapping, left to right.
pub fn extract_mentions(text: &str) -> Vec<&str> {
    mention_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// True iff the reply target id equals `target_user_id`. Missing or empty ids are false.
pub fn in_reply_to_target(user_id: Option<&str>, target_user_id: &str) -> bool {
    match user_id {
        Some(id) if !id.is_empty() => id == target_user_id,
        _ => false,
    }
}

/// A Record with the reply-to user id reduced to a flag and mentions scrubbed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnonymisedRecord {
    pub id: String,
    pub created_at: String,
    pub in_reply_to_target: bool,
    pub referenced_tweets: Value,
    pub text: String,
}

#[derive(Clone, Debug)]
pub struct Anonymiser {
    allowed: String,
    placeholder: String,
}

impl Default for Anonymiser {
    fn default() -> Self {
        Self { allowed: DEFAULT_ALLOWED_HANDLE.to_string(), placeholder: DEFAULT_PLACEHOLDER.to_string() }
    }
}

impl Anonymiser {
    /// Both handles must be whole mention tokens, and they must differ.
    pub fn new(allowed_handle: impl Into<String>, placeholder: impl Into<String>) -> Result<Self> {
        let allowed = allowed_handle.into();
        let placeholder = placeholder.into();
        if !handle_re().is_match(&allowed) {
            bail!("allow-listed handle {allowed:?} is not a mention token");
        }
        if !handle_re().is_match(&placeholder) {
            bail!("placeholder {placeholder:?} is not a mention token");
        }
        if allowed == placeholder {
            bail!("placeholder must differ from the allow-listed handle ({allowed})");
        }
        Ok(Self { allowed, placeholder })
    }

    pub fn allowed_handle(&self) -> &str {
        &self.allowed
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    #[inline]
    fn is_allowed(&self, token: &str) -> bool {
        token == self.allowed || token == self.placeholder
    }

    pub fn count_disallowed(&self, text: &str) -> usize {
        mention_re().find_iter(text).filter(|m| !self.is_allowed(m.as_str())).count()
    }

    pub fn has_disallowed(&self, text: &str) -> bool {
        mention_re().find_iter(text).any(|m| !self.is_allowed(m.as_str()))
    }

    /// One replacement pass over `text`.
    pub fn replace_mentions(&self, text: &str) -> String {
        mention_re()
            .replace_all(text, |caps: &regex::Captures| {
                let tok = &caps[0];
                if tok == self.allowed { tok.to_string() } else { self.placeholder.clone() }
            })
            .into_owned()
    }

    /// Scrub a whole dataset's texts, re-scanning until nothing disallowed remains.
    ///
    /// A pass rewrites every disallowed token, and the placeholder is allowed, so
    /// the disallowed total strictly decreases each pass; the bound below is
    /// never reached in practice.
    pub fn scrub_all(&self, texts: &mut [String]) -> Result<usize> {
        let mut remaining: usize = texts.iter().map(|t| self.count_disallowed(t)).sum();
        let max_passes = remaining + 1;
        let mut passes = 0usize;
        while remaining > 0 {
            if passes >= max_passes {
                bail!("mention scrubbing did not converge after {passes} passes ({remaining} left)");
            }
            for t in texts.iter_mut() {
                if self.has_disallowed(t) {
                    *t = self.replace_mentions(t);
                }
            }
            passes += 1;
            let next: usize = texts.iter().map(|t| self.count_disallowed(t)).sum();
            if next >= remaining {
                bail!("mention scrubbing made no progress ({next} disallowed mentions left)");
            }
            remaining = next;
        }
        Ok(passes)
    }

    pub fn anonymise(&self, dataset: &[Record], target_user_id: &str) -> Result<Vec<AnonymisedRecord>> {
        let mut texts: Vec<String> = dataset.iter().map(|r| r.text.clone()).collect();
        let passes = self.scrub_all(&mut texts)?;
        tracing::debug!(records = dataset.len(), passes, "scrubbed mentions");

        Ok(dataset
            .iter()
            .zip(texts)
            .map(|(r, text)| AnonymisedRecord {
                id: r.id.clone(),
                created_at: r.created_at.clone(),
                in_reply_to_target: in_reply_to_target(r.in_reply_to_user_id.as_deref(), target_user_id),
                referenced_tweets: r.referenced_tweets.clone(),
                text,
            })
            .collect())
    }
}
