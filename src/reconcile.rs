//! Reconciliation sweep: re-query stored ids in batches, diff against what the
//! API still returns, and filter the stored dataset.

use crate::api::Transport;
use crate::config::LookupCfg;
use crate::json_utils::record_id;
use crate::progress::ProgressScope;
use crate::references::TidyRecord;
use crate::util::pause;
use anyhow::{Context, Result};
use std::collections::HashSet;

/// Join ids into a single comma-separated lookup key.
pub fn format_ids<S: AsRef<str>>(ids: &[S]) -> String {
    ids.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(",")
}

/// Ids present in `stored` but not in `found`, in stored order, without repeats.
pub fn identify_missing(stored: &[String], found: &[String]) -> Vec<String> {
    let found: HashSet<&str> = found.iter().map(|s| s.as_str()).collect();
    let mut seen = HashSet::new();
    stored
        .iter()
        .filter(|id| !found.contains(id.as_str()) && seen.insert(id.as_str()))
        .cloned()
        .collect()
}

/// Drop records whose id is in `missing`, preserving order.
pub fn filter_out_missing(dataset: Vec<TidyRecord>, missing: &[String]) -> Vec<TidyRecord> {
    let missing: HashSet<&str> = missing.iter().map(|s| s.as_str()).collect();
    dataset.into_iter().filter(|r| !missing.contains(r.id.as_str())).collect()
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub searched: usize,
    pub found: Vec<String>,
    pub missing: Vec<String>,
    pub surviving_ids: Vec<String>,
}

pub struct Reconciler<'a, T: Transport + ?Sized> {
    transport: &'a T,
    lookup_url: String,
    cfg: LookupCfg,
    progress: bool,
}

impl<'a, T: Transport + ?Sized> Reconciler<'a, T> {
    pub fn new(transport: &'a T, lookup_url: impl Into<String>, cfg: LookupCfg) -> Self {
        Self { transport, lookup_url: lookup_url.into(), cfg, progress: false }
    }

    pub fn progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }

    /// Look up `ids` in batches and return the ids the API still knows about.
    /// Elements without an id, and non-array responses, contribute nothing.
    pub fn fetch_existing(&self, ids: &[String]) -> Result<Vec<String>> {
        let batch_size = self.cfg.batch_size.max(1);
        let n_batches = ids.len().div_ceil(batch_size);
        let pb = ProgressScope::count(self.progress, "Looking up posts", n_batches as u64);

        let mut found = Vec::with_capacity(ids.len());
        for (i, batch) in ids.chunks(batch_size).enumerate() {
            if i > 0 {
                pause(self.cfg.batch_delay);
            }
            let params = vec![("id".to_string(), format_ids(batch))];
            let response = self
                .transport
                .get_json(&self.lookup_url, &params)
                .with_context(|| format!("lookup batch {}/{} to {}", i + 1, n_batches, self.lookup_url))?;

            match response.as_array() {
                Some(items) => found.extend(items.iter().filter_map(record_id)),
                None => tracing::warn!(batch = i + 1, "lookup response is not an array; treating batch as not found"),
            }
            pb.inc_items(1);
        }
        pb.finish("done");
        tracing::info!("{} posts searched for, {} posts returned.", ids.len(), found.len());
        Ok(found)
    }

    pub fn reconcile(&self, stored_ids: &[String]) -> Result<ReconcileOutcome> {
        let found = self.fetch_existing(stored_ids)?;
        let missing = identify_missing(stored_ids, &found);
        let missing_set: HashSet<&str> = missing.iter().map(|s| s.as_str()).collect();
        let surviving_ids = stored_ids
            .iter()
            .filter(|id| !missing_set.contains(id.as_str()))
            .cloned()
            .collect();
        tracing::info!("{} posts removed.", missing.len());
        Ok(ReconcileOutcome { searched: stored_ids.len(), found, missing, surviving_ids })
    }
}
