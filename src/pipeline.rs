use crate::anonymise::Anonymiser;
use crate::api::Transport;
use crate::config::EtlOptions;
use crate::date::parse_api_timestamp;
use crate::paginate::{Paginator, RateLimitPolicy};
use crate::query::SearchQuery;
use crate::reconcile::{filter_out_missing, Reconciler};
use crate::record::flatten;
use crate::references::{tidy, TidyRecord};
use crate::tsv::{read_dataset_counting, replace_dataset, write_dataset, WriteMode};
use crate::util::init_tracing_once;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Collection + reconciliation entry point. Configure with the builder methods,
/// then call `collect_and_anonymise` or `synchronise` with a transport.
#[derive(Clone, Default)]
pub struct TweetETL {
    pub(crate) opts: EtlOptions,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollectSummary {
    pub collected: usize,
    pub written: usize,
    pub skipped_duplicates: usize,
    pub mode: WriteMode,
    pub path: PathBuf,
    pub earliest: Option<String>,
    pub latest: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncSummary {
    pub searched: usize,
    pub found: usize,
    pub removed: usize,
    pub surviving: usize,
    /// Stored rows that could not be parsed; only non-zero with `allow_skipped_rows`.
    pub skipped_rows: usize,
    pub output: PathBuf,
    /// Set when survivors fell below the floor: how many posts to collect next run.
    pub replenish: Option<usize>,
}

impl TweetETL {
    pub fn new() -> Self {
        Self { opts: EtlOptions::default() }
    }

    pub fn from_options(opts: EtlOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &EtlOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn search_url(mut self, url: impl Into<String>) -> Self { self.opts = self.opts.with_search_url(url); self }
    pub fn lookup_url(mut self, url: impl Into<String>) -> Self { self.opts = self.opts.with_lookup_url(url); self }
    pub fn query(mut self, q: SearchQuery) -> Self { self.opts = self.opts.with_query(q); self }
    pub fn target_user_id(mut self, id: impl AsRef<str>) -> Self { self.opts = self.opts.with_target_user_id(id); self }
    pub fn allowed_handle(mut self, h: impl Into<String>) -> Self { self.opts = self.opts.with_allowed_handle(h); self }
    pub fn placeholder(mut self, p: impl Into<String>) -> Self { self.opts = self.opts.with_placeholder(p); self }
    pub fn total_to_collect(mut self, n: usize) -> Self { self.opts = self.opts.with_total_to_collect(n); self }
    pub fn save_location(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_save_location(p); self }
    pub fn sync_output(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_sync_output(p); self }
    pub fn rate_limit(mut self, ceiling: u32, cooldown: Duration) -> Self { self.opts = self.opts.with_rate_limit(ceiling, cooldown); self }
    pub fn lookup(mut self, batch_size: usize, delay: Duration) -> Self { self.opts = self.opts.with_lookup(batch_size, delay); self }
    pub fn floor(mut self, low: usize, high: usize) -> Self { self.opts = self.opts.with_floor(low, high); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn allow_skipped_rows(mut self, yes: bool) -> Self { self.opts = self.opts.with_allow_skipped_rows(yes); self }

    // -------- Operations --------

    /// Paginate → flatten → anonymise → split references. Nothing is written.
    pub fn collect_tidy<T: Transport + ?Sized>(
        &self,
        transport: &T,
        policy: &mut dyn RateLimitPolicy,
    ) -> Result<Vec<TidyRecord>> {
        init_tracing_once();
        let anonymiser = Anonymiser::new(&self.opts.allowed_handle, &self.opts.placeholder)?;

        let raw = Paginator::new(transport, self.opts.rate_limit)
            .progress(self.opts.progress)
            .collect(&self.opts.search_url, &self.opts.query, self.opts.total_to_collect, policy)?;
        let records = flatten(&raw);
        let anonymised = anonymiser.anonymise(&records, &self.opts.target_user_id)?;
        Ok(tidy(&anonymised))
    }

    /// Full collection run: collect, anonymise, tidy, then create or append the TSV.
    pub fn collect_and_anonymise<T: Transport + ?Sized>(
        &self,
        transport: &T,
        policy: &mut dyn RateLimitPolicy,
    ) -> Result<CollectSummary> {
        let dataset = self.collect_tidy(transport, policy)?;
        let path = &self.opts.save_location;
        let stats = write_dataset(&dataset, path, self.opts.write_buffer_bytes)
            .with_context(|| format!("writing {}", path.display()))?;

        let (earliest, latest) = created_at_span(&dataset);
        tracing::info!(
            written = stats.written,
            duplicates = stats.skipped_duplicates,
            path = %path.display(),
            "{} posts collected.",
            dataset.len()
        );
        Ok(CollectSummary {
            collected: dataset.len(),
            written: stats.written,
            skipped_duplicates: stats.skipped_duplicates,
            mode: stats.mode,
            path: path.clone(),
            earliest,
            latest,
        })
    }

    /// Re-verify stored posts upstream, drop the missing ones, and rewrite the file.
    ///
    /// Fails before any lookup if the stored file has rows that cannot be parsed,
    /// since the rewrite would lose them. `allow_skipped_rows(true)` overrides this.
    pub fn synchronise<T: Transport + ?Sized>(&self, transport: &T) -> Result<SyncSummary> {
        init_tracing_once();
        let stored_path = &self.opts.save_location;
        let (stored, skipped_rows) =
            read_dataset_counting(stored_path).with_context(|| format!("reading {}", stored_path.display()))?;
        if skipped_rows > 0 {
            if !self.opts.allow_skipped_rows {
                bail!(
                    "{} has {} row(s) that cannot be parsed; refusing to rewrite it (allow skipped rows to drop them)",
                    stored_path.display(),
                    skipped_rows
                );
            }
            tracing::warn!(skipped_rows, path = %stored_path.display(), "unparseable rows will be dropped from the rewrite");
        }
        let ids: Vec<String> = stored.iter().map(|r| r.id.clone()).collect();

        let outcome = Reconciler::new(transport, self.opts.lookup_url.clone(), self.opts.lookup)
            .progress(self.opts.progress)
            .reconcile(&ids)?;
        let synchronised = filter_out_missing(stored, &outcome.missing);

        let output = self.opts.sync_destination().to_path_buf();
        replace_dataset(&synchronised, &output, self.opts.write_buffer_bytes)
            .with_context(|| format!("writing {}", output.display()))?;

        let replenish = self.opts.floor.replenish_target(synchronised.len());
        if let Some(n) = replenish {
            tracing::warn!(
                "Total number of posts is below {}. Current size of dataset: {}.",
                self.opts.floor.low,
                synchronised.len()
            );
            tracing::warn!("Run a collection to replenish: set the total to collect to {}.", n);
        }

        Ok(SyncSummary {
            searched: outcome.searched,
            found: outcome.found.len(),
            removed: outcome.missing.len(),
            surviving: synchronised.len(),
            skipped_rows,
            output,
            replenish,
        })
    }
}

/// Earliest and latest parseable `created_at` values in the batch.
fn created_at_span(dataset: &[TidyRecord]) -> (Option<String>, Option<String>) {
    let mut min: Option<(time::OffsetDateTime, &str)> = None;
    let mut max: Option<(time::OffsetDateTime, &str)> = None;
    for r in dataset {
        let Ok(ts) = parse_api_timestamp(&r.created_at) else { continue };
        if min.map_or(true, |(m, _)| ts < m) { min = Some((ts, &r.created_at)); }
        if max.map_or(true, |(m, _)| ts > m) { max = Some((ts, &r.created_at)); }
    }
    (min.map(|(_, s)| s.to_string()), max.map(|(_, s)| s.to_string()))
}
