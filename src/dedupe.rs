use crate::references::TidyRecord;
use std::collections::HashSet;

/// Keep the first occurrence of each id, skipping ids already in `seen`.
/// Returns the kept records (in input order) and how many were dropped.
/// `seen` is extended with every kept id.
pub fn dedupe_by_id(records: &[TidyRecord], seen: &mut HashSet<String>) -> (Vec<TidyRecord>, usize) {
    let mut kept = Vec::with_capacity(records.len());
    let mut dropped = 0usize;
    for r in records {
        if seen.insert(r.id.clone()) {
            kept.push(r.clone());
        } else {
            dropped += 1;
        }
    }
    (kept, dropped)
}
