use indexmap::IndexMap;
use tracing::info;

use crate::compose;
use crate::record::{COL_SKU, Record};
use crate::sku;

/// Counters describing one join run. Records without a usable identifier
/// never reach the join; the skip counts make that visible to callers
/// without changing the joined output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub matched: usize,
    pub primary_only: usize,
    pub secondary_only: usize,
    pub skipped_primary: usize,
    pub skipped_secondary: usize,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub records: Vec<Record>,
    pub stats: MergeStats,
}

/// Reconciles the two datasets into one unified record per normalized key.
///
/// Output order: both-present and primary-only items in primary insertion
/// order, then unmatched secondary items in secondary insertion order.
/// Joining never fails; with zero overlapping keys it degrades to a
/// concatenation of the two datasets.
pub fn join(primary: &[Record], secondary: &[Record]) -> MergeOutcome {
    let (primary_index, skipped_primary) = build_index(primary);
    let (mut secondary_index, skipped_secondary) = build_index(secondary);

    let mut stats = MergeStats {
        skipped_primary,
        skipped_secondary,
        ..MergeStats::default()
    };
    let mut records = Vec::with_capacity(primary_index.len() + secondary_index.len());

    for (key, primary_record) in &primary_index {
        match secondary_index.shift_remove(key) {
            Some(secondary_record) => {
                records.push(compose::compose_matched(key, primary_record, &secondary_record));
                stats.matched += 1;
            }
            None => {
                records.push(compose::compose_primary_only(key, primary_record));
                stats.primary_only += 1;
            }
        }
    }
    for (key, secondary_record) in &secondary_index {
        records.push(compose::compose_secondary_only(key, secondary_record));
        stats.secondary_only += 1;
    }

    info!(
        matched = stats.matched,
        primary_only = stats.primary_only,
        secondary_only = stats.secondary_only,
        skipped_primary = stats.skipped_primary,
        skipped_secondary = stats.skipped_secondary,
        "joined datasets"
    );

    MergeOutcome { records, stats }
}

/// Keyed lookup over one dataset: normalized key to the last record seen
/// with that key, in first-seen order.
fn build_index(records: &[Record]) -> (IndexMap<String, Record>, usize) {
    let mut index = IndexMap::new();
    let mut skipped = 0usize;
    for record in records {
        let key = sku::normalize(record.get(COL_SKU));
        if key.is_empty() {
            skipped += 1;
            continue;
        }
        index.insert(key, record.clone());
    }
    (index, skipped)
}
