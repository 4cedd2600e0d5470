use indexmap::IndexMap;
use tracing::info;

use crate::import::TranslationMap;
use crate::record::{COL_SKU, Record};

/// Applies per-column translation maps to a copy of the unified set.
///
/// Pure over its inputs: the unified set is deep-copied and only values
/// whose identifier appears in a map are overwritten. Rows with an empty
/// identifier are never touched. Zero substitutions is a valid outcome,
/// and re-applying the same maps is a no-op.
pub fn apply_translations(
    unified: &[Record],
    maps: &IndexMap<String, TranslationMap>,
) -> Vec<Record> {
    let mut substituted = 0usize;
    let records = unified
        .iter()
        .cloned()
        .map(|mut record| {
            let sku = record.get(COL_SKU).to_string();
            if sku.is_empty() {
                return record;
            }
            for (column, map) in maps {
                if let Some(value) = map.get(&sku) {
                    record.set(column.clone(), value.clone());
                    substituted += 1;
                }
            }
            record
        })
        .collect();
    info!(substituted, columns = maps.len(), "applied translations");
    records
}
