use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use tracing::info;

use crate::record::{COL_DESCRIPTION, COL_ROW_INDEX, COL_SKU, Record};

/// Columns extracted for translation when the caller does not override
/// the set.
pub const DEFAULT_TARGET_COLUMNS: [&str; 4] = ["Title", "Category", "Subcategory", "Description"];

/// The one column whose values are long free text; its batches are
/// partitioned so a single translation file stays manageable.
pub const LARGE_TEXT_COLUMN: &str = COL_DESCRIPTION;

/// Rows per chunk of the large-text column.
pub const CHUNK_ROWS: usize = 600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRow {
    /// Position of the row in the unified set; global even inside chunks.
    pub row_index: usize,
    pub sku: String,
    pub value: String,
}

/// One exportable unit of rows for a single target column.
#[derive(Debug, Clone)]
pub struct Batch {
    pub name: String,
    pub column: String,
    pub rows: Vec<BatchRow>,
}

impl Batch {
    /// Flattens the batch into `{row_index, SKU, <column>}` records for the
    /// export renderer.
    pub fn to_records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = Record::new();
                record.set(COL_ROW_INDEX, row.row_index.to_string());
                record.set(COL_SKU, row.sku.clone());
                record.set(self.column.clone(), row.value.clone());
                record
            })
            .collect()
    }
}

/// Slices the requested columns of the unified set into translation
/// batches.
///
/// All-or-nothing: if any requested column is missing from the first
/// unified record's field set, nothing is extracted.
pub fn extract(unified: &[Record], columns: &[String]) -> Result<IndexMap<String, Vec<Batch>>> {
    let Some(first) = unified.first() else {
        return Err(anyhow!("unified set is empty, nothing to extract"));
    };
    let missing: Vec<&str> = columns
        .iter()
        .map(String::as_str)
        .filter(|column| !first.contains(column))
        .collect();
    if !missing.is_empty() {
        return Err(anyhow!(
            "unified set is missing extraction columns: {}",
            missing.join(", ")
        ));
    }

    let mut batches = IndexMap::new();
    for column in columns {
        let rows: Vec<BatchRow> = unified
            .iter()
            .enumerate()
            .map(|(position, record)| BatchRow {
                row_index: position,
                sku: record.get(COL_SKU).to_string(),
                value: record.get(column).to_string(),
            })
            .collect();

        let column_batches = if column.as_str() == LARGE_TEXT_COLUMN {
            chunk_rows(column, rows)
        } else {
            vec![Batch {
                name: column.clone(),
                column: column.clone(),
                rows,
            }]
        };
        info!(column = %column, batches = column_batches.len(), "extracted column");
        batches.insert(column.clone(), column_batches);
    }
    Ok(batches)
}

fn chunk_rows(column: &str, rows: Vec<BatchRow>) -> Vec<Batch> {
    if rows.is_empty() {
        return vec![Batch {
            name: column.to_string(),
            column: column.to_string(),
            rows,
        }];
    }
    let mut batches = Vec::new();
    let mut remaining = rows.as_slice();
    let mut part = 1usize;
    while !remaining.is_empty() {
        let take = remaining.len().min(CHUNK_ROWS);
        let (chunk, rest) = remaining.split_at(take);
        batches.push(Batch {
            name: format!("{}_part{}", column, part),
            column: column.to_string(),
            rows: chunk.to_vec(),
        });
        remaining = rest;
        part += 1;
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unified(count: usize) -> Vec<Record> {
        (0..count)
            .map(|i| {
                Record::from_iter([
                    ("SKU", format!("A{}", i)),
                    ("Title", format!("title {}", i)),
                    ("Category", "cat".to_string()),
                    ("Subcategory", "sub".to_string()),
                    ("Description", format!("text {}", i)),
                ])
            })
            .collect()
    }

    fn target_columns() -> Vec<String> {
        DEFAULT_TARGET_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn one_batch_per_plain_column() {
        let batches = extract(&unified(10), &target_columns()).unwrap();
        assert_eq!(batches["Title"].len(), 1);
        assert_eq!(batches["Title"][0].rows.len(), 10);
        assert_eq!(batches["Title"][0].rows[3].row_index, 3);
        assert_eq!(batches["Title"][0].rows[3].sku, "A3");
        assert_eq!(batches["Title"][0].rows[3].value, "title 3");
    }

    #[test]
    fn large_text_column_chunks_with_global_indices() {
        let batches = extract(&unified(1450), &target_columns()).unwrap();
        let description = &batches["Description"];
        assert_eq!(description.len(), 3);
        let counts: Vec<usize> = description.iter().map(|b| b.rows.len()).collect();
        assert_eq!(counts, vec![600, 600, 250]);

        let mut expected = 0usize;
        for batch in description {
            for row in &batch.rows {
                assert_eq!(row.row_index, expected);
                expected += 1;
            }
        }
        assert_eq!(expected, 1450);
        assert_eq!(description[1].name, "Description_part2");
    }

    #[test]
    fn missing_column_fails_without_partial_output() {
        let columns = vec!["Title".to_string(), "Nope".to_string()];
        let err = extract(&unified(3), &columns).unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn empty_unified_set_is_a_precondition_failure() {
        assert!(extract(&[], &target_columns()).is_err());
    }

    #[test]
    fn batch_records_carry_the_fixed_row_schema() {
        let batches = extract(&unified(2), &target_columns()).unwrap();
        let records = batches["Title"][0].to_records();
        let columns: Vec<_> = records[0].columns().collect();
        assert_eq!(columns, vec!["row_index", "SKU", "Title"]);
        assert_eq!(records[1].get("row_index"), "1");
    }
}
