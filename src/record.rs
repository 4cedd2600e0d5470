use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const COL_SKU: &str = "SKU";
pub const COL_TITLE: &str = "Title";
pub const COL_SUBCATEGORY: &str = "Subcategory";
pub const COL_CATEGORY: &str = "Category";
pub const COL_BRAND: &str = "Brand";
pub const COL_MATERIAL: &str = "Material";
pub const COL_DIMENSIONS: &str = "Dimensions";
pub const COL_WEIGHT: &str = "Weight";
pub const COL_GROSS_WEIGHT: &str = "Gross Weight";
pub const COL_VOLUME: &str = "Volume";
pub const COL_COLOR: &str = "Color";
pub const COL_PRICE: &str = "Price";
pub const COL_STOCK: &str = "Stock";
pub const COL_NAME: &str = "Name";
pub const COL_DESCRIPTION: &str = "Description";
pub const COL_SPECIFICATIONS: &str = "Specifications";
pub const COL_ROW_INDEX: &str = "row_index";

/// Bounds of the numbered field families (`Description 1..5`, `image1..12`).
pub const DESCRIPTION_SLOTS: usize = 5;
pub const IMAGE_SLOTS: usize = 12;

pub fn description_column(slot: usize) -> String {
    format!("Description {}", slot)
}

pub fn image_column(slot: usize) -> String {
    format!("image{}", slot)
}

/// One tabular row: an ordered mapping from column name to cell value.
///
/// Column sets are discovered from the data, not declared by a schema, so
/// two records from the same dataset may carry different columns. Absent
/// columns read as the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(column.into(), value.into());
    }

    pub fn contains(&self, column: &str) -> bool {
        self.fields.contains_key(column)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|value| value.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Column name at the given position, if any. Used by the positional
    /// fallbacks of the translation importer.
    pub fn column_at(&self, position: usize) -> Option<&str> {
        self.fields.get_index(position).map(|(name, _)| name.as_str())
    }

    /// Non-empty values of the `Description 1..N` family, in slot order.
    pub fn description_segments(&self) -> Vec<&str> {
        (1..=DESCRIPTION_SLOTS)
            .map(|slot| self.get(&description_column(slot)))
            .filter(|value| !value.trim().is_empty())
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}
