//! Import of externally translated batch files.
//!
//! Translators return the batch files with headers spelled in their own
//! locale, so column resolution runs a fallback chain: known header
//! variants, then the canonical column name, then field position. The
//! variant lists are static tables so the chain stays auditable; settings
//! may append extra spellings.

use anyhow::{Result, anyhow};
use indexmap::IndexMap;
use tracing::info;

use crate::record::{
    COL_CATEGORY, COL_DESCRIPTION, COL_ROW_INDEX, COL_SKU, COL_SUBCATEGORY, COL_TITLE, Record,
};

/// Identifier → translated value for one target column. Insertion order is
/// kept only for determinism; lookups are by identifier.
pub type TranslationMap = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRow {
    pub row_index: String,
    pub sku: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct ImportOutcome {
    pub rows: Vec<ImportedRow>,
    /// Rows whose translated value could not be resolved. Tracked, never
    /// escalated unless the whole import comes back empty.
    pub dropped: usize,
}

/// Known translated spellings per target column, lowercase.
fn header_variants(column: &str) -> &'static [&'static str] {
    match column {
        COL_TITLE => &[
            "title", "titel", "titre", "titolo", "título", "titulo", "tytuł", "titlu",
        ],
        COL_CATEGORY => &[
            "category",
            "kategorie",
            "catégorie",
            "categorie",
            "categoria",
            "categoría",
            "kategoria",
        ],
        COL_SUBCATEGORY => &[
            "subcategory",
            "unterkategorie",
            "sous-catégorie",
            "subcategorie",
            "sottocategoria",
            "subcategoría",
            "subcategoria",
            "podkategoria",
        ],
        COL_DESCRIPTION => &[
            "description",
            "beschreibung",
            "beschrijving",
            "descrizione",
            "descripción",
            "descripcion",
            "opis",
            "descriere",
        ],
        _ => &[],
    }
}

/// Parses all translated files for one target column into a single row
/// sequence.
///
/// Rows with no resolvable value are dropped and counted; missing row
/// indices and identifiers degrade to `"0"` / empty. With more than one
/// file the concatenation is stable-sorted by numeric `row_index`
/// (non-numeric indices last). Zero surviving rows is a failure.
pub fn import_translations(
    column: &str,
    files: &[Vec<Record>],
    extra_variants: &[String],
) -> Result<ImportOutcome> {
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for records in files {
        let Some(first) = records.first() else {
            continue;
        };
        let layout = FileLayout::resolve(first, column, extra_variants);
        for record in records {
            match layout.read_row(record) {
                Some(row) => rows.push(row),
                None => dropped += 1,
            }
        }
    }

    if files.len() > 1 {
        // Stable sort keeps within-file order for equal indices.
        rows.sort_by_key(|row| numeric_index(&row.row_index));
    }

    if rows.is_empty() {
        return Err(anyhow!(
            "no usable rows found in translated files for column '{}'",
            column
        ));
    }

    info!(column, rows = rows.len(), dropped, "imported translations");
    Ok(ImportOutcome { rows, dropped })
}

/// Reduces imported rows to one authoritative value per identifier,
/// last occurrence winning. Rows with an empty identifier are excluded.
pub fn reduce(rows: &[ImportedRow]) -> TranslationMap {
    let mut map = TranslationMap::new();
    for row in rows {
        if row.sku.is_empty() {
            continue;
        }
        map.insert(row.sku.clone(), row.value.clone());
    }
    map
}

fn numeric_index(raw: &str) -> u64 {
    raw.trim().parse::<u64>().unwrap_or(u64::MAX)
}

/// Column names resolved for one file; headers do not vary within a file.
struct FileLayout {
    index_column: Option<String>,
    sku_column: Option<String>,
    value_column: Option<String>,
}

impl FileLayout {
    fn resolve(first: &Record, column: &str, extra_variants: &[String]) -> Self {
        Self {
            index_column: find_column(first, &[COL_ROW_INDEX], 0),
            sku_column: find_column(first, &[COL_SKU], 1),
            value_column: resolve_value_column(first, column, extra_variants),
        }
    }

    fn read_row(&self, record: &Record) -> Option<ImportedRow> {
        let value_column = self.value_column.as_deref()?;
        if !record.contains(value_column) {
            return None;
        }
        let row_index = self
            .index_column
            .as_deref()
            .filter(|name| record.contains(name))
            .map(|name| record.get(name).to_string())
            .unwrap_or_else(|| "0".to_string());
        let sku = self
            .sku_column
            .as_deref()
            .map(|name| record.get(name).to_string())
            .unwrap_or_default();
        Some(ImportedRow {
            row_index,
            sku,
            value: record.get(value_column).to_string(),
        })
    }
}

fn resolve_value_column(first: &Record, column: &str, extra_variants: &[String]) -> Option<String> {
    for header in first.columns() {
        let lower = header.to_lowercase();
        if header_variants(column).iter().any(|variant| *variant == lower)
            || extra_variants.iter().any(|variant| variant.to_lowercase() == lower)
        {
            return Some(header.to_string());
        }
    }
    find_column(first, &[column], 2)
}

/// Case-insensitive name match over the header set, positional fallback.
fn find_column(first: &Record, names: &[&str], position: usize) -> Option<String> {
    for header in first.columns() {
        if names.iter().any(|name| name.eq_ignore_ascii_case(header)) {
            return Some(header.to_string());
        }
    }
    first.column_at(position).map(|name| name.to_string())
}
