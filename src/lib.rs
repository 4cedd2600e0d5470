use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

pub mod apply;
pub mod compose;
pub mod export;
pub mod extract;
pub mod import;
pub mod ingest;
pub mod logging;
pub mod merge;
pub mod record;
pub mod settings;
pub mod sku;
pub mod store;

pub use export::ExportFormat;
pub use import::TranslationMap;
pub use merge::{MergeOutcome, MergeStats};
pub use record::Record;

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<String>,
    pub extract: bool,
    pub extract_columns: Option<Vec<String>>,
    pub batches_out: Option<PathBuf>,
    pub import_column: Option<String>,
    pub translated: Vec<PathBuf>,
    pub store_dir: Option<PathBuf>,
    pub settings_path: Option<String>,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let format = match config.format.as_deref() {
        Some(raw) => ExportFormat::parse(raw)?,
        None => ExportFormat::parse(&settings.export_format)?,
    };
    let store_dir = config
        .store_dir
        .clone()
        .or_else(|| settings.store_dir.clone())
        .unwrap_or_else(store::default_store_dir);
    let slots = store::SlotStore::new(store_dir);

    if let Some(column) = config.import_column.clone() {
        return run_import(&config, &settings, &slots, &column, format);
    }
    run_merge(&config, &settings, &slots, format)
}

/// Merge stage: ingest both datasets, join, persist the unified set, and
/// optionally extract translation batches.
fn run_merge(
    config: &Config,
    settings: &settings::Settings,
    slots: &store::SlotStore,
    format: ExportFormat,
) -> Result<String> {
    let primary_path = config
        .primary
        .as_deref()
        .ok_or_else(|| anyhow!("--primary is required to merge"))?;
    let secondary_path = config
        .secondary
        .as_deref()
        .ok_or_else(|| anyhow!("--secondary is required to merge"))?;

    let primary = ingest_file(slots, store::SLOT_PRIMARY, primary_path)?;
    let secondary = ingest_file(slots, store::SLOT_SECONDARY, secondary_path)?;

    let outcome = merge::join(&primary, &secondary);
    slots.save_records(store::SLOT_UNIFIED, "unified", &outcome.records)?;

    let output_path = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("unified.{}", format.extension())));
    let rendered = export::render(&outcome.records, format)?;
    fs::write(&output_path, rendered)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;

    let mut lines = vec![
        format!(
            "merged {} records ({} matched, {} primary-only, {} secondary-only)",
            outcome.records.len(),
            outcome.stats.matched,
            outcome.stats.primary_only,
            outcome.stats.secondary_only
        ),
        format!("wrote {}", output_path.display()),
    ];
    let skipped = outcome.stats.skipped_primary + outcome.stats.skipped_secondary;
    if skipped > 0 {
        lines.push(format!(
            "skipped {} records without a usable identifier ({} primary, {} secondary)",
            skipped, outcome.stats.skipped_primary, outcome.stats.skipped_secondary
        ));
    }

    if config.extract {
        let columns = config
            .extract_columns
            .clone()
            .unwrap_or_else(|| settings.extract_columns.clone());
        let bundle_path = config
            .batches_out
            .clone()
            .unwrap_or_else(|| PathBuf::from("translation_batches.zip"));
        let batch_count = extract_batches(&outcome.records, &columns, &bundle_path)?;
        lines.push(format!(
            "extracted {} batches across {} columns into {}",
            batch_count,
            columns.len(),
            bundle_path.display()
        ));
    }

    Ok(lines.join("\n"))
}

/// Import stage: parse translated batch files, reduce them to one value per
/// identifier, and apply them to the stored unified set.
fn run_import(
    config: &Config,
    settings: &settings::Settings,
    slots: &store::SlotStore,
    column: &str,
    format: ExportFormat,
) -> Result<String> {
    if config.translated.is_empty() {
        return Err(anyhow!("--import requires at least one --translated file"));
    }
    let unified = slots
        .load_records(store::SLOT_UNIFIED)?
        .ok_or_else(|| anyhow!("no unified set in the store; run a merge first"))?;

    let mut files = Vec::new();
    for path in &config.translated {
        let bytes = fs::read(path)
            .with_context(|| format!("failed to read translated file: {}", path.display()))?;
        files.push(ingest::parse(&bytes)?);
    }

    let outcome = import::import_translations(column, &files, settings.extra_variants(column))?;
    let map = import::reduce(&outcome.rows);
    let mapped = map.len();

    let mut maps = IndexMap::new();
    maps.insert(column.to_string(), map);
    let final_set = apply::apply_translations(&unified, &maps);

    let output_path = config
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("final.{}", format.extension())));
    let rendered = export::render(&final_set, format)?;
    fs::write(&output_path, rendered)
        .with_context(|| format!("failed to write output: {}", output_path.display()))?;

    let mut lines = vec![
        format!(
            "imported {} rows for '{}' ({} identifiers mapped)",
            outcome.rows.len(),
            column,
            mapped
        ),
        format!("wrote {}", output_path.display()),
    ];
    if outcome.dropped > 0 {
        lines.push(format!(
            "dropped {} rows without a translated value",
            outcome.dropped
        ));
    }
    Ok(lines.join("\n"))
}

fn ingest_file(slots: &store::SlotStore, slot: &str, path: &Path) -> Result<Vec<Record>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read dataset: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or(slot);
    let kind = if bytes.starts_with(b"PK\x03\x04") {
        "xlsx"
    } else {
        "csv"
    };
    slots.save(slot, name, kind, &bytes)?;
    ingest::parse(&bytes)
}

/// Renders every batch to csv, packages them into one zip, and writes it.
fn extract_batches(unified: &[Record], columns: &[String], bundle_path: &Path) -> Result<usize> {
    let batches = extract::extract(unified, columns)?;
    let mut files = IndexMap::new();
    let mut count = 0usize;
    for column_batches in batches.values() {
        for batch in column_batches {
            let rendered = export::to_csv(&batch.to_records())?;
            files.insert(format!("{}.csv", batch.name), rendered);
            count += 1;
        }
    }
    let bundle = export::bundle(&files)?;
    fs::write(bundle_path, bundle)
        .with_context(|| format!("failed to write bundle: {}", bundle_path.display()))?;
    Ok(count)
}
