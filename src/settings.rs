use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::extract::DEFAULT_TARGET_COLUMNS;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub export_format: String,
    pub store_dir: Option<PathBuf>,
    pub extract_columns: Vec<String>,
    /// Extra accepted header spellings per unified column, merged after the
    /// built-in variant tables of the translation importer.
    pub header_variants: HashMap<String, Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            export_format: "csv".to_string(),
            store_dir: None,
            extract_columns: DEFAULT_TARGET_COLUMNS
                .iter()
                .map(|column| column.to_string())
                .collect(),
            header_variants: HashMap::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    export: Option<ExportSettings>,
    store: Option<StoreSettings>,
    extract: Option<ExtractSettings>,
    headers: Option<HashMap<String, Vec<String>>>,
}

#[derive(Debug, Default, Deserialize)]
struct ExportSettings {
    format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StoreSettings {
    dir: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ExtractSettings {
    columns: Option<Vec<String>>,
}

/// Loads layered settings: the compiled-in defaults, then `settings.toml`
/// and `settings.local.toml` from the working directory, then an explicit
/// path. Later layers override earlier ones.
pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    let embedded: SettingsFile = toml::from_str(DEFAULT_SETTINGS_TOML)
        .with_context(|| "failed to parse embedded settings")?;
    settings.merge(embedded);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            let parsed: SettingsFile = toml::from_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
            settings.merge(parsed);
        }
    }

    Ok(settings)
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(export) = incoming.export {
            if let Some(format) = export.format {
                if !format.trim().is_empty() {
                    self.export_format = format.trim().to_string();
                }
            }
        }
        if let Some(store) = incoming.store {
            if let Some(dir) = store.dir {
                if !dir.trim().is_empty() {
                    self.store_dir = Some(PathBuf::from(dir.trim()));
                }
            }
        }
        if let Some(extract) = incoming.extract {
            if let Some(columns) = extract.columns {
                if !columns.is_empty() {
                    self.extract_columns = columns;
                }
            }
        }
        if let Some(headers) = incoming.headers {
            for (column, variants) in headers {
                self.header_variants
                    .entry(column)
                    .or_default()
                    .extend(variants);
            }
        }
    }

    pub fn extra_variants(&self, column: &str) -> &[String] {
        self.header_variants
            .get(column)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_the_four_target_columns() {
        let settings = Settings::default();
        assert_eq!(settings.export_format, "csv");
        assert_eq!(
            settings.extract_columns,
            vec!["Title", "Category", "Subcategory", "Description"]
        );
    }

    #[test]
    fn merge_overrides_without_clearing_unset_fields() {
        let mut settings = Settings::default();
        let parsed: SettingsFile = toml::from_str(
            r#"
            [export]
            format = "xlsx"

            [headers]
            Title = ["Überschrift"]
            "#,
        )
        .unwrap();
        settings.merge(parsed);
        assert_eq!(settings.export_format, "xlsx");
        assert_eq!(settings.extract_columns.len(), 4);
        assert_eq!(settings.extra_variants("Title"), ["Überschrift"]);
        assert!(settings.extra_variants("Category").is_empty());
    }

    #[test]
    fn missing_explicit_settings_path_is_an_error() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
