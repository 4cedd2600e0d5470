use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use catalog_merger_rust::Config;

#[derive(Parser, Debug)]
#[command(
    name = "catalog-merger-rust",
    version,
    about = "Reconcile two product catalogs and round-trip translation batches"
)]
struct Cli {
    /// Primary dataset (commercial attributes), csv or xlsx
    #[arg(short = 'p', long = "primary")]
    primary: Option<PathBuf>,

    /// Secondary dataset (descriptive attributes), csv or xlsx
    #[arg(short = 's', long = "secondary")]
    secondary: Option<PathBuf>,

    /// Output path for the unified (or final) table
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Export format (csv, xlsx)
    #[arg(short = 'F', long = "format")]
    format: Option<String>,

    /// Extract translation batches after merging
    #[arg(short = 'x', long = "extract")]
    extract: bool,

    /// Columns to extract, comma separated (defaults to settings)
    #[arg(long = "extract-columns", value_delimiter = ',')]
    extract_columns: Option<Vec<String>>,

    /// Output path for the batch bundle zip
    #[arg(long = "batches-out")]
    batches_out: Option<PathBuf>,

    /// Import translated files for this column and write the final table
    #[arg(short = 'i', long = "import")]
    import: Option<String>,

    /// Translated batch file (repeatable)
    #[arg(short = 't', long = "translated")]
    translated: Vec<PathBuf>,

    /// Directory holding the dataset slots
    #[arg(long = "store-dir")]
    store_dir: Option<PathBuf>,

    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings")]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose")]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    catalog_merger_rust::logging::init(cli.verbose)?;

    let config = Config {
        primary: cli.primary,
        secondary: cli.secondary,
        output: cli.output,
        format: cli.format,
        extract: cli.extract,
        extract_columns: cli.extract_columns,
        batches_out: cli.batches_out,
        import_column: cli.import,
        translated: cli.translated,
        store_dir: cli.store_dir,
        settings_path: cli.read_settings,
    };

    let output = catalog_merger_rust::run(config)?;
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}
