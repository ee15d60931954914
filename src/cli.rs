use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::chart::ChartKind;

#[derive(Debug, Parser)]
#[command(author, version, about = "Import, clean, and classify tabular files", long_about = None)]
pub struct Cli {
    /// YAML configuration file (synonyms, thresholds, detection policy)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Workspace root holding raw/, cleaned/ and the registry (overrides the config)
    #[arg(short, long, global = true)]
    pub workspace: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Copy or download one or more sources into the raw directory
    Import(ImportArgs),
    /// Clean a raw file and write it to the cleaned directory
    Clean(CleanArgs),
    /// Split the columns of a cleaned file into numeric and categorical
    Classify(ClassifyArgs),
    /// Preview the first few rows of any supported file in a formatted table
    Preview(PreviewArgs),
    /// List chart options for the chosen axes, or compute one chart's series
    Chart(ChartArgs),
    /// Import, clean, and classify in one go
    Run(RunArgs),
    /// List registered imports and the cleaned files in the workspace
    List,
    /// Show the synonym table in effect, or write the effective configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Local paths or http(s) URLs; comma-separated lists are accepted
    #[arg(required = true)]
    pub sources: Vec<String>,
    /// Workspace name to register the import under (derived from the source when omitted)
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct DetectionArgs {
    /// Character encoding of the input file (detected when omitted)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|'; detected when omitted)
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    /// Raw file path or workspace name (defaults to the last import)
    pub input: Option<String>,
    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Debug, Args)]
pub struct ClassifyArgs {
    /// Cleaned file path or workspace name (defaults to the latest cleaned file)
    pub input: Option<String>,
    /// Share of number-like values needed for a numeric column
    #[arg(long)]
    pub threshold: Option<f64>,
    /// Print the split as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// File to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Cleaned file path or workspace name (defaults to the latest cleaned file)
    pub input: Option<String>,
    /// Column for the X axis
    #[arg(short = 'x', long)]
    pub x: String,
    /// Numeric column for the Y axis
    #[arg(short = 'y', long)]
    pub y: Option<String>,
    /// Numeric column for the Z axis (3D scatter)
    #[arg(short = 'z', long, requires = "y")]
    pub z: Option<String>,
    /// Chart to compute; only the options are listed when omitted
    #[arg(short, long, value_enum)]
    pub kind: Option<ChartKind>,
    /// Print the series as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Local paths or http(s) URLs; comma-separated lists are accepted
    #[arg(required = true)]
    pub sources: Vec<String>,
    /// Workspace name for the import
    #[arg(short, long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub detection: DetectionArgs,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration as YAML to this path
    #[arg(long)]
    pub write: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
