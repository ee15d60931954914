pub mod chart;
pub mod classify;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod error;
pub mod import;
pub mod io_utils;
pub mod normalize;
pub mod pipeline;
pub mod preview;
pub mod reader;
pub mod reconcile;
pub mod registry;
pub mod table;
pub mod workspace;

use std::{
    env,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use log::{LevelFilter, debug, info};

use crate::{
    chart::Axes,
    classify::{ColumnSplit, classify_column},
    cli::{Cli, Commands, DetectionArgs},
    config::{CleanConfig, WorkspaceLayout},
    dataset::Dataset,
    import::ImportOutcome,
    pipeline::CleanOutcome,
    reconcile::SynonymTable,
    registry::{JsonFileRegistry, NameRegistry},
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_clean", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.workspace.as_deref())?;
    match cli.command {
        Commands::Import(args) => {
            handle_import(&args.sources, args.name.as_deref(), &config).map(|_| ())
        }
        Commands::Clean(args) => handle_clean(&args, with_detection(config, &args.detection)),
        Commands::Classify(args) => handle_classify(&args, &config),
        Commands::Preview(args) => {
            let config = with_detection(config, &args.detection);
            preview::execute(&args, &config)
        }
        Commands::Chart(args) => handle_chart(&args, &config),
        Commands::Run(args) => handle_run(&args, with_detection(config, &args.detection)),
        Commands::List => handle_list(&config),
        Commands::Config(args) => handle_config(&args, &config),
    }
}

fn load_config(path: Option<&Path>, workspace: Option<&Path>) -> Result<CleanConfig> {
    let mut config = CleanConfig::load_or_default(path)?;
    if let Some(root) = workspace {
        config.workspace = WorkspaceLayout::rooted_at(root);
    }
    config.validate()?;
    debug!("Effective configuration: {config:?}");
    Ok(config)
}

fn with_detection(mut config: CleanConfig, args: &DetectionArgs) -> CleanConfig {
    if let Some(label) = &args.input_encoding {
        config.detection.encoding = Some(label.clone());
    }
    if let Some(delimiter) = args.delimiter {
        config.detection.delimiter = Some(delimiter);
    }
    config
}

fn handle_import(
    sources: &[String],
    name: Option<&str>,
    config: &CleanConfig,
) -> Result<ImportOutcome> {
    let layout = &config.workspace;
    workspace::ensure_dirs(layout)?;
    let mut registry = JsonFileRegistry::open(&layout.registry_path)
        .with_context(|| format!("Opening registry {:?}", layout.registry_path))?;
    let sources = import::split_sources(sources);
    if sources.is_empty() {
        bail!("No source given");
    }
    let outcome = import::import_sources(&sources, name, config, &mut registry)
        .ok_or_else(|| anyhow!("None of the {} source(s) could be imported", sources.len()))?;
    println!(
        "Imported '{}' as '{}' ({}) -> {}",
        outcome.entry.source,
        outcome.name,
        outcome.entry.encoding,
        outcome.path.display()
    );
    Ok(outcome)
}

fn handle_clean(args: &cli::CleanArgs, config: CleanConfig) -> Result<()> {
    let input = workspace::resolve_input(args.input.as_deref(), &config.workspace)?;
    info!("Cleaning {:?}", input);
    let outcome = pipeline::clean_file(&input, &config)?;
    print_clean_summary(&input, &outcome);
    Ok(())
}

fn print_clean_summary(input: &Path, outcome: &CleanOutcome) {
    println!("Cleaned {} -> {}", input.display(), outcome.output.display());
    if let Some(report) = &outcome.detection {
        println!("  detected {report}");
    }
    println!(
        "  rows {} -> {}, columns {} -> {}",
        outcome.rows_in, outcome.rows_out, outcome.columns_in, outcome.columns_out
    );
    let dropped = outcome.structural.duplicates_dropped + outcome.fill_duplicates_dropped;
    println!(
        "  dropped {} empty row(s), {} empty column(s), {} duplicate row(s)",
        outcome.structural.rows_dropped_empty, outcome.structural.columns_dropped_empty, dropped
    );
    for (from, to) in outcome.renames.iter() {
        println!("  renamed {from} -> {to}");
    }
}

fn load_cleaned(input: Option<&str>, config: &CleanConfig) -> Result<(PathBuf, Dataset)> {
    let path = workspace::resolve_cleaned(input, &config.workspace, &config.output_suffix)?;
    let loaded = reader::load_dataset(&path, config)
        .with_context(|| format!("Loading cleaned file {path:?}"))?;
    Ok((path, loaded.dataset))
}

fn handle_classify(args: &cli::ClassifyArgs, config: &CleanConfig) -> Result<()> {
    let mut config = config.clone();
    if let Some(threshold) = args.threshold {
        config.numeric_threshold = threshold;
        config.validate()?;
    }
    let (path, dataset) = load_cleaned(args.input.as_deref(), &config)?;
    let split = classify::classify_dataset(&dataset, config.numeric_threshold);
    if args.json {
        let payload = serde_json::json!({
            "input": path,
            "numeric": split.numeric,
            "categorical": split.categorical,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_classification(&dataset, config.numeric_threshold);
    }
    info!(
        "Classified {} column(s) of {:?}: {} numeric, {} categorical",
        dataset.column_count(),
        path,
        split.numeric.len(),
        split.categorical.len()
    );
    Ok(())
}

fn print_classification(dataset: &Dataset, threshold: f64) {
    let headers = ["column", "kind", "number-like", "non-empty"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = dataset
        .columns
        .iter()
        .map(|column| {
            let classification = classify_column(&column.cells, threshold);
            vec![
                column.name.clone(),
                if classification.is_numeric() {
                    "numeric".to_string()
                } else {
                    "categorical".to_string()
                },
                classification.number_like.to_string(),
                classification.non_empty.to_string(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
}

fn handle_chart(args: &cli::ChartArgs, config: &CleanConfig) -> Result<()> {
    let (path, dataset) = load_cleaned(args.input.as_deref(), config)?;
    let split: ColumnSplit = classify::classify_dataset(&dataset, config.numeric_threshold);
    let axes = Axes {
        x: args.x.clone(),
        y: args.y.clone(),
        z: args.z.clone(),
    };
    let options = chart::possible_charts(&axes, &split)?;
    let y_summary = match &axes.y {
        Some(y) => chart::summarize_axis(&dataset, y, config.numeric_threshold)?,
        None => None,
    };

    let Some(kind) = args.kind else {
        let headers = vec!["kind".to_string(), "description".to_string()];
        let rows = options
            .iter()
            .map(|option| vec![option.kind.to_string(), option.description.clone()])
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
        if let Some(summary) = &y_summary {
            println!("{summary}");
        }
        return Ok(());
    };
    if !options.iter().any(|option| option.kind == kind) {
        let available = options
            .iter()
            .map(|option| option.kind.label())
            .collect::<Vec<_>>()
            .join(", ");
        bail!("Chart '{kind}' does not fit these axes (available: {available})");
    }

    let series = chart::chart_series(&dataset, kind, &axes, config.numeric_threshold)?;
    if args.json {
        let payload = serde_json::json!({
            "kind": kind.label(),
            "series": series,
            "y_summary": y_summary,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let (headers, rows) = series.to_table();
        table::print_table(&headers, &rows);
        if let Some(summary) = &y_summary {
            println!("{summary}");
        }
    }
    info!("Computed {kind} series from {:?}", path);
    Ok(())
}

fn handle_run(args: &cli::RunArgs, config: CleanConfig) -> Result<()> {
    let imported = handle_import(&args.sources, args.name.as_deref(), &config)?;
    let outcome = pipeline::clean_file(&imported.path, &config)?;
    print_clean_summary(&imported.path, &outcome);

    let loaded = reader::load_dataset(&outcome.output, &config)?;
    let split = classify::classify_dataset(&loaded.dataset, config.numeric_threshold);
    println!("numeric: {}", split.numeric.join(", "));
    println!("categorical: {}", split.categorical.join(", "));
    Ok(())
}

fn handle_list(config: &CleanConfig) -> Result<()> {
    let layout = &config.workspace;
    let registry = JsonFileRegistry::open(&layout.registry_path)
        .with_context(|| format!("Opening registry {:?}", layout.registry_path))?;
    let rows = registry
        .names()
        .filter_map(|name| {
            let entry = registry.lookup(name)?;
            let imported_at = entry
                .imported_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default();
            Some(vec![
                name.to_string(),
                entry.source,
                entry.encoding,
                imported_at,
            ])
        })
        .collect::<Vec<_>>();
    if rows.is_empty() {
        println!("No imports registered in {}", layout.registry_path.display());
    } else {
        let headers = ["name", "source", "encoding", "imported"]
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
    }

    let cleaned = workspace::list_cleaned(layout, &config.output_suffix)?;
    println!("Cleaned files: {}", cleaned.len());
    for path in &cleaned {
        println!("  {}", path.display());
    }
    Ok(())
}

fn handle_config(args: &cli::ConfigArgs, config: &CleanConfig) -> Result<()> {
    if let Some(path) = &args.write {
        config.save(path)?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }
    let synonyms = SynonymTable::from_config(&config.synonyms)?;
    if synonyms.is_empty() {
        println!("No synonyms configured");
    } else {
        let headers = vec!["canonical".to_string(), "variants".to_string()];
        let rows = synonyms
            .entries()
            .iter()
            .map(|entry| vec![entry.canonical.clone(), entry.variants().join(", ")])
            .collect::<Vec<_>>();
        table::print_table(&headers, &rows);
    }
    println!(
        "similarity threshold {}, numeric threshold {}",
        config.similarity_threshold, config.numeric_threshold
    );
    Ok(())
}
