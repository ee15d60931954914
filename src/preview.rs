use anyhow::Result;
use log::info;

use crate::{classify, cli::PreviewArgs, config::CleanConfig, reader, table};

pub fn execute(args: &PreviewArgs, config: &CleanConfig) -> Result<()> {
    let loaded = reader::load_dataset(&args.input, config)?;
    let dataset = &loaded.dataset;
    let rows = dataset
        .display_rows()
        .into_iter()
        .take(args.rows)
        .collect::<Vec<_>>();

    if let Some(report) = &loaded.detection {
        println!("Detected {report}");
    }
    table::print_table(&dataset.headers(), &rows);

    let split = classify::classify_dataset(dataset, config.numeric_threshold);
    println!();
    println!("numeric: {}", split.numeric.join(", "));
    println!("categorical: {}", split.categorical.join(", "));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        rows.len(),
        dataset.row_count(),
        args.input
    );
    Ok(())
}
