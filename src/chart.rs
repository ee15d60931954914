//! Chart planning for a cleaned dataset.
//!
//! Given the axes a user picked and the numeric/categorical split, this module
//! lists the chart kinds that make sense and computes the series each one
//! would plot. Drawing is left to whatever front end consumes the series.

use std::{collections::BTreeMap, fmt};

use clap::ValueEnum;
use itertools::Itertools;
use serde::Serialize;

use crate::{
    classify::{ColumnSplit, numeric_values},
    dataset::{Dataset, format_number},
    error::CleanError,
};

const HISTOGRAM_BINS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[value(name = "hist")]
    Histogram,
    #[value(name = "bar_count")]
    BarCount,
    #[value(name = "pie_count")]
    PieCount,
    #[value(name = "bar")]
    BarMean,
    #[value(name = "pie")]
    PieSum,
    Scatter,
    Line,
    Scatter3d,
}

impl ChartKind {
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Histogram => "hist",
            ChartKind::BarCount => "bar_count",
            ChartKind::PieCount => "pie_count",
            ChartKind::BarMean => "bar",
            ChartKind::PieSum => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Line => "line",
            ChartKind::Scatter3d => "scatter3d",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Axes {
    pub x: String,
    pub y: Option<String>,
    pub z: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartOption {
    pub kind: ChartKind,
    pub description: String,
}

pub fn possible_charts(axes: &Axes, split: &ColumnSplit) -> Result<Vec<ChartOption>, CleanError> {
    let Axes { x, y, z } = axes;
    if !split.contains(x) {
        return Err(CleanError::UnknownColumn(x.clone()));
    }
    for axis in [y, z].into_iter().flatten() {
        if !split.contains(axis) {
            return Err(CleanError::UnknownColumn(axis.clone()));
        }
        if !split.is_numeric(axis) {
            return Err(CleanError::NotNumeric(axis.clone()));
        }
    }
    let option = |kind, description: String| ChartOption { kind, description };

    let options = match y {
        None if split.is_numeric(x) => vec![option(
            ChartKind::Histogram,
            format!("Histogram of {x}"),
        )],
        None => vec![
            option(ChartKind::BarCount, format!("Bars: frequency of {x} values")),
            option(ChartKind::PieCount, format!("Pie: frequency of {x} values")),
        ],
        Some(y) if !split.is_numeric(x) => vec![
            option(ChartKind::BarMean, format!("Bars: mean {y} per {x}")),
            option(ChartKind::PieSum, format!("Pie: share of {y} per {x}")),
        ],
        Some(y) => {
            let mut options = vec![
                option(ChartKind::Scatter, format!("Scatter: {y} vs {x}")),
                option(ChartKind::Line, format!("Line: {y} vs {x}")),
            ];
            if let Some(z) = z {
                options.push(option(
                    ChartKind::Scatter3d,
                    format!("3D scatter: {z} vs {x} & {y}"),
                ));
            }
            options
        }
    };
    Ok(options)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSeries {
    /// Label/value pairs (counts, means, or sums).
    Categories { labels: Vec<String>, values: Vec<f64> },
    /// Equal-width bins as `(lower, upper, count)`.
    Bins { bins: Vec<(f64, f64, usize)> },
    /// Coordinates, two or three per point.
    Points { points: Vec<Vec<f64>> },
}

impl ChartSeries {
    pub fn to_table(&self) -> (Vec<String>, Vec<Vec<String>>) {
        match self {
            ChartSeries::Categories { labels, values } => (
                vec!["label".to_string(), "value".to_string()],
                labels
                    .iter()
                    .zip(values)
                    .map(|(label, value)| vec![label.clone(), format_number(*value)])
                    .collect(),
            ),
            ChartSeries::Bins { bins } => (
                vec!["from".to_string(), "to".to_string(), "count".to_string()],
                bins.iter()
                    .map(|(lo, hi, count)| {
                        vec![format_number(*lo), format_number(*hi), count.to_string()]
                    })
                    .collect(),
            ),
            ChartSeries::Points { points } => {
                let width = points.first().map(Vec::len).unwrap_or(2);
                let headers = ["x", "y", "z"]
                    .iter()
                    .take(width)
                    .map(|h| h.to_string())
                    .collect();
                let rows = points
                    .iter()
                    .map(|point| point.iter().map(|v| format_number(*v)).collect())
                    .collect();
                (headers, rows)
            }
        }
    }
}

/// Computes what `kind` would plot for `axes`.
pub fn chart_series(
    dataset: &Dataset,
    kind: ChartKind,
    axes: &Axes,
    numeric_threshold: f64,
) -> Result<ChartSeries, CleanError> {
    let numeric = |name: &str| numeric_values(dataset, name, numeric_threshold);
    let required = |axis: &Option<String>| {
        axis.clone()
            .ok_or_else(|| CleanError::UnknownColumn(format!("{kind} requires a Y axis")))
    };

    match kind {
        ChartKind::Histogram => Ok(ChartSeries::Bins {
            bins: histogram(&numeric(&axes.x)?.into_iter().flatten().collect_vec()),
        }),
        ChartKind::BarCount | ChartKind::PieCount => {
            let labels = category_labels(dataset, &axes.x)?;
            let counts = labels.iter().flatten().counts();
            let (labels, values) = counts
                .into_iter()
                .sorted_by(|(a_label, a_count), (b_label, b_count)| {
                    b_count.cmp(a_count).then_with(|| a_label.cmp(b_label))
                })
                .map(|(label, count)| (label.clone(), count as f64))
                .unzip();
            Ok(ChartSeries::Categories { labels, values })
        }
        ChartKind::BarMean | ChartKind::PieSum => {
            let y = required(&axes.y)?;
            let labels = category_labels(dataset, &axes.x)?;
            let values = numeric(&y)?;
            let mut groups: BTreeMap<String, (f64, usize)> = BTreeMap::new();
            for (label, value) in labels.into_iter().zip(values) {
                let Some(label) = label else { continue };
                let slot = groups.entry(label).or_insert((0.0, 0));
                if let Some(value) = value {
                    slot.0 += value;
                    slot.1 += 1;
                }
            }
            let (labels, values) = groups
                .into_iter()
                .map(|(label, (sum, count))| {
                    let value = match kind {
                        ChartKind::BarMean if count == 0 => f64::NAN,
                        ChartKind::BarMean => sum / count as f64,
                        _ => sum,
                    };
                    (label, value)
                })
                .unzip();
            Ok(ChartSeries::Categories { labels, values })
        }
        ChartKind::Scatter | ChartKind::Line | ChartKind::Scatter3d => {
            let mut axis_values = vec![numeric(&axes.x)?, numeric(&required(&axes.y)?)?];
            if kind == ChartKind::Scatter3d {
                let z = axes.z.clone().ok_or_else(|| {
                    CleanError::UnknownColumn("scatter3d requires a Z axis".into())
                })?;
                axis_values.push(numeric(&z)?);
            }
            let rows = dataset.row_count();
            let points = (0..rows)
                .filter_map(|idx| {
                    axis_values
                        .iter()
                        .map(|values| values[idx])
                        .collect::<Option<Vec<f64>>>()
                })
                .collect();
            Ok(ChartSeries::Points { points })
        }
    }
}

/// Range and mean of a numeric axis over its number-like values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSummary {
    pub column: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl fmt::Display for AxisSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: min {}, max {}, mean {} over {} value(s)",
            self.column,
            format_number(self.min),
            format_number(self.max),
            format_number(self.mean),
            self.count
        )
    }
}

/// `None` when the column holds no finite number.
pub fn summarize_axis(
    dataset: &Dataset,
    name: &str,
    numeric_threshold: f64,
) -> Result<Option<AxisSummary>, CleanError> {
    let values = numeric_values(dataset, name, numeric_threshold)?
        .into_iter()
        .flatten()
        .filter(|value| value.is_finite())
        .collect_vec();
    let Some((min, max)) = values.iter().copied().minmax().into_option() else {
        return Ok(None);
    };
    Ok(Some(AxisSummary {
        column: name.to_string(),
        count: values.len(),
        min,
        max,
        mean: values.iter().sum::<f64>() / values.len() as f64,
    }))
}

fn category_labels(dataset: &Dataset, name: &str) -> Result<Vec<Option<String>>, CleanError> {
    let column = dataset
        .column(name)
        .ok_or_else(|| CleanError::UnknownColumn(name.to_string()))?;
    Ok(column
        .cells
        .iter()
        .map(|cell| (!cell.is_absent()).then(|| cell.as_display()))
        .collect())
}

fn histogram(values: &[f64]) -> Vec<(f64, f64, usize)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let Some((min, max)) = finite.iter().copied().minmax().into_option() else {
        return Vec::new();
    };
    let (lo, hi) = if min == max { (min - 0.5, max + 0.5) } else { (min, max) };
    let width = (hi - lo) / HISTOGRAM_BINS as f64;
    let mut counts = vec![0usize; HISTOGRAM_BINS];
    for value in finite {
        let idx = (((value - lo) / width) as usize).min(HISTOGRAM_BINS - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| {
            let from = lo + width * idx as f64;
            (from, from + width, count)
        })
        .collect()
}
