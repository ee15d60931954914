//! Content-based numeric/categorical classification.
//!
//! Classification looks at what the cells contain, not at how the column was
//! declared when loaded. A text value counts as a number when it carries at
//! most one `.`/`,` separator in total and parses once `,` is read as the
//! decimal point; `"1,5"` is a number, `"1,5,3"` and `"1.2.3"` are not.

use serde::Serialize;

use crate::{
    dataset::{Cell, Dataset},
    error::CleanError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Categorical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub kind: ColumnKind,
    /// Parallel to the input cells when the column is numeric; `None` where a
    /// cell was absent or not number-like.
    pub coerced: Option<Vec<Option<f64>>>,
    pub number_like: usize,
    pub non_empty: usize,
}

impl Classification {
    pub fn is_numeric(&self) -> bool {
        self.kind == ColumnKind::Numeric
    }

    pub fn ratio(&self) -> f64 {
        if self.non_empty == 0 {
            0.0
        } else {
            self.number_like as f64 / self.non_empty as f64
        }
    }
}

/// Column names split by classification, each list in dataset order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSplit {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

impl ColumnSplit {
    pub fn is_numeric(&self, name: &str) -> bool {
        self.numeric.iter().any(|n| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.is_numeric(name) || self.categorical.iter().any(|n| n == name)
    }

    /// Numeric columns first, then categorical ones.
    pub fn all(&self) -> Vec<String> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .cloned()
            .collect()
    }
}

pub fn parse_number_like(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let separators = trimmed.chars().filter(|c| matches!(c, '.' | ',')).count();
    if separators > 1 {
        return None;
    }
    trimmed.replace(',', ".").parse::<f64>().ok()
}

pub fn cell_number(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(value) => Some(*value),
        Cell::Text(text) => parse_number_like(text),
        Cell::Absent => None,
    }
}

pub fn classify_column(cells: &[Cell], threshold: f64) -> Classification {
    let parsed: Vec<Option<f64>> = cells.iter().map(cell_number).collect();
    let non_empty = cells.iter().filter(|cell| !cell.is_absent()).count();
    let number_like = parsed.iter().filter(|value| value.is_some()).count();

    let numeric = non_empty > 0 && number_like as f64 / non_empty as f64 >= threshold;
    Classification {
        kind: if numeric {
            ColumnKind::Numeric
        } else {
            ColumnKind::Categorical
        },
        coerced: numeric.then_some(parsed),
        number_like,
        non_empty,
    }
}

pub fn classify_dataset(dataset: &Dataset, threshold: f64) -> ColumnSplit {
    let mut split = ColumnSplit::default();
    for column in &dataset.columns {
        match classify_column(&column.cells, threshold).kind {
            ColumnKind::Numeric => split.numeric.push(column.name.clone()),
            ColumnKind::Categorical => split.categorical.push(column.name.clone()),
        }
    }
    split
}

/// Coerced values of a named column, failing when the column is not numeric.
pub fn numeric_values(
    dataset: &Dataset,
    name: &str,
    threshold: f64,
) -> Result<Vec<Option<f64>>, CleanError> {
    let column = dataset
        .column(name)
        .ok_or_else(|| CleanError::UnknownColumn(name.to_string()))?;
    classify_column(&column.cells, threshold)
        .coerced
        .ok_or_else(|| CleanError::NotNumeric(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn texts(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Absent
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    #[test]
    fn single_separator_rule() {
        assert_eq!(parse_number_like("1200"), Some(1200.0));
        assert_eq!(parse_number_like(" 1,5 "), Some(1.5));
        assert_eq!(parse_number_like("3.25"), Some(3.25));
        assert_eq!(parse_number_like("1,5,3"), None);
        assert_eq!(parse_number_like("1.200,50"), None);
        assert_eq!(parse_number_like("45.5,-73.6"), None);
        assert_eq!(parse_number_like("abc"), None);
        assert_eq!(parse_number_like(""), None);
    }

    #[test]
    fn mixed_column_with_structured_text_is_categorical() {
        let result = classify_column(&texts(&["1200", "", "1,5,3"]), 0.8);
        assert_eq!(result.kind, ColumnKind::Categorical);
        assert_eq!(result.non_empty, 2);
        assert_eq!(result.number_like, 1);
        assert!((result.ratio() - 0.5).abs() < f64::EPSILON);
        assert!(result.coerced.is_none());
    }

    #[test]
    fn year_column_is_numeric_and_coerced() {
        let result = classify_column(&texts(&["2020", "2021", "2022"]), 0.8);
        assert_eq!(result.kind, ColumnKind::Numeric);
        assert_eq!(
            result.coerced,
            Some(vec![Some(2020.0), Some(2021.0), Some(2022.0)])
        );
    }

    #[test]
    fn numeric_column_tolerates_failed_coercions() {
        let cells = texts(&["1", "2", "3", "4", "n/d", ""]);
        let result = classify_column(&cells, 0.8);
        assert_eq!(result.kind, ColumnKind::Numeric);
        assert_eq!(
            result.coerced,
            Some(vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0), None, None])
        );
    }

    #[test]
    fn empty_column_is_categorical() {
        let result = classify_column(&[Cell::Absent, Cell::Absent], 0.8);
        assert_eq!(result.kind, ColumnKind::Categorical);
        assert_eq!(classify_column(&[], 0.8).kind, ColumnKind::Categorical);
    }

    #[test]
    fn threshold_is_inclusive() {
        let cells = texts(&["1", "2", "3", "4", "x"]);
        assert_eq!(classify_column(&cells, 0.8).kind, ColumnKind::Numeric);
        assert_eq!(classify_column(&cells, 0.81).kind, ColumnKind::Categorical);
    }

    #[test]
    fn stored_numbers_count_as_number_like() {
        let cells = vec![Cell::Number(1.0), Cell::Number(2.5), Cell::Absent];
        assert!(classify_column(&cells, 0.8).is_numeric());
    }

    #[test]
    fn classify_dataset_splits_in_column_order() {
        let dataset = Dataset::from_rows(
            vec!["region".into(), "annee".into(), "revenu".into()],
            vec![
                vec![Cell::Text("QC".into()), Cell::Number(2020.0), Cell::Text("1,5".into())],
                vec![Cell::Text("ON".into()), Cell::Number(2021.0), Cell::Text("2".into())],
            ],
        );
        let split = classify_dataset(&dataset, 0.8);
        assert_eq!(split.numeric, vec!["annee", "revenu"]);
        assert_eq!(split.categorical, vec!["region"]);
        assert_eq!(split.all(), vec!["annee", "revenu", "region"]);
        assert!(matches!(
            numeric_values(&dataset, "region", 0.8),
            Err(CleanError::NotNumeric(_))
        ));
    }

    fn cell_strategy() -> impl Strategy<Value = Cell> {
        prop_oneof![
            Just(Cell::Absent),
            (-1_000_000i64..1_000_000).prop_map(|v| Cell::Text(v.to_string())),
            (-10_000i32..10_000, 0u8..100)
                .prop_map(|(i, f)| Cell::Text(format!("{i},{f:02}"))),
            "[a-z]{1,6}".prop_map(Cell::Text),
            (0u8..100, 0u8..100, 0u8..100).prop_map(|(a, b, c)| Cell::Text(format!("{a}.{b}.{c}"))),
        ]
    }

    proptest! {
        #[test]
        fn classification_is_invariant_to_row_order(
            (cells, shuffled) in proptest::collection::vec(cell_strategy(), 0..40)
                .prop_flat_map(|cells| {
                    let shuffled = Just(cells.clone()).prop_shuffle();
                    (Just(cells), shuffled)
                })
        ) {
            prop_assert_eq!(
                classify_column(&cells, 0.8).kind,
                classify_column(&shuffled, 0.8).kind
            );
        }

        #[test]
        fn all_single_separator_numbers_are_numeric(
            values in proptest::collection::vec(
                (-100_000i64..100_000, 0u16..1000, any::<bool>()),
                1..30,
            )
        ) {
            let cells: Vec<Cell> = values
                .iter()
                .map(|(int, frac, comma)| {
                    let sep = if *comma { ',' } else { '.' };
                    Cell::Text(format!("{int}{sep}{frac}"))
                })
                .collect();
            prop_assert_eq!(classify_column(&cells, 0.8).kind, ColumnKind::Numeric);
        }

        #[test]
        fn multi_separator_values_are_never_number_like(
            parts in proptest::collection::vec(0u32..1000, 3..6),
            use_comma in any::<bool>()
        ) {
            let sep = if use_comma { "," } else { "." };
            let joined = parts.iter().map(u32::to_string).collect::<Vec<_>>().join(sep);
            prop_assert_eq!(parse_number_like(&joined), None);
        }

        #[test]
        fn words_only_columns_are_categorical(
            words in proptest::collection::vec("[a-df-mo-z]{1,8}", 1..30)
        ) {
            let cells: Vec<Cell> = words.into_iter().map(Cell::Text).collect();
            prop_assert_eq!(classify_column(&cells, 0.8).kind, ColumnKind::Categorical);
        }
    }
}
