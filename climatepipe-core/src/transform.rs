//! Declarative table transformation.
//!
//! Each dataset declares a [`TableSpec`]: which source columns survive, what
//! they are renamed to, how cells are derived, how missing values are
//! handled, and which filter and aggregation run. Steps apply in a fixed
//! order: project → rename → derive → missing policy → filter → group.
//! The output column set is always exactly the declared targets.

use crate::error::PipelineError;
use crate::table::{Table, Value};
use std::collections::BTreeMap;

/// How a projected cell is derived from its source cell.
///
/// Derivations are explicit — a target column never appears without one of
/// these naming where its values come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellParse {
    /// Carry the parsed cell through unchanged.
    Keep,
    /// Require an integer; unparseable cells become Null.
    AsInt,
    /// Require a float (integers widen); unparseable cells become Null.
    AsFloat,
    /// Extract the year from a date cell in the given `chrono` format.
    YearFromDate { format: String },
}

impl CellParse {
    fn apply(&self, value: &Value) -> Value {
        match self {
            CellParse::Keep => value.clone(),
            CellParse::AsInt => match value {
                Value::Int(i) => Value::Int(*i),
                Value::Float(f) if f.fract() == 0.0 => Value::Int(*f as i64),
                _ => Value::Null,
            },
            CellParse::AsFloat => match value.as_f64() {
                Some(f) => Value::Float(f),
                None => Value::Null,
            },
            CellParse::YearFromDate { format } => match value {
                // A bare year survives a sloppy export; a real date is parsed.
                Value::Int(i) => Value::Int(*i),
                Value::Text(s) => match chrono::NaiveDate::parse_from_str(s, format) {
                    Ok(date) => Value::Int(i64::from(chrono::Datelike::year(&date))),
                    Err(_) => Value::Null,
                },
                _ => Value::Null,
            },
        }
    }
}

/// One projected column: source name, target name, derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub source: String,
    pub target: String,
    pub parse: CellParse,
}

impl ColumnMap {
    /// Same name in and out, cell carried through.
    pub fn keep(name: &str) -> Self {
        Self {
            source: name.to_string(),
            target: name.to_string(),
            parse: CellParse::Keep,
        }
    }

    pub fn renamed(source: &str, target: &str, parse: CellParse) -> Self {
        Self {
            source: source.to_string(),
            target: target.to_string(),
            parse,
        }
    }
}

/// What to do with rows that have missing values after derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPolicy {
    /// Drop any row with a Null in any projected column.
    DropRow,
    /// Replace Nulls in numeric columns with the column mean over non-missing
    /// values. Non-numeric columns are left untouched. A column with no
    /// non-missing numeric value keeps its Nulls — no value is invented.
    ImputeNumericMean,
}

/// Row predicate applied after the missing policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowFilter {
    /// Keep rows whose integer `column` lies in `[min, max]` (inclusive).
    YearRange {
        column: String,
        min: i64,
        max: i64,
    },
}

/// Named reducer for grouped aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Mean,
    Sum,
}

/// Group-by keys plus the reducer applied to every non-key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpec {
    pub keys: Vec<String>,
    pub reduce: Reducer,
}

/// The full declarative transform for one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub columns: Vec<ColumnMap>,
    pub missing: MissingPolicy,
    pub filter: Option<RowFilter>,
    pub group: Option<GroupSpec>,
}

impl TableSpec {
    /// Target column names in output order.
    ///
    /// With a `group`, keys come first (in key order) followed by the
    /// remaining targets in declaration order — the order the clean table
    /// will carry into the store.
    pub fn target_columns(&self) -> Vec<String> {
        match &self.group {
            None => self.columns.iter().map(|m| m.target.clone()).collect(),
            Some(group) => {
                let mut out = group.keys.clone();
                for map in &self.columns {
                    if !group.keys.contains(&map.target) {
                        out.push(map.target.clone());
                    }
                }
                out
            }
        }
    }

    /// Apply the transform to a raw table.
    pub fn apply(&self, raw: &Table, dataset: &str) -> Result<Table, PipelineError> {
        // Project + rename + derive.
        let indexes: Vec<usize> = self
            .columns
            .iter()
            .map(|map| {
                raw.column_index(&map.source)
                    .ok_or_else(|| PipelineError::MissingColumn {
                        dataset: dataset.to_string(),
                        column: map.source.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut projected = Table::new(self.columns.iter().map(|m| m.target.clone()).collect());
        for row in raw.rows() {
            let cells = indexes
                .iter()
                .zip(&self.columns)
                .map(|(&idx, map)| map.parse.apply(&row[idx]))
                .collect();
            projected.push_row(cells);
        }

        // Missing policy.
        let mut clean = match self.missing {
            MissingPolicy::DropRow => {
                projected.retain_rows(|row| !row.iter().any(Value::is_null));
                projected
            }
            MissingPolicy::ImputeNumericMean => impute_numeric_mean(projected),
        };

        // Filter.
        if let Some(filter) = &self.filter {
            apply_filter(filter, &mut clean, dataset)?;
        }

        // Group + aggregate.
        match &self.group {
            None => Ok(clean),
            Some(group) => apply_group(group, &clean, dataset),
        }
    }
}

/// Replace Nulls in numeric columns with the column mean over non-missing
/// values; columns containing any text are left untouched.
fn impute_numeric_mean(table: Table) -> Table {
    let width = table.columns().len();

    let mut means: Vec<Option<f64>> = vec![None; width];
    for idx in 0..width {
        let mut sum = 0.0;
        let mut count = 0usize;
        let mut numeric = true;
        for row in table.rows() {
            match &row[idx] {
                Value::Text(_) => {
                    numeric = false;
                    break;
                }
                value => {
                    if let Some(f) = value.as_f64() {
                        sum += f;
                        count += 1;
                    }
                }
            }
        }
        if numeric && count > 0 {
            means[idx] = Some(sum / count as f64);
        }
    }

    let filled: Vec<Vec<Value>> = table
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, value)| match (value, means[idx]) {
                    (Value::Null, Some(mean)) => Value::Float(mean),
                    _ => value.clone(),
                })
                .collect()
        })
        .collect();

    let mut out = Table::new(table.columns().to_vec());
    for row in filled {
        out.push_row(row);
    }
    out
}

fn apply_filter(
    filter: &RowFilter,
    table: &mut Table,
    dataset: &str,
) -> Result<(), PipelineError> {
    match filter {
        RowFilter::YearRange { column, min, max } => {
            let idx = table
                .column_index(column)
                .ok_or_else(|| PipelineError::MissingColumn {
                    dataset: dataset.to_string(),
                    column: column.clone(),
                })?;
            table.retain_rows(|row| match row[idx].as_i64() {
                Some(year) => (*min..=*max).contains(&year),
                None => false,
            });
            Ok(())
        }
    }
}

/// Orderable rendering of a group key cell. Grouping on floats is rejected
/// up front — float keys cannot be compared reliably.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyCell {
    Null,
    Int(i64),
    Text(String),
}

struct Accumulator {
    values: Vec<f64>,
    int_sum: i64,
    all_int: bool,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            int_sum: 0,
            all_int: true,
        }
    }

    fn push(&mut self, value: &Value) {
        match value {
            Value::Int(i) => {
                self.values.push(*i as f64);
                self.int_sum += *i;
            }
            Value::Float(f) => {
                self.values.push(*f);
                self.all_int = false;
            }
            // Nulls are skipped, matching mean/sum over non-missing values.
            _ => {}
        }
    }

    /// Floats are summed in a canonical order so the result is bit-identical
    /// for any input row order.
    fn reduce(&self, reducer: Reducer) -> Value {
        if self.values.is_empty() {
            return Value::Null;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(f64::total_cmp);
        let sum: f64 = sorted.iter().sum();
        match reducer {
            Reducer::Mean => Value::Float(sum / sorted.len() as f64),
            Reducer::Sum if self.all_int => Value::Int(self.int_sum),
            Reducer::Sum => Value::Float(sum),
        }
    }
}

/// Group rows by the key columns and reduce every non-key column.
///
/// Groups are accumulated into a `BTreeMap`, so emission order is the sorted
/// key order — permuting input rows cannot change the output.
fn apply_group(
    group: &GroupSpec,
    table: &Table,
    dataset: &str,
) -> Result<Table, PipelineError> {
    let key_indexes: Vec<usize> = group
        .keys
        .iter()
        .map(|key| {
            table
                .column_index(key)
                .ok_or_else(|| PipelineError::MissingColumn {
                    dataset: dataset.to_string(),
                    column: key.clone(),
                })
        })
        .collect::<Result<_, _>>()?;

    let value_indexes: Vec<usize> = (0..table.columns().len())
        .filter(|idx| !key_indexes.contains(idx))
        .collect();

    let mut groups: BTreeMap<Vec<KeyCell>, Vec<Accumulator>> = BTreeMap::new();

    for row in table.rows() {
        let mut key = Vec::with_capacity(key_indexes.len());
        for &idx in &key_indexes {
            key.push(match &row[idx] {
                Value::Null => KeyCell::Null,
                Value::Int(i) => KeyCell::Int(*i),
                Value::Text(s) => KeyCell::Text(s.clone()),
                Value::Float(_) => {
                    return Err(PipelineError::Schema {
                        dataset: dataset.to_string(),
                        reason: format!(
                            "cannot group on floating-point column '{}'",
                            table.columns()[idx]
                        ),
                    })
                }
            });
        }

        let accumulators = groups
            .entry(key)
            .or_insert_with(|| value_indexes.iter().map(|_| Accumulator::new()).collect());

        for (slot, &idx) in value_indexes.iter().enumerate() {
            if let Value::Text(_) = &row[idx] {
                return Err(PipelineError::Schema {
                    dataset: dataset.to_string(),
                    reason: format!(
                        "non-numeric value in aggregated column '{}'",
                        table.columns()[idx]
                    ),
                });
            }
            accumulators[slot].push(&row[idx]);
        }
    }

    let mut columns: Vec<String> = key_indexes
        .iter()
        .map(|&idx| table.columns()[idx].clone())
        .collect();
    columns.extend(value_indexes.iter().map(|&idx| table.columns()[idx].clone()));

    let mut out = Table::new(columns);
    for (key, accumulators) in groups {
        let mut row: Vec<Value> = key
            .into_iter()
            .map(|cell| match cell {
                KeyCell::Null => Value::Null,
                KeyCell::Int(i) => Value::Int(i),
                KeyCell::Text(s) => Value::Text(s),
            })
            .collect();
        row.extend(accumulators.iter().map(|acc| acc.reduce(group.reduce)));
        out.push_row(row);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_temperature() -> Table {
        let mut t = Table::new(vec![
            "Country".into(),
            "Year".into(),
            "Temperature".into(),
            "Anomaly".into(),
        ]);
        t.push_row(vec![
            Value::Text("Denmark".into()),
            Value::Int(1999),
            Value::Float(7.1),
            Value::Float(0.2),
        ]);
        t.push_row(vec![
            Value::Text("Denmark".into()),
            Value::Int(2000),
            Value::Float(7.9),
            Value::Float(0.4),
        ]);
        t.push_row(vec![
            Value::Text("Denmark".into()),
            Value::Int(2000),
            Value::Float(8.1),
            Value::Float(0.6),
        ]);
        t.push_row(vec![
            Value::Text("Norway".into()),
            Value::Int(2001),
            Value::Float(3.4),
            Value::Float(0.1),
        ]);
        t
    }

    fn temperature_spec() -> TableSpec {
        TableSpec {
            columns: vec![
                ColumnMap::keep("Country"),
                ColumnMap::renamed("Year", "Year", CellParse::AsInt),
                ColumnMap::renamed("Temperature", "AverageAnnualTemperature", CellParse::AsFloat),
                ColumnMap::renamed("Anomaly", "AverageAnnualAnomaly", CellParse::AsFloat),
            ],
            missing: MissingPolicy::DropRow,
            filter: Some(RowFilter::YearRange {
                column: "Year".into(),
                min: 2000,
                max: 2019,
            }),
            group: Some(GroupSpec {
                keys: vec!["Year".into(), "Country".into()],
                reduce: Reducer::Mean,
            }),
        }
    }

    #[test]
    fn output_columns_match_declared_schema_exactly() {
        let clean = temperature_spec().apply(&raw_temperature(), "temperature").unwrap();
        assert_eq!(
            clean.columns(),
            [
                "Year",
                "Country",
                "AverageAnnualTemperature",
                "AverageAnnualAnomaly",
            ]
        );
        assert_eq!(
            temperature_spec().target_columns(),
            clean.columns().to_vec()
        );
    }

    #[test]
    fn filter_and_group_mean() {
        let clean = temperature_spec().apply(&raw_temperature(), "temperature").unwrap();

        // 1999 is filtered out; the two Denmark/2000 rows collapse to a mean.
        assert_eq!(clean.row_count(), 2);
        let denmark = clean
            .rows()
            .iter()
            .find(|r| r[1] == Value::Text("Denmark".into()))
            .unwrap();
        assert_eq!(denmark[0], Value::Int(2000));
        assert_eq!(denmark[2], Value::Float(8.0));
        assert_eq!(denmark[3], Value::Float(0.5));
    }

    #[test]
    fn filter_is_idempotent() {
        let spec = temperature_spec();
        let once = spec.apply(&raw_temperature(), "temperature").unwrap();

        // Re-applying the same year filter to filtered data changes nothing.
        let mut again = once.clone();
        apply_filter(
            &RowFilter::YearRange {
                column: "Year".into(),
                min: 2000,
                max: 2019,
            },
            &mut again,
            "temperature",
        )
        .unwrap();
        assert_eq!(once, again);
    }

    #[test]
    fn missing_source_column_is_a_schema_error() {
        let mut spec = temperature_spec();
        spec.columns.push(ColumnMap::keep("Humidity"));

        let err = spec.apply(&raw_temperature(), "temperature").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn { ref column, .. } if column == "Humidity"
        ));
    }

    #[test]
    fn drop_row_removes_rows_with_missing_values() {
        let mut raw = Table::new(vec!["Country".into(), "Rate".into()]);
        raw.push_row(vec![Value::Text("Denmark".into()), Value::Float(1.5)]);
        raw.push_row(vec![Value::Text("Norway".into()), Value::Null]);

        let spec = TableSpec {
            columns: vec![
                ColumnMap::keep("Country"),
                ColumnMap::renamed("Rate", "Rate", CellParse::AsFloat),
            ],
            missing: MissingPolicy::DropRow,
            filter: None,
            group: None,
        };

        let clean = spec.apply(&raw, "health").unwrap();
        assert_eq!(clean.row_count(), 1);
        assert_eq!(clean.rows()[0][0], Value::Text("Denmark".into()));
    }

    #[test]
    fn impute_fills_numeric_nulls_with_column_mean() {
        let mut raw = Table::new(vec!["country".into(), "value".into()]);
        raw.push_row(vec![Value::Text("DNK".into()), Value::Float(10.0)]);
        raw.push_row(vec![Value::Text("NOR".into()), Value::Null]);
        raw.push_row(vec![Value::Text("SWE".into()), Value::Float(20.0)]);

        let spec = TableSpec {
            columns: vec![ColumnMap::keep("country"), ColumnMap::keep("value")],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: None,
        };

        let clean = spec.apply(&raw, "co2").unwrap();
        assert_eq!(clean.row_count(), 3);
        assert_eq!(clean.rows()[1][1], Value::Float(15.0));
    }

    #[test]
    fn impute_leaves_text_columns_untouched() {
        let mut raw = Table::new(vec!["country".into(), "value".into()]);
        raw.push_row(vec![Value::Text("DNK".into()), Value::Float(10.0)]);
        raw.push_row(vec![Value::Null, Value::Float(20.0)]);

        let spec = TableSpec {
            columns: vec![ColumnMap::keep("country"), ColumnMap::keep("value")],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: None,
        };

        let clean = spec.apply(&raw, "co2").unwrap();
        // The text column's Null survives; nothing is invented for it.
        assert_eq!(clean.rows()[1][0], Value::Null);
    }

    #[test]
    fn impute_with_no_observed_values_keeps_nulls() {
        let mut raw = Table::new(vec!["country".into(), "value".into()]);
        raw.push_row(vec![Value::Text("DNK".into()), Value::Null]);
        raw.push_row(vec![Value::Text("NOR".into()), Value::Null]);

        let spec = TableSpec {
            columns: vec![ColumnMap::keep("country"), ColumnMap::keep("value")],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: None,
        };

        let clean = spec.apply(&raw, "co2").unwrap();
        assert_eq!(clean.rows()[0][1], Value::Null);
        assert_eq!(clean.rows()[1][1], Value::Null);
    }

    #[test]
    fn year_from_date_derivation() {
        let mut raw = Table::new(vec!["Location".into(), "Period".into(), "Rate".into()]);
        raw.push_row(vec![
            Value::Text("Denmark".into()),
            Value::Text("2004-07-01".into()),
            Value::Float(5.2),
        ]);
        raw.push_row(vec![
            Value::Text("Norway".into()),
            Value::Text("not a date".into()),
            Value::Float(4.8),
        ]);

        let spec = TableSpec {
            columns: vec![
                ColumnMap::renamed("Location", "Country", CellParse::Keep),
                ColumnMap::renamed(
                    "Period",
                    "Year",
                    CellParse::YearFromDate {
                        format: "%Y-%m-%d".into(),
                    },
                ),
                ColumnMap::renamed("Rate", "MortalityRate", CellParse::AsFloat),
            ],
            missing: MissingPolicy::DropRow,
            filter: None,
            group: None,
        };

        let clean = spec.apply(&raw, "health").unwrap();
        // The unparseable date became Null and the row was dropped.
        assert_eq!(clean.row_count(), 1);
        assert_eq!(clean.rows()[0][1], Value::Int(2004));
    }

    #[test]
    fn grouping_rejects_text_in_aggregated_columns() {
        let mut raw = Table::new(vec!["Country".into(), "Temperature".into()]);
        raw.push_row(vec![
            Value::Text("Denmark".into()),
            Value::Text("warm".into()),
        ]);

        let spec = TableSpec {
            columns: vec![ColumnMap::keep("Country"), ColumnMap::keep("Temperature")],
            missing: MissingPolicy::ImputeNumericMean,
            filter: None,
            group: Some(GroupSpec {
                keys: vec!["Country".into()],
                reduce: Reducer::Mean,
            }),
        };

        let err = spec.apply(&raw, "temperature").unwrap_err();
        assert!(matches!(err, PipelineError::Schema { .. }));
    }

    #[test]
    fn sum_of_integer_column_stays_integer() {
        let mut raw = Table::new(vec!["Country".into(), "Count".into()]);
        raw.push_row(vec![Value::Text("Denmark".into()), Value::Int(2)]);
        raw.push_row(vec![Value::Text("Denmark".into()), Value::Int(3)]);

        let spec = TableSpec {
            columns: vec![ColumnMap::keep("Country"), ColumnMap::keep("Count")],
            missing: MissingPolicy::DropRow,
            filter: None,
            group: Some(GroupSpec {
                keys: vec!["Country".into()],
                reduce: Reducer::Sum,
            }),
        };

        let clean = spec.apply(&raw, "counts").unwrap();
        assert_eq!(clean.rows()[0][1], Value::Int(5));
    }
}
