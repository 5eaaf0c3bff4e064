use crate::error::{DataInsightError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single scalar cell.
///
/// Equality, ordering and hashing are total: numbers compare with
/// `f64::total_cmp` after folding `-0.0` into `0.0`, and variants order as
/// `Null < Number < Date < Text`.
/// This lets a `Value` key a group or take part in row deduplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Date(NaiveDate),
    Text(String),
}

impl Value {
    /// Interprets a raw text cell: empty is `Null`, a finite number is
    /// `Number`, anything else stays `Text`.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::from(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The same value with a negative zero replaced by `0.0`.
    pub fn canonical(&self) -> Value {
        match self {
            Value::Number(n) => Value::Number(unsigned_zero(*n)),
            other => other.clone(),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Number(_) => 1,
            Value::Date(_) => 2,
            Value::Text(_) => 3,
        }
    }
}

fn unsigned_zero(n: f64) -> f64 {
    if n == 0.0 {
        0.0
    } else {
        n
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                unsigned_zero(*a).total_cmp(&unsigned_zero(*b))
            }
            (Value::Date(a), Value::Date(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::Null => {}
            Value::Number(n) => unsigned_zero(*n).to_bits().hash(state),
            Value::Date(d) => d.hash(state),
            Value::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Number(n) => write!(f, "{}", n),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(unsigned_zero(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

pub type Row = BTreeMap<String, Value>;

/// Ordered rows of named-column values.
///
/// Column presence is decided by the declared column list. A row that lacks
/// a declared column reads as `Null` for it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        let mut declared: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if !declared.contains(&column) {
                declared.push(column);
            }
        }
        Self {
            columns: declared,
            rows: Vec::new(),
        }
    }

    /// Builds a table from column vectors. Shorter columns are padded with
    /// `Null` up to the longest one.
    pub fn from_columns<S, V>(columns: impl IntoIterator<Item = (S, Vec<V>)>) -> Self
    where
        S: Into<String>,
        V: Into<Value>,
    {
        let columns: Vec<(String, Vec<Value>)> = columns
            .into_iter()
            .map(|(name, values)| (name.into(), values.into_iter().map(Into::into).collect()))
            .collect();

        let height = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let mut table = Table::new(columns.iter().map(|(name, _)| name.clone()));

        for idx in 0..height {
            let row: Row = columns
                .iter()
                .map(|(name, values)| {
                    (
                        name.clone(),
                        values.get(idx).cloned().unwrap_or(Value::Null),
                    )
                })
                .collect();
            table.rows.push(row);
        }

        table
    }

    /// Appends a row. Keys outside the declared columns are ignored.
    pub fn push_row(&mut self, mut row: Row) {
        row.retain(|key, _| self.columns.contains(key));
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn get_column(&self, name: &str) -> Result<Column<'_>> {
        let name = self
            .columns
            .iter()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| DataInsightError::ColumnNotFound(name.to_string()))?;
        Ok(Column { name, table: self })
    }

    /// The value of `column` in `row`, `Null` when the row lacks it.
    pub fn cell<'a>(&self, row: &'a Row, column: &str) -> &'a Value {
        const NULL: &Value = &Value::Null;
        row.get(column).unwrap_or(NULL)
    }

    /// Cells of a row in declared column order.
    pub fn row_values(&self, row: &Row) -> Vec<Value> {
        self.columns
            .iter()
            .map(|c| self.cell(row, c).clone())
            .collect()
    }

    /// A new table with the same columns holding only the rows `keep` accepts.
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r)).cloned().collect(),
        }
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Row> {
        &mut self.rows
    }
}

/// A borrowed view of one declared column.
#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    name: &'a str,
    table: &'a Table,
}

impl<'a> Column<'a> {
    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn values(&self) -> impl Iterator<Item = &'a Value> + 'a {
        let name = self.name;
        let table = self.table;
        table.rows.iter().map(move |row| table.cell(row, name))
    }

    /// Numeric reading of every cell. `Null` reads as `None`; numeric text is
    /// accepted; any other text or a date is a `NonNumericValue` error.
    pub fn numbers(&self) -> Result<Vec<Option<f64>>> {
        self.values()
            .enumerate()
            .map(|(row, value)| numeric_cell(self.name, row, value))
            .collect()
    }

    pub fn sum(&self) -> Result<f64> {
        Ok(self.numbers()?.into_iter().flatten().sum())
    }
}

pub(crate) fn numeric_cell(column: &str, row: usize, value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(Some(*n)),
        Value::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Some(n)),
            _ => Err(DataInsightError::NonNumericValue {
                column: column.to_string(),
                row,
                value: s.clone(),
            }),
        },
        Value::Date(d) => Err(DataInsightError::NonNumericValue {
            column: column.to_string(),
            row,
            value: d.to_string(),
        }),
    }
}
