//! Sales metrics over a validated [`Table`].
//!
//! Every function here is pure: it borrows its input, checks the columns it
//! needs through [`Table::get_column`] before touching any value, and either
//! returns a complete result or an error. Nothing is logged or cached.

use crate::dates::{parse_date, YearMonth};
use crate::error::{DataInsightError, Result};
use crate::table::{numeric_cell, Table, Value};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SALES_COLUMN: &str = "ventas";
pub const DEFAULT_REVENUE_COLUMN: &str = "ingresos";
pub const DEFAULT_COST_COLUMN: &str = "costos";
pub const DEFAULT_DATE_COLUMN: &str = "fecha";
pub const DEFAULT_SEGMENT_COLUMN: &str = "producto";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentTotal {
    pub key: Value,
    pub total: f64,
}

/// One summed value per distinct key, ordered by key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedTable {
    pub key_column: String,
    pub value_column: String,
    pub rows: Vec<SegmentTotal>,
}

impl AggregatedTable {
    pub fn get(&self, key: &Value) -> Option<f64> {
        self.rows
            .binary_search_by(|row| row.key.cmp(key))
            .ok()
            .map(|idx| self.rows[idx].total)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(|row| &row.key)
    }

    pub fn grand_total(&self) -> f64 {
        self.rows.iter().map(|row| row.total).sum()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn to_table(&self) -> Table {
        Table::from_columns(vec![
            (
                self.key_column.clone(),
                self.rows.iter().map(|r| r.key.clone()).collect::<Vec<_>>(),
            ),
            (
                self.value_column.clone(),
                self.rows.iter().map(|r| Value::Number(r.total)).collect(),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    pub month: YearMonth,
    pub total_sales: f64,
    /// `None` for the first month and whenever the previous month summed to 0.
    pub growth_rate: Option<f64>,
}

/// Monthly sales totals in ascending month order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    pub points: Vec<MonthlyPoint>,
}

impl MonthlySeries {
    pub fn get(&self, month: &YearMonth) -> Option<&MonthlyPoint> {
        self.points.iter().find(|p| &p.month == month)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&MonthlyPoint> {
        self.points.last()
    }

    pub fn to_table(&self) -> Table {
        Table::from_columns(vec![
            (
                "month",
                self.points
                    .iter()
                    .map(|p| Value::Text(p.month.to_string()))
                    .collect::<Vec<_>>(),
            ),
            (
                "total_sales",
                self.points.iter().map(|p| Value::Number(p.total_sales)).collect(),
            ),
            (
                "growth_rate",
                self.points.iter().map(|p| Value::from(p.growth_rate)).collect(),
            ),
        ])
    }
}

/// Sum of `sales_column`; 0 for a table with no rows.
pub fn total_sales(table: &Table, sales_column: &str) -> Result<f64> {
    table.get_column(sales_column)?.sum()
}

/// `(Σrevenue − Σcost) / Σrevenue`.
///
/// Zero total revenue makes the ratio meaningless and is reported as
/// [`DataInsightError::UndefinedMetric`] instead of 0 or NaN. So are totals
/// that overflow to infinity.
pub fn profit_margin(table: &Table, revenue_column: &str, cost_column: &str) -> Result<f64> {
    let revenue = table.get_column(revenue_column)?;
    let cost = table.get_column(cost_column)?;

    let total_revenue = revenue.sum()?;
    let total_cost = cost.sum()?;

    if total_revenue == 0.0 {
        return Err(DataInsightError::UndefinedMetric(format!(
            "total revenue in '{}' is zero, profit margin cannot be computed",
            revenue_column
        )));
    }

    let margin = (total_revenue - total_cost) / total_revenue;
    if !total_revenue.is_finite() || !margin.is_finite() {
        return Err(DataInsightError::UndefinedMetric(format!(
            "totals of '{}' and '{}' exceed the representable range",
            revenue_column, cost_column
        )));
    }

    Ok(margin)
}

/// Monthly sales totals with the change against the preceding month.
///
/// Dates are read in two phases: every cell goes through [`parse_date`],
/// then only rows that produced a date are kept. Rows with unparseable dates
/// are dropped without error, so a table with no usable dates yields an empty
/// series. Growth compares each month with the previous month present in the
/// data; missing months are not filled in.
pub fn monthly_growth_rate(
    table: &Table,
    date_column: &str,
    sales_column: &str,
) -> Result<MonthlySeries> {
    let dates = table.get_column(date_column)?;
    let sales = table.get_column(sales_column)?;

    let parsed: Vec<Option<NaiveDate>> = dates.values().map(parse_date).collect();

    let mut by_month: BTreeMap<YearMonth, f64> = BTreeMap::new();
    for (row, (date, value)) in parsed.iter().zip(sales.values()).enumerate() {
        let Some(date) = date else {
            continue;
        };
        let amount = numeric_cell(sales_column, row, value)?.unwrap_or(0.0);
        *by_month.entry(YearMonth::from_date(*date)).or_insert(0.0) += amount;
    }

    let mut points = Vec::with_capacity(by_month.len());
    let mut previous: Option<f64> = None;
    for (month, total) in by_month {
        points.push(MonthlyPoint {
            month,
            total_sales: total,
            growth_rate: previous.and_then(|prev| growth_between(prev, total)),
        });
        previous = Some(total);
    }

    Ok(MonthlySeries { points })
}

fn growth_between(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 {
        return None;
    }
    Some((current - previous) / previous)
}

/// Sum of `aggregate_column` for each distinct value of `segment_column`.
///
/// Rows with a null segment value belong to no group.
pub fn segment_data(
    table: &Table,
    segment_column: &str,
    aggregate_column: &str,
) -> Result<AggregatedTable> {
    let segments = table.get_column(segment_column)?;
    let amounts = table.get_column(aggregate_column)?;

    let mut groups: BTreeMap<Value, f64> = BTreeMap::new();
    for (row, (key, value)) in segments.values().zip(amounts.values()).enumerate() {
        let amount = numeric_cell(aggregate_column, row, value)?.unwrap_or(0.0);
        if key.is_null() {
            continue;
        }
        *groups.entry(key.canonical()).or_insert(0.0) += amount;
    }

    Ok(AggregatedTable {
        key_column: segment_column.to_string(),
        value_column: aggregate_column.to_string(),
        rows: groups
            .into_iter()
            .map(|(key, total)| SegmentTotal { key, total })
            .collect(),
    })
}
