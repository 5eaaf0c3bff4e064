//! # DataInsight
//!
//! A library for turning tabular sales records (CSV or spreadsheets) into
//! business KPIs, monthly growth series, segment aggregates and spreadsheet
//! reports.
//!
//! ## Core Concepts
//!
//! - **Table**: ordered rows of named-column values, loaded and cleaned by [`loader`]
//! - **Metric**: a single derived number such as total sales or profit margin
//! - **AggregatedTable**: one summed value per distinct segment key
//! - **MonthlySeries**: monthly totals with the growth rate against the previous month
//! - **KPI Report**: the named metrics plus supporting tables, exportable to XLSX and JSON
//!
//! ## Example
//!
//! ```rust,ignore
//! use datainsight::*;
//!
//! let table = validate(&load("ventas.csv")?);
//!
//! let total = total_sales(&table, "ventas")?;
//! let margin = profit_margin(&table, "ingresos", "costos")?;
//! let monthly = monthly_growth_rate(&table, "fecha", "ventas")?;
//! let by_product = segment_data(&table, "producto", "ventas")?;
//!
//! let sales_report = build_sales_report(&table, &ReportConfig::default())?;
//! export_report_to_excel(&sales_report.report, "reporte.xlsx")?;
//! ```

pub mod analytics;
pub mod charts;
pub mod dashboard;
pub mod dates;
pub mod error;
pub mod export;
pub mod loader;
pub mod report;
pub mod schema;
pub mod table;

pub use analytics::*;
pub use charts::{monthly_sales_trend, segment_focus, segmented_sales, ChartKind, ChartSpec};
pub use dates::{parse_date, YearMonth};
pub use error::{DataInsightError, Result};
pub use export::{export_report_to_excel, export_table_to_excel};
pub use loader::{
    load, load_csv, load_csv_reader, load_excel, load_excel_bytes, validate, validate_with_date_column,
};
pub use report::{Kpi, KpiKind, KpiReport};
pub use schema::*;
pub use table::{Column, Row, Table, Value};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A KPI report together with the charts that illustrate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesReport {
    pub report: KpiReport,
    pub monthly_chart: Option<ChartSpec>,
    pub segment_chart: Option<ChartSpec>,
}

pub struct SalesReportProcessor;

impl SalesReportProcessor {
    /// Runs the analytics over a table that has already been validated.
    pub fn process(table: &Table, config: &ReportConfig) -> Result<SalesReport> {
        info!("Processing sales report: {}", config.title);
        debug!(
            "Table has {} rows across columns {:?}",
            table.len(),
            table.columns()
        );

        let report = KpiReport::build(table, config)?;
        let monthly_chart = report.monthly.as_ref().map(monthly_sales_trend);
        let segment_chart = report.segments.as_ref().map(segmented_sales);

        Ok(SalesReport {
            report,
            monthly_chart,
            segment_chart,
        })
    }

    /// Loads, validates and processes a CSV or spreadsheet file.
    pub fn process_file(path: impl AsRef<Path>, config: &ReportConfig) -> Result<SalesReport> {
        let raw = load(path)?;
        let table = validate_with_date_column(&raw, &config.columns.date);
        Self::process(&table, config)
    }
}

pub fn build_sales_report(table: &Table, config: &ReportConfig) -> Result<SalesReport> {
    SalesReportProcessor::process(table, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end_processing() {
        let raw = load_csv_reader(
            "fecha,producto,ventas,ingresos,costos\n\
             2021-01-15,A,100,1000,500\n\
             2021-01-20,B,200,2000,800\n\
             2021-02-10,A,400,0,0\n\
             bad-date,B,50,0,0\n"
                .as_bytes(),
        )
        .unwrap();
        let table = validate(&raw);

        let result = build_sales_report(&table, &ReportConfig::default()).unwrap();

        let total = result.report.kpi("Ventas Totales").unwrap().value.unwrap();
        assert_eq!(total, 700.0);

        let monthly = result.monthly_chart.unwrap();
        assert_eq!(monthly.x, vec!["2021-01", "2021-02"]);

        let segments = result.segment_chart.unwrap();
        assert_eq!(segments.x, vec!["A", "B"]);
        assert_eq!(segments.y, vec![500.0, 200.0]);
    }

    #[test]
    fn test_custom_columns() {
        let table = Table::from_columns(vec![
            ("region", vec![Value::from("Norte"), Value::from("Sur")]),
            ("importe", vec![Value::Number(10.0), Value::Number(30.0)]),
        ]);
        let config = ReportConfig::from_json_str(
            r#"{"columns": {"sales": "importe", "segment": "region"}}"#,
        )
        .unwrap();

        let result = SalesReportProcessor::process(&table, &config).unwrap();
        assert!(result.monthly_chart.is_none());
        assert_eq!(result.segment_chart.unwrap().y, vec![10.0, 30.0]);
    }
}
