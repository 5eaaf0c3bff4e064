//! Request/response handlers behind the dashboard.
//!
//! Nothing is kept between calls: the loaded table and the selected segment
//! travel in a [`DashboardState`] that the caller owns and passes back in.

use crate::analytics::{monthly_growth_rate, segment_data};
use crate::charts::{monthly_sales_trend, segment_focus, ChartSpec};
use crate::error::{DataInsightError, Result};
use crate::export::export_report_to_excel;
use crate::loader::{load_csv_reader, load_excel_bytes, validate_with_date_column, SourceFormat};
use crate::report::KpiReport;
use crate::schema::{ColumnMapping, ReportConfig};
use crate::table::{Table, Value};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const REPORT_WORKBOOK: &str = "reporte.xlsx";
pub const REPORT_JSON: &str = "reporte.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardState {
    pub data: Option<Table>,
    pub selected_segment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadOutcome {
    pub data: Option<Table>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardFigures {
    pub monthly: Option<ChartSpec>,
    pub segment: Option<ChartSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportOutcome {
    pub workbook: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub status: String,
}

/// Parses an uploaded file by its name and validates it.
///
/// Unsupported or unreadable uploads are reported through `status` with no
/// data; they are not errors for the dashboard.
pub fn handle_upload(filename: &str, contents: &[u8], columns: &ColumnMapping) -> UploadOutcome {
    let parsed = SourceFormat::from_file_name(filename).and_then(|format| match format {
        SourceFormat::Csv => load_csv_reader(contents),
        SourceFormat::Spreadsheet => load_excel_bytes(contents, None),
    });

    match parsed {
        Ok(table) => {
            let cleaned = validate_with_date_column(&table, &columns.date);
            info!("Upload '{}' accepted with {} rows", filename, cleaned.len());
            UploadOutcome {
                data: Some(cleaned),
                status: format!("Archivo {} cargado y validado exitosamente.", filename),
            }
        }
        Err(e) => {
            warn!("Upload '{}' rejected: {}", filename, e);
            UploadOutcome {
                data: None,
                status: "No se pudo cargar el archivo o el formato no es soportado.".to_string(),
            }
        }
    }
}

/// Distinct segment values in the order they first appear.
pub fn segment_options(state: &DashboardState, columns: &ColumnMapping) -> Vec<SegmentOption> {
    let Some(table) = &state.data else {
        return Vec::new();
    };
    let Ok(column) = table.get_column(&columns.segment) else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    column
        .values()
        .filter(|v| !v.is_null())
        .filter(|v| seen.insert(*v))
        .map(|v| SegmentOption {
            label: v.to_string(),
            value: v.to_string(),
        })
        .collect()
}

/// The monthly trend chart, plus a single-segment bar chart when a segment
/// is selected and the table has the segment column.
pub fn update_graphs(state: &DashboardState, columns: &ColumnMapping) -> Result<DashboardFigures> {
    let Some(table) = &state.data else {
        return Ok(DashboardFigures::default());
    };

    let series = monthly_growth_rate(table, &columns.date, &columns.sales)?;
    let monthly = Some(monthly_sales_trend(&series));

    let segment = match &state.selected_segment {
        Some(selected) if table.has_column(&columns.segment) => {
            let segments = segment_data(table, &columns.segment, &columns.sales)?;
            let key = segments
                .keys()
                .find(|k| k.to_string() == *selected)
                .cloned()
                .unwrap_or_else(|| Value::Text(selected.clone()));
            Some(segment_focus(&segments, &key))
        }
        _ => None,
    };

    Ok(DashboardFigures { monthly, segment })
}

/// Builds the KPI report and writes it as a workbook and as JSON into
/// `output_dir`.
pub fn generate_report(
    state: &DashboardState,
    config: &ReportConfig,
    output_dir: impl AsRef<Path>,
) -> Result<ReportOutcome> {
    let Some(table) = &state.data else {
        return Ok(ReportOutcome {
            workbook: None,
            json: None,
            status: String::new(),
        });
    };

    let output_dir = output_dir.as_ref();
    if !output_dir.is_dir() {
        return Err(DataInsightError::FileNotFound(output_dir.to_path_buf()));
    }

    let report = KpiReport::build(table, config)?;

    let workbook = output_dir.join(REPORT_WORKBOOK);
    export_report_to_excel(&report, &workbook)?;

    let json = output_dir.join(REPORT_JSON);
    std::fs::write(&json, report.to_json()?)?;

    Ok(ReportOutcome {
        status: format!("Reporte generado exitosamente: {}", workbook.display()),
        workbook: Some(workbook),
        json: Some(json),
    })
}
