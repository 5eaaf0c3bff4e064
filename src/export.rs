use crate::analytics::MonthlySeries;
use crate::error::{DataInsightError, Result};
use crate::report::KpiReport;
use crate::table::{Table, Value};
use chrono::{Datelike, NaiveDate};
use log::info;
use rust_xlsxwriter::{Color, ExcelDateTime, Format, Workbook, Worksheet};
use std::path::Path;

const HEADER_COLOR: u32 = 0x1A2433;

/// Writes a table to a single-sheet workbook with a bold header row.
pub fn export_table_to_excel(table: &Table, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();
    write_table_sheet(&mut workbook, "Datos", table)?;
    workbook.save(path)?;
    info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Writes the KPI report as a workbook with `KPIs`, `Mensual` and
/// `Segmentos` sheets. The last two are present only when the report has
/// the matching table.
pub fn export_report_to_excel(report: &KpiReport, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut workbook = Workbook::new();

    write_kpi_sheet(&mut workbook, report)?;
    if let Some(monthly) = &report.monthly {
        write_monthly_sheet(&mut workbook, monthly)?;
    }
    if let Some(segments) = &report.segments {
        write_table_sheet(&mut workbook, "Segmentos", &segments.to_table())?;
    }

    workbook.save(path)?;
    info!("Report '{}' written to {}", report.title, path.display());
    Ok(())
}

fn write_kpi_sheet(workbook: &mut Workbook, report: &KpiReport) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("KPIs")?;

    let title = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_COLOR));
    let label = Format::new().set_bold();
    let amount = Format::new().set_num_format("#,##0.00");
    let percent = Format::new().set_num_format("0.00%");

    sheet.merge_range(0, 0, 0, 2, &report.title, &title)?;
    sheet.write_string(1, 0, format!("Generado: {}", report.generated_on))?;

    let mut row = 3;
    for kpi in &report.kpis {
        sheet.write_string_with_format(row, 0, &kpi.name, &label)?;
        match kpi.value {
            Some(value) if kpi.is_ratio() => {
                sheet.write_number_with_format(row, 1, value, &percent)?;
            }
            Some(value) => {
                sheet.write_number_with_format(row, 1, value, &amount)?;
            }
            None => {
                sheet.write_string(row, 1, "n/d")?;
            }
        }
        if let Some(note) = &kpi.note {
            sheet.write_string(row, 2, note)?;
        }
        row += 1;
    }

    sheet.set_column_width(0, 28)?;
    sheet.set_column_width(1, 18)?;
    sheet.set_column_width(2, 40)?;
    Ok(())
}

fn write_monthly_sheet(workbook: &mut Workbook, series: &MonthlySeries) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name("Mensual")?;

    let header = header_format();
    let amount = Format::new().set_num_format("#,##0.00");
    let percent = Format::new().set_num_format("0.00%");

    for (col, name) in ["Mes", "Ventas", "Crecimiento"].iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }

    for (idx, point) in series.points.iter().enumerate() {
        let row = sheet_row(idx + 1)?;
        sheet.write_string(row, 0, point.month.to_string())?;
        sheet.write_number_with_format(row, 1, point.total_sales, &amount)?;
        if let Some(growth) = point.growth_rate {
            sheet.write_number_with_format(row, 2, growth, &percent)?;
        }
    }

    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 16)?;
    sheet.set_column_width(2, 14)?;
    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_table_sheet(workbook: &mut Workbook, name: &str, table: &Table) -> Result<()> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    let header = header_format();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (idx, column) in table.columns().iter().enumerate() {
        let col = sheet_col(idx)?;
        sheet.write_string_with_format(0, col, column, &header)?;
        sheet.set_column_width(col, 16)?;
    }

    for (idx, row) in table.rows().iter().enumerate() {
        let row_num = sheet_row(idx + 1)?;
        for (col_idx, value) in table.row_values(row).iter().enumerate() {
            write_value(sheet, row_num, sheet_col(col_idx)?, value, &date_format)?;
        }
    }

    sheet.set_freeze_panes(1, 0)?;
    Ok(())
}

fn write_value(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: &Value,
    date_format: &Format,
) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Number(n) => {
            sheet.write_number(row, col, *n)?;
        }
        Value::Text(s) => {
            sheet.write_string(row, col, s)?;
        }
        Value::Date(d) => {
            let date = excel_date(*d)?;
            sheet.write_datetime_with_format(row, col, &date, date_format)?;
        }
    }
    Ok(())
}

fn excel_date(date: NaiveDate) -> Result<ExcelDateTime> {
    let year = u16::try_from(date.year())
        .map_err(|_| DataInsightError::Export(format!("date {} is out of range", date)))?;
    Ok(ExcelDateTime::from_ymd(year, date.month() as u8, date.day() as u8)?)
}

fn header_format() -> Format {
    Format::new()
        .set_bold()
        .set_background_color(Color::RGB(0xE2E8F0))
}

fn sheet_row(idx: usize) -> Result<u32> {
    u32::try_from(idx).map_err(|_| DataInsightError::Export(format!("row {} exceeds sheet limits", idx)))
}

fn sheet_col(idx: usize) -> Result<u16> {
    u16::try_from(idx)
        .map_err(|_| DataInsightError::Export(format!("column {} exceeds sheet limits", idx)))
}
