use crate::analytics::DEFAULT_DATE_COLUMN;
use crate::dates::{parse_date, parse_date_str};
use crate::error::{DataInsightError, Result};
use crate::table::{Row, Table, Value};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use log::{debug, info};
use std::collections::HashSet;
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read, Seek};
use std::path::Path;

/// The file kinds `load` understands, keyed by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn from_file_name(name: &str) -> Result<Self> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(SourceFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Spreadsheet),
            _ => Err(DataInsightError::UnsupportedFormat(format!(
                "'{}' is neither CSV nor a spreadsheet",
                name
            ))),
        }
    }
}

/// Loads a CSV or spreadsheet file, picking the reader from the extension.
pub fn load(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    match SourceFormat::from_file_name(&path.to_string_lossy())? {
        SourceFormat::Csv => load_csv(path),
        SourceFormat::Spreadsheet => load_excel(path, None),
    }
}

pub fn load_csv(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let file = open_readable(path)?;
    let table = load_csv_reader(file)?;
    info!(
        "Loaded {} rows and {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

/// Reads CSV with a header row. Cells are trimmed; empty cells become
/// `Null`, numeric cells `Number`, the rest `Text`. Short records are padded
/// with `Null`.
pub fn load_csv_reader<R: Read>(reader: R) -> Result<Table> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();
    let mut table = Table::new(headers.iter().cloned());

    for record in csv_reader.records() {
        let record = record?;
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = record.get(idx).map(Value::parse_cell).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();
        table.push_row(row);
    }

    Ok(table)
}

/// Reads one sheet of a workbook, the first one when `sheet` is `None`.
/// The first row of the sheet holds the column names.
pub fn load_excel(path: impl AsRef<Path>, sheet: Option<&str>) -> Result<Table> {
    let path = path.as_ref();
    drop(open_readable(path)?);

    let mut workbook = open_workbook_auto(path)?;
    let table = read_sheet(&mut workbook, sheet)?;
    info!(
        "Loaded {} rows and {} columns from {}",
        table.len(),
        table.columns().len(),
        path.display()
    );
    Ok(table)
}

pub fn load_excel_bytes(bytes: &[u8], sheet: Option<&str>) -> Result<Table> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    read_sheet(&mut workbook, sheet)
}

fn open_readable(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| open_error(path, e))
}

fn open_error(path: &Path, err: std::io::Error) -> DataInsightError {
    match err.kind() {
        ErrorKind::NotFound => DataInsightError::FileNotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => DataInsightError::PermissionDenied(path.to_path_buf()),
        _ => DataInsightError::IoError(err),
    }
}

fn read_sheet<RS: Read + Seek>(workbook: &mut Sheets<RS>, sheet: Option<&str>) -> Result<Table> {
    let sheet_names = workbook.sheet_names();
    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .cloned()
            .ok_or_else(|| DataInsightError::SheetNotFound(name.to_string()))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| DataInsightError::Spreadsheet("workbook has no sheets".to_string()))?,
    };

    let range = workbook.worksheet_range(&sheet_name)?;
    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        debug!("Sheet '{}' is empty", sheet_name);
        return Ok(Table::default());
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(idx, cell)| match cell_to_value(cell) {
            Value::Null => format!("Unnamed: {}", idx),
            value => value.to_string(),
        })
        .collect();
    let mut table = Table::new(headers.iter().cloned());

    for cells in rows {
        let row: Row = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let value = cells.get(idx).map(cell_to_value).unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect();
        table.push_row(row);
    }

    debug!("Read {} rows from sheet '{}'", table.len(), sheet_name);
    Ok(table)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) => Value::from(*v),
        Data::String(v) => {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                Value::Null
            } else {
                Value::Text(trimmed.to_string())
            }
        }
        Data::Bool(v) => Value::Text(v.to_string()),
        Data::DateTime(v) => match v.as_datetime() {
            Some(dt) if !v.is_duration() => Value::Date(dt.date()),
            _ => Value::Number(v.as_f64()),
        },
        Data::DateTimeIso(v) => parse_date_str(v)
            .map(Value::Date)
            .unwrap_or_else(|| Value::Text(v.clone())),
        Data::DurationIso(v) => Value::Text(v.clone()),
        Data::Error(_) | Data::Empty => Value::Null,
    }
}

/// Cleans a freshly loaded table, coercing the default `fecha` column.
pub fn validate(table: &Table) -> Table {
    validate_with_date_column(table, DEFAULT_DATE_COLUMN)
}

/// Cleans a table in three steps and returns the result as a new table:
///
/// 1. exact-duplicate rows are removed, keeping the first occurrence;
/// 2. rows with a null in any column are removed;
/// 3. if `date_column` exists, its cells become dates and rows whose date
///    does not parse are removed.
pub fn validate_with_date_column(table: &Table, date_column: &str) -> Table {
    let mut seen: HashSet<Vec<Value>> = HashSet::new();
    let deduped = table.filter_rows(|row| seen.insert(table.row_values(row)));
    debug!(
        "Removed {} duplicate rows",
        table.len() - deduped.len()
    );

    let complete = deduped.filter_rows(|row| !deduped.row_values(row).iter().any(Value::is_null));
    debug!(
        "Removed {} rows with missing values",
        deduped.len() - complete.len()
    );

    let mut cleaned = complete.clone();
    if complete.has_column(date_column) {
        let rows = cleaned.rows_mut();
        rows.retain_mut(|row| match row.get(date_column).and_then(parse_date) {
            Some(date) => {
                row.insert(date_column.to_string(), Value::Date(date));
                true
            }
            None => false,
        });
        debug!(
            "Removed {} rows with unparseable '{}' values",
            complete.len() - cleaned.len(),
            date_column
        );
    }

    info!(
        "Validated table: {} of {} rows kept",
        cleaned.len(),
        table.len()
    );
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const SAMPLE_CSV: &str = "\
fecha,producto,ventas
2021-01-15,A,100
2021-01-20,B,200
2021-01-20,B,200
not-a-date,A,50
2021-02-10,,400
2021-02-11,A,300
";

    #[test]
    fn test_load_csv_reader_types_cells() {
        let table = load_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.columns(), &["fecha", "producto", "ventas"]);
        assert_eq!(table.rows()[0]["ventas"], Value::Number(100.0));
        assert_eq!(table.rows()[0]["producto"], Value::from("A"));
        assert_eq!(table.rows()[4]["producto"], Value::Null);
    }

    #[test]
    fn test_load_csv_reader_pads_short_records() {
        let table = load_csv_reader("a,b\n1\n".as_bytes()).unwrap();
        assert_eq!(table.rows()[0]["b"], Value::Null);
    }

    #[test]
    fn test_validate_cleans_rows() {
        let table = load_csv_reader(SAMPLE_CSV.as_bytes()).unwrap();
        let cleaned = validate(&table);

        assert_eq!(cleaned.len(), 3);
        assert!(cleaned
            .rows()
            .iter()
            .all(|row| matches!(row["fecha"], Value::Date(_))));
        assert_eq!(
            cleaned.rows()[2]["fecha"],
            Value::Date(NaiveDate::from_ymd_opt(2021, 2, 11).unwrap())
        );
        assert_eq!(table.len(), 6, "input must be left untouched");
    }

    #[test]
    fn test_validate_without_date_column() {
        let table = load_csv_reader("producto,ventas\nA,1\nA,1\nB,\n".as_bytes()).unwrap();
        let cleaned = validate(&table);
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_validate_with_custom_date_column() {
        let table = load_csv_reader("dia,ventas\n2021-03-01,5\nmañana,6\n".as_bytes()).unwrap();
        let cleaned = validate_with_date_column(&table, "dia");
        assert_eq!(cleaned.len(), 1);
    }

    #[test]
    fn test_source_format_from_name() {
        assert_eq!(SourceFormat::from_file_name("ventas.CSV").unwrap(), SourceFormat::Csv);
        assert_eq!(
            SourceFormat::from_file_name("ventas.xlsx").unwrap(),
            SourceFormat::Spreadsheet
        );
        assert!(matches!(
            SourceFormat::from_file_name("ventas.txt"),
            Err(DataInsightError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_open_errors_are_classified() {
        let path = Path::new("privado/ventas.csv");

        let denied = std::io::Error::from(ErrorKind::PermissionDenied);
        assert!(matches!(
            open_error(path, denied),
            DataInsightError::PermissionDenied(ref p) if p == path
        ));

        let missing = std::io::Error::from(ErrorKind::NotFound);
        assert!(matches!(
            open_error(path, missing),
            DataInsightError::FileNotFound(ref p) if p == path
        ));

        let other = std::io::Error::from(ErrorKind::InvalidData);
        assert!(matches!(open_error(path, other), DataInsightError::IoError(_)));
    }

    #[test]
    fn test_validate_merges_signed_zero_duplicates() {
        let table = Table::from_columns(vec![
            ("producto", vec![Value::from("A"), Value::from("A")]),
            ("ventas", vec![Value::Number(-0.0), Value::Number(0.0)]),
        ]);
        assert_eq!(validate(&table).len(), 1);
    }

    #[test]
    fn test_load_missing_files() {
        assert!(matches!(
            load_csv("archivo_inexistente.csv"),
            Err(DataInsightError::FileNotFound(_))
        ));
        assert!(matches!(
            load_excel("archivo_inexistente.xlsx", None),
            Err(DataInsightError::FileNotFound(_))
        ));
        assert!(matches!(
            load("archivo_inexistente.csv"),
            Err(DataInsightError::FileNotFound(_))
        ));
    }
}
