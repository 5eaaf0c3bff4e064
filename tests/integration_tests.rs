use chrono::NaiveDate;
use datainsight::dashboard::{generate_report, handle_upload, segment_options, update_graphs, DashboardState};
use datainsight::*;
use std::fs::File;
use std::io::Write;
use std::path::Path;

fn write_csv(path: &Path, header: &str, rows: &[String]) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut file = File::create(path)?;
    writeln!(file, "{}", header)?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}

fn retail_rows() -> Vec<String> {
    let mut rows = Vec::new();
    let products = ["Café", "Té", "Pan"];
    for month in 1..=6u32 {
        for (idx, product) in products.iter().enumerate() {
            let day = 5 + idx as u32 * 7;
            let sales = 1000.0 * month as f64 + 100.0 * idx as f64;
            let revenue = sales;
            let cost = sales * 0.6;
            rows.push(format!(
                "2023-{:02}-{:02},{},{},{},{}",
                month, day, product, sales, revenue, cost
            ));
        }
    }
    rows
}

#[test]
fn test_retail_business_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ventas.csv");

    let mut rows = retail_rows();
    rows.push(rows[0].clone());
    rows.push("sin-fecha,Café,999,999,1".to_string());
    rows.push("2023-03-01,,500,500,100".to_string());
    write_csv(&path, "fecha,producto,ventas,ingresos,costos", &rows).unwrap();

    let raw = load(&path).unwrap();
    assert_eq!(raw.len(), 21);

    let table = validate(&raw);
    assert_eq!(table.len(), 18);

    let total = total_sales(&table, "ventas").unwrap();
    let expected_total: f64 = (1..=6)
        .map(|m| 3.0 * 1000.0 * m as f64 + 300.0)
        .sum();
    assert!((total - expected_total).abs() < 1e-6);

    let margin = profit_margin(&table, "ingresos", "costos").unwrap();
    assert!((margin - 0.4).abs() < 1e-9);

    let monthly = monthly_growth_rate(&table, "fecha", "ventas").unwrap();
    assert_eq!(monthly.len(), 6);
    assert_eq!(monthly.points[0].growth_rate, None);
    let feb = monthly.get(&"2023-02".parse().unwrap()).unwrap();
    assert!((feb.growth_rate.unwrap() - (6300.0 - 3300.0) / 3300.0).abs() < 1e-9);

    let segments = segment_data(&table, "producto", "ventas").unwrap();
    assert_eq!(segments.len(), 3);
    assert!((segments.grand_total() - total).abs() < 1e-6);
}

#[test]
fn test_spreadsheet_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analisis.xlsx");

    let table = Table::from_columns(vec![
        (
            "fecha",
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2021, 1, 15).unwrap()),
                Value::Date(NaiveDate::from_ymd_opt(2021, 1, 20).unwrap()),
                Value::Date(NaiveDate::from_ymd_opt(2021, 2, 10).unwrap()),
            ],
        ),
        (
            "producto",
            vec![Value::from("A"), Value::from("B"), Value::from("A")],
        ),
        (
            "ventas",
            vec![Value::Number(100.0), Value::Number(200.0), Value::Number(400.0)],
        ),
    ]);
    export_table_to_excel(&table, &path).unwrap();

    let loaded = validate(&load(&path).unwrap());
    assert_eq!(loaded.columns(), table.columns());
    assert_eq!(total_sales(&loaded, "ventas").unwrap(), 700.0);

    let monthly = monthly_growth_rate(&loaded, "fecha", "ventas").unwrap();
    let feb = monthly.get(&"2021-02".parse().unwrap()).unwrap();
    assert!((feb.growth_rate.unwrap() - 0.3333).abs() < 0.001);
}

#[test]
fn test_named_sheet_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analisis.xlsx");
    let table = Table::from_columns(vec![("ventas", vec![1.0, 2.0])]);
    export_table_to_excel(&table, &path).unwrap();

    assert_eq!(load_excel(&path, Some("Datos")).unwrap().len(), 2);
    assert!(matches!(
        load_excel(&path, Some("Hoja1")),
        Err(DataInsightError::SheetNotFound(_))
    ));
}

#[test]
fn test_process_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ventas.csv");
    write_csv(&path, "fecha,producto,ventas,ingresos,costos", &retail_rows()).unwrap();

    let result = SalesReportProcessor::process_file(&path, &ReportConfig::default()).unwrap();
    assert_eq!(result.report.row_count, 18);
    assert_eq!(result.monthly_chart.unwrap().x.len(), 6);
    assert_eq!(result.segment_chart.unwrap().x, vec!["Café", "Pan", "Té"]);

    let out = dir.path().join("reporte.xlsx");
    export_report_to_excel(&result.report, &out).unwrap();
    assert!(out.exists());
}

#[test]
fn test_missing_file_is_reported() {
    let err = SalesReportProcessor::process_file("no/existe.csv", &ReportConfig::default())
        .unwrap_err();
    assert!(matches!(err, DataInsightError::FileNotFound(_)));
}

#[test]
fn test_dashboard_flow() {
    let dir = tempfile::tempdir().unwrap();
    let columns = ColumnMapping::default();

    let mut csv = String::from("fecha,producto,ventas\n");
    for row in retail_rows() {
        let fields: Vec<&str> = row.split(',').take(3).collect();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    let upload = handle_upload("ventas.csv", csv.as_bytes(), &columns);
    let mut state = DashboardState {
        data: upload.data,
        selected_segment: None,
    };

    let options = segment_options(&state, &columns);
    assert_eq!(options.len(), 3);
    assert_eq!(options[0].value, "Café");

    state.selected_segment = Some("Pan".to_string());
    let figures = update_graphs(&state, &columns).unwrap();
    let segment = figures.segment.unwrap();
    assert_eq!(segment.x, vec!["Pan"]);
    let expected: f64 = (1..=6).map(|m| 1000.0 * m as f64 + 200.0).sum();
    assert!((segment.y[0] - expected).abs() < 1e-6);

    let outcome = generate_report(&state, &ReportConfig::default(), dir.path()).unwrap();
    assert!(outcome.workbook.unwrap().exists());
    assert!(outcome.json.unwrap().exists());
}

#[test]
fn test_concurrent_callers_share_nothing() {
    let handles: Vec<_> = (1..=4)
        .map(|factor| {
            std::thread::spawn(move || {
                let table = Table::from_columns(vec![(
                    "ventas",
                    vec![100.0 * factor as f64, 200.0 * factor as f64],
                )]);
                total_sales(&table, "ventas").unwrap()
            })
        })
        .collect();

    let totals: Vec<f64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(totals, vec![300.0, 600.0, 900.0, 1200.0]);
}
