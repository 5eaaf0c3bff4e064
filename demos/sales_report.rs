use datainsight::*;
use std::env;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(input) = args.get(1) else {
        eprintln!("usage: sales_report <ventas.csv|ventas.xlsx> [config.json]");
        std::process::exit(2);
    };

    let config = match args.get(2) {
        Some(path) => ReportConfig::from_json_file(path)?,
        None => ReportConfig::default(),
    };

    let result = SalesReportProcessor::process_file(input, &config)?;

    println!("{}", result.report.to_markdown());

    if let Some(chart) = &result.monthly_chart {
        println!("Monthly chart data:\n{}", chart.to_json()?);
    }

    export_report_to_excel(&result.report, "reporte.xlsx")?;
    println!("Workbook written to reporte.xlsx");

    Ok(())
}
