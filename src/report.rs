use crate::analytics::{
    monthly_growth_rate, profit_margin, segment_data, total_sales, AggregatedTable,
    MonthlySeries,
};
use crate::error::{DataInsightError, Result};
use crate::schema::ReportConfig;
use crate::table::Table;
use chrono::NaiveDate;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

pub const KPI_TOTAL_SALES: &str = "Ventas Totales";
pub const KPI_PROFIT_MARGIN: &str = "Margen";
pub const KPI_LATEST_GROWTH: &str = "Crecimiento Último Mes";

/// How a KPI value is rendered: a currency-like amount or a fraction shown
/// as a percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiKind {
    Amount,
    Ratio,
}

/// A named metric. `value` is `None` when the metric is undefined for the
/// data, with `note` saying why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kpi {
    pub name: String,
    pub kind: KpiKind,
    pub value: Option<f64>,
    pub note: Option<String>,
}

impl Kpi {
    fn defined(name: &str, kind: KpiKind, value: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value: Some(value),
            note: None,
        }
    }

    fn undefined(name: &str, kind: KpiKind, note: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            kind,
            value: None,
            note: Some(note.into()),
        }
    }

    pub fn is_ratio(&self) -> bool {
        self.kind == KpiKind::Ratio
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReport {
    pub title: String,
    pub generated_on: NaiveDate,
    pub row_count: usize,
    pub kpis: Vec<Kpi>,
    pub monthly: Option<MonthlySeries>,
    pub segments: Option<AggregatedTable>,
}

impl KpiReport {
    pub fn build(table: &Table, config: &ReportConfig) -> Result<Self> {
        Self::build_on(table, config, chrono::Local::now().date_naive())
    }

    /// Computes every KPI the table supports.
    ///
    /// Total sales is required. The margin appears only when both revenue and
    /// cost columns exist; zero revenue keeps the KPI with no value. Monthly
    /// and segment tables are included when their columns exist.
    pub fn build_on(table: &Table, config: &ReportConfig, generated_on: NaiveDate) -> Result<Self> {
        let columns = &config.columns;
        info!("Building KPI report '{}' over {} rows", config.title, table.len());

        let mut kpis = vec![Kpi::defined(
            KPI_TOTAL_SALES,
            KpiKind::Amount,
            total_sales(table, &columns.sales)?,
        )];

        match profit_margin(table, &columns.revenue, &columns.cost) {
            Ok(margin) => kpis.push(Kpi::defined(KPI_PROFIT_MARGIN, KpiKind::Ratio, margin)),
            Err(DataInsightError::UndefinedMetric(reason)) => {
                warn!("Profit margin is undefined: {}", reason);
                kpis.push(Kpi::undefined(KPI_PROFIT_MARGIN, KpiKind::Ratio, reason));
            }
            Err(DataInsightError::ColumnNotFound(column)) => {
                debug!("Skipping profit margin, column '{}' is absent", column);
            }
            Err(e) => return Err(e),
        }

        let monthly = if table.has_column(&columns.date) {
            let series = monthly_growth_rate(table, &columns.date, &columns.sales)?;
            if let Some(latest) = series.latest() {
                kpis.push(match latest.growth_rate {
                    Some(rate) => Kpi::defined(KPI_LATEST_GROWTH, KpiKind::Ratio, rate),
                    None => Kpi::undefined(
                        KPI_LATEST_GROWTH,
                        KpiKind::Ratio,
                        format!("no comparable previous month for {}", latest.month),
                    ),
                });
            }
            Some(series)
        } else {
            debug!("Skipping monthly series, column '{}' is absent", columns.date);
            None
        };

        let segments = if table.has_column(&columns.segment) {
            Some(segment_data(table, &columns.segment, &columns.sales)?)
        } else {
            debug!("Skipping segments, column '{}' is absent", columns.segment);
            None
        };

        Ok(Self {
            title: config.title.clone(),
            generated_on,
            row_count: table.len(),
            kpis,
            monthly,
            segments,
        })
    }

    pub fn kpi(&self, name: &str) -> Option<&Kpi> {
        self.kpis.iter().find(|k| k.name == name)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One record per KPI under a `KPI,Valor,Nota` header. Fields are quoted
    /// as needed, so notes and names may contain commas or quotes.
    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(["KPI", "Valor", "Nota"])?;

        for kpi in &self.kpis {
            let value = kpi.value.map(|v| v.to_string()).unwrap_or_default();
            writer.write_record([
                kpi.name.as_str(),
                value.as_str(),
                kpi.note.as_deref().unwrap_or(""),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DataInsightError::Export(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| DataInsightError::Export(e.to_string()))
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.title));
        output.push_str(&format!(
            "**Fecha:** {} | **Registros:** {}\n\n",
            self.generated_on, self.row_count
        ));

        output.push_str("## KPIs\n\n");
        for kpi in &self.kpis {
            let value = match kpi.value {
                Some(v) if kpi.is_ratio() => format!("{:.2}%", v * 100.0),
                Some(v) => format!("{:.2}", v),
                None => "n/d".to_string(),
            };
            output.push_str(&format!("- {}: {}\n", kpi.name, value));
        }
        output.push('\n');

        if let Some(monthly) = &self.monthly {
            output.push_str("## Ventas Mensuales\n\n");
            output.push_str("| Mes | Ventas | Crecimiento |\n|---|---|---|\n");
            for point in &monthly.points {
                let growth = point
                    .growth_rate
                    .map(|g| format!("{:.2}%", g * 100.0))
                    .unwrap_or_else(|| "n/d".to_string());
                output.push_str(&format!(
                    "| {} | {:.2} | {} |\n",
                    point.month, point.total_sales, growth
                ));
            }
            output.push('\n');
        }

        if let Some(segments) = &self.segments {
            output.push_str(&format!("## Ventas por {}\n\n", segments.key_column));
            for row in &segments.rows {
                output.push_str(&format!("- {}: {:.2}\n", row.key, row.total));
            }
            output.push('\n');
        }

        output
    }
}
