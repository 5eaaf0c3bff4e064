use crate::analytics::{
    DEFAULT_COST_COLUMN, DEFAULT_DATE_COLUMN, DEFAULT_REVENUE_COLUMN, DEFAULT_SALES_COLUMN,
    DEFAULT_SEGMENT_COLUMN,
};
use crate::error::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which input columns hold which business quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct ColumnMapping {
    #[schemars(description = "Numeric column with the sales amount of each record (default 'ventas').")]
    pub sales: String,

    #[schemars(description = "Numeric column with revenue, used for the profit margin (default 'ingresos').")]
    pub revenue: String,

    #[schemars(description = "Numeric column with costs, used for the profit margin (default 'costos').")]
    pub cost: String,

    #[schemars(
        description = "Column with the record date. Rows whose date cannot be parsed are left out of monthly figures (default 'fecha')."
    )]
    pub date: String,

    #[schemars(description = "Column whose distinct values define the segments, e.g. 'producto' or 'region'.")]
    pub segment: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            sales: DEFAULT_SALES_COLUMN.to_string(),
            revenue: DEFAULT_REVENUE_COLUMN.to_string(),
            cost: DEFAULT_COST_COLUMN.to_string(),
            date: DEFAULT_DATE_COLUMN.to_string(),
            segment: DEFAULT_SEGMENT_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Heading written at the top of the report.")]
    pub title: String,

    #[schemars(description = "Column names used by every metric in the report.")]
    pub columns: ColumnMapping,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: "Reporte de Análisis de Datos - DataInsight".to_string(),
            columns: ColumnMapping::default(),
        }
    }
}

impl ReportConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }
}

pub fn report_config_schema() -> Result<String> {
    let schema = schemars::schema_for!(ReportConfig);
    Ok(serde_json::to_string_pretty(&schema)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_spanish_column_names() {
        let columns = ColumnMapping::default();
        assert_eq!(columns.sales, "ventas");
        assert_eq!(columns.revenue, "ingresos");
        assert_eq!(columns.cost, "costos");
        assert_eq!(columns.date, "fecha");
        assert_eq!(columns.segment, "producto");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ReportConfig::from_json_str(r#"{"columns": {"segment": "region"}}"#).unwrap();
        assert_eq!(config.columns.segment, "region");
        assert_eq!(config.columns.sales, "ventas");
        assert_eq!(config.title, ReportConfig::default().title);
    }

    #[test]
    fn test_schema_generation() {
        let schema = report_config_schema().unwrap();
        assert!(schema.contains("ColumnMapping"));
        assert!(schema.contains("segment"));
    }
}
