//! Figure data for the dashboard and reports.
//!
//! A [`ChartSpec`] carries the points and labels of one chart; drawing it is
//! left to whatever front end receives the JSON.

use crate::analytics::{AggregatedTable, MonthlySeries};
use crate::table::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
}

impl ChartSpec {
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn monthly_sales_trend(series: &MonthlySeries) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Line,
        title: "Tendencia Mensual de Ventas".to_string(),
        x_label: "Mes".to_string(),
        y_label: "Ventas".to_string(),
        x: series.points.iter().map(|p| p.month.to_string()).collect(),
        y: series.points.iter().map(|p| p.total_sales).collect(),
    }
}

pub fn segmented_sales(segments: &AggregatedTable) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Ventas por {}", segments.key_column),
        x_label: segments.key_column.clone(),
        y_label: segments.value_column.clone(),
        x: segments.rows.iter().map(|r| r.key.to_string()).collect(),
        y: segments.rows.iter().map(|r| r.total).collect(),
    }
}

/// Bar chart with only the bar for `segment`; empty when the segment has no
/// total.
pub fn segment_focus(segments: &AggregatedTable, segment: &Value) -> ChartSpec {
    let (x, y) = match segments.get(segment) {
        Some(total) => (vec![segment.to_string()], vec![total]),
        None => (Vec::new(), Vec::new()),
    };

    ChartSpec {
        kind: ChartKind::Bar,
        title: format!("Ventas para {}", segment),
        x_label: segments.key_column.clone(),
        y_label: segments.value_column.clone(),
        x,
        y,
    }
}
