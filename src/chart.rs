//! # Chart Builder
//!
//! Derives a bar chart from the first two numeric columns of a table and
//! renders it as a Vega-Lite document for the browser.
use crate::table::Table;
use serde::Serialize;
use serde_json::json;
use serde_json::Map;

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Axis encoding of one column.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Encoding {
    pub field: String,
    /// Vega-Lite measurement type, always `quantitative` here
    #[serde(rename = "type")]
    pub kind: &'static str,
}

/// One bar: row label plus the x and y values of that row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    pub index: String,
    pub x: f64,
    pub y: f64,
}

/// Bar chart over two quantitative columns.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartSpec {
    pub mark: &'static str,
    pub x: Encoding,
    pub y: Encoding,
    pub points: Vec<ChartPoint>,
}

/// Builds the chart, or returns `None` when the table has fewer than two
/// numeric columns. Rows missing either value are left out.
pub fn build_chart(table: &Table) -> Option<ChartSpec> {
    let mut numeric = table.columns().iter().filter(|column| column.kind.is_numeric());
    let x = numeric.next()?;
    let y = numeric.next()?;

    let points = x
        .values
        .iter()
        .zip(&y.values)
        .enumerate()
        .filter_map(|(index, (x, y))| {
            Some(ChartPoint {
                index: index.to_string(),
                x: x.as_f64()?,
                y: y.as_f64()?,
            })
        })
        .collect();

    Some(ChartSpec {
        mark: "bar",
        x: Encoding {
            field: x.name.to_owned(),
            kind: "quantitative",
        },
        y: Encoding {
            field: y.name.to_owned(),
            kind: "quantitative",
        },
        points,
    })
}

impl ChartSpec {
    /// Renders a Vega-Lite v5 specification filling the container width.
    pub fn to_vega_lite(&self) -> serde_json::Value {
        let label = self.label_field();
        let values = self
            .points
            .iter()
            .map(|point| {
                let mut row = Map::new();
                row.insert(label.to_owned(), json!(point.index));
                row.insert(self.x.field.to_owned(), json!(point.x));
                row.insert(self.y.field.to_owned(), json!(point.y));
                serde_json::Value::Object(row)
            })
            .collect::<Vec<_>>();

        json!({
            "$schema": VEGA_LITE_SCHEMA,
            "width": "container",
            "data": { "values": values },
            "mark": self.mark,
            "encoding": {
                "x": { "field": escape_field(&self.x.field), "type": self.x.kind },
                "y": { "field": escape_field(&self.y.field), "type": self.y.kind },
            },
        })
    }

    /// Key of the row label in the data values, prefixed with underscores
    /// until it differs from both column names.
    fn label_field(&self) -> String {
        let mut label = "index".to_owned();
        while label == self.x.field || label == self.y.field {
            label.insert(0, '_');
        }
        label
    }
}

/// Vega-Lite reads `.` and brackets in field names as nested access.
fn escape_field(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for character in name.chars() {
        if matches!(character, '.' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}
