use anyhow::{bail, Context, Result};
use std::io::Read;
use tracing::debug;

use crate::model::{CellExtent, GridFeature, LayerExtent};
use crate::processor::FeatureSource;

/// Columns every grid layer must carry.
pub const REQUIRED_FIELDS: [&str; 5] = ["id", "left", "right", "top", "bottom"];

/// Grid layer read from CSV, one feature per record.
#[derive(Debug, Clone)]
pub struct CsvFeatureSource {
    fields: Vec<String>,
    features: Vec<GridFeature>,
    layer_extent: LayerExtent,
}

impl CsvFeatureSource {
    /// Replaces the extent derived from the cells.
    pub fn with_layer_extent(mut self, layer_extent: LayerExtent) -> Self {
        self.layer_extent = layer_extent;
        self
    }
}

impl FeatureSource for CsvFeatureSource {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    fn layer_extent(&self) -> LayerExtent {
        self.layer_extent
    }

    fn features(&self) -> &[GridFeature] {
        &self.features
    }
}

pub fn read_grid_csv<R: Read>(reader: R) -> Result<CsvFeatureSource> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let fields: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    // 必須カラムの位置を解決
    let mut columns = [0usize; 5];
    for (slot, name) in columns.iter_mut().zip(REQUIRED_FIELDS) {
        *slot = match fields.iter().position(|field| field == name) {
            Some(index) => index,
            None => bail!("Missing required column '{}'", name),
        };
    }
    let [id_col, left_col, right_col, top_col, bottom_col] = columns;

    let mut features = Vec::new();
    for result in reader.records() {
        let record = result.context("Failed to read CSV record")?;
        let line = record.position().map_or(0, |p| p.line());

        let number = |col: usize| -> Result<f64> {
            let raw = record.get(col).unwrap_or("").trim();
            raw.parse::<f64>().with_context(|| {
                format!("Line {}: invalid value '{}' in column '{}'", line, raw, fields[col])
            })
        };

        // 属性値はそのまま残し、数値として読む値だけ空白を除く
        let raw_id = record.get(id_col).unwrap_or("").trim();
        let id = parse_id(raw_id)
            .with_context(|| format!("Line {}: invalid id '{}'", line, raw_id))?;

        features.push(GridFeature {
            id,
            cell: CellExtent {
                left: number(left_col)?,
                right: number(right_col)?,
                top: number(top_col)?,
                bottom: number(bottom_col)?,
            },
            attributes: record.iter().map(str::to_string).collect(),
        });
    }

    let layer_extent =
        LayerExtent::from_cells(features.iter().map(|f| &f.cell)).unwrap_or(LayerExtent {
            width: 0.0,
            height: 0.0,
        });

    debug!(
        "Read {} features, layer extent {} x {}",
        features.len(),
        layer_extent.width,
        layer_extent.height
    );

    Ok(CsvFeatureSource {
        fields,
        features,
        layer_extent,
    })
}

/// Feature ids may be exported as floats ("13.0").
fn parse_id(raw: &str) -> Result<u64> {
    if let Ok(id) = raw.parse::<u64>() {
        return Ok(id);
    }

    let value: f64 = raw.parse()?;
    if value.fract() != 0.0 || value < 0.0 || value > u64::MAX as f64 {
        bail!("id must be a non-negative integer");
    }
    Ok(value as u64)
}
