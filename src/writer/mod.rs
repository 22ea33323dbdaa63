use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::model::{GridFeature, Identifier};
use crate::processor::FeatureSink;

pub const ROW_ID_FIELD: &str = "row_id";
pub const COL_ID_FIELD: &str = "col_id";

/// Writes features as CSV with `row_id` and `col_id` appended to the input fields.
pub struct CsvFeatureSink<W: Write> {
    writer: csv::Writer<W>,
    field_count: usize,
}

/// CSV output that only appears at `output_path` once [`CsvOutputFile::persist`] succeeds.
///
/// Records go to a temporary file next to the target; dropping the output
/// without persisting removes it, so a failed run leaves nothing behind.
pub struct CsvOutputFile {
    sink: CsvFeatureSink<NamedTempFile>,
    output_path: PathBuf,
}

impl CsvOutputFile {
    pub fn create(output_path: &Path, fields: &[String]) -> Result<Self> {
        let dir = match output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let file = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temporary file in {:?}", dir))?;

        Ok(Self {
            sink: CsvFeatureSink::new(file, fields)?,
            output_path: output_path.to_path_buf(),
        })
    }

    /// Flushes and moves the temporary file to the output path.
    pub fn persist(self) -> Result<()> {
        let file = self.sink.into_inner()?;
        file.persist(&self.output_path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {:?}", self.output_path))?;
        Ok(())
    }
}

impl FeatureSink for CsvOutputFile {
    fn add_feature(&mut self, feature: &GridFeature, identifier: &Identifier) -> Result<()> {
        self.sink.add_feature(feature, identifier)
    }

    fn finish(&mut self) -> Result<()> {
        self.sink.finish()
    }
}

impl<W: Write> CsvFeatureSink<W> {
    pub fn new(writer: W, fields: &[String]) -> Result<Self> {
        // 出力フィールド名は一意でなければならない
        for name in [ROW_ID_FIELD, COL_ID_FIELD] {
            if fields.iter().any(|field| field == name) {
                bail!("Input already has a '{}' field", name);
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(writer);

        let header = fields
            .iter()
            .map(String::as_str)
            .chain([ROW_ID_FIELD, COL_ID_FIELD]);
        writer
            .write_record(header)
            .context("Failed to write CSV header")?;

        Ok(Self {
            writer,
            field_count: fields.len(),
        })
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV output: {}", e.error()))
    }
}

impl<W: Write> FeatureSink for CsvFeatureSink<W> {
    fn add_feature(&mut self, feature: &GridFeature, identifier: &Identifier) -> Result<()> {
        if feature.attributes.len() != self.field_count {
            bail!(
                "Feature {} has {} attributes, expected {}",
                feature.id,
                feature.attributes.len(),
                self.field_count
            );
        }

        let record = feature
            .attributes
            .iter()
            .map(String::as_str)
            .chain([identifier.row_part.as_str(), identifier.col_part.as_str()]);
        self.writer
            .write_record(record)
            .context("Failed to write CSV record")?;

        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush CSV output")?;
        Ok(())
    }
}
