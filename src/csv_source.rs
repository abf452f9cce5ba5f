use crate::source::{RawRecord, RecordSource, SourceError, SourceName};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Record source over a directory of CSV exports.
///
/// Each logical source is read from `<dir>/<source>.csv` (for example
/// `customers.csv`, `touchpoints_extra.csv`) with a header row. Cells are
/// handed over as trimmed text and converted per field by the record
/// decoders, so `007` and `7` stay distinct keys. An empty cell is an absent
/// field.
#[derive(Debug, Clone)]
pub struct CsvRecordSource {
    dir: PathBuf,
}

impl CsvRecordSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvRecordSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the file backing `source`.
    pub fn path_for(&self, source: SourceName) -> PathBuf {
        self.dir.join(format!("{}.csv", source.as_str()))
    }
}

fn cell_value(cell: &str) -> Option<Value> {
    let cell = cell.trim();
    if cell.is_empty() {
        None
    } else {
        Some(Value::String(cell.to_string()))
    }
}

impl RecordSource for CsvRecordSource {
    fn fetch(&self, source: SourceName) -> Result<Vec<RawRecord>, SourceError> {
        let path = self.path_for(source);
        if !path.is_file() {
            return Err(SourceError::NotFound(source));
        }

        let retrieval = |e: csv::Error| SourceError::Retrieval {
            source,
            message: format!("{}: {}", path.display(), e),
        };

        let mut reader = csv::Reader::from_path(&path).map_err(retrieval)?;
        let headers = reader.headers().map_err(retrieval)?.clone();

        let mut records = Vec::new();
        for result in reader.records() {
            let row = result.map_err(retrieval)?;
            let record: RawRecord = headers
                .iter()
                .zip(row.iter())
                .filter_map(|(field, cell)| cell_value(cell).map(|value| (field.to_string(), value)))
                .collect();
            records.push(record);
        }

        log::info!("Loaded {} rows from {}", records.len(), path.display());
        Ok(records)
    }
}
