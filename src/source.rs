use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A raw row as delivered by a source: field name to value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// Logical record sources the pipeline reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceName {
    Customers,
    CustomersExtra,
    Spend,
    SpendExtra,
    Touchpoints,
    TouchpointsExtra,
}

impl SourceName {
    pub const ALL: [SourceName; 6] = [
        SourceName::Customers,
        SourceName::CustomersExtra,
        SourceName::Spend,
        SourceName::SpendExtra,
        SourceName::Touchpoints,
        SourceName::TouchpointsExtra,
    ];

    /// Warehouse table holding this source.
    pub fn table_name(&self) -> &'static str {
        match self {
            SourceName::Customers => "CUSTOMERS",
            SourceName::CustomersExtra => "CUSTOMERS_EXTRA",
            SourceName::Spend => "MARKETING_SPEND",
            SourceName::SpendExtra => "MARKETING_SPEND_EXTRA",
            SourceName::Touchpoints => "CUSTOMER_TOUCHPOINTS",
            SourceName::TouchpointsExtra => "CUSTOMER_TOUCHPOINTS_EXTRA",
        }
    }

    /// Identifier used for file names and log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::Customers => "customers",
            SourceName::CustomersExtra => "customers_extra",
            SourceName::Spend => "spend",
            SourceName::SpendExtra => "spend_extra",
            SourceName::Touchpoints => "touchpoints",
            SourceName::TouchpointsExtra => "touchpoints_extra",
        }
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Trait for record source abstraction.
///
/// The cost pipeline pulls every record set through this trait so that it
/// never holds a connection or performs I/O itself. Implementations can be:
/// - In-memory rows (for testing)
/// - SQLite database
/// - A directory of CSV files
pub trait RecordSource {
    /// Retrieves all rows of a logical source.
    ///
    /// # Errors
    /// Returns an error if the source does not exist or cannot be read.
    /// A missing source must never be reported as an empty one.
    fn fetch(&self, source: SourceName) -> Result<Vec<RawRecord>, SourceError>;
}

impl<S: RecordSource + ?Sized> RecordSource for &S {
    fn fetch(&self, source: SourceName) -> Result<Vec<RawRecord>, SourceError> {
        (**self).fetch(source)
    }
}

/// Errors that can occur when retrieving a record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The source does not exist
    NotFound(SourceName),
    /// The source exists but could not be read
    Retrieval { source: SourceName, message: String },
}

impl SourceError {
    pub fn source_name(&self) -> SourceName {
        match self {
            SourceError::NotFound(source) => *source,
            SourceError::Retrieval { source, .. } => *source,
        }
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::NotFound(source) => write!(f, "Source not found: {}", source),
            SourceError::Retrieval { source, message } => {
                write!(f, "Failed to read source {}: {}", source, message)
            }
        }
    }
}

impl std::error::Error for SourceError {}

/// In-memory record source for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    data: HashMap<SourceName, Vec<RawRecord>>,
}

impl InMemoryRecordSource {
    /// Creates a new empty in-memory source. Every source is missing until rows are added.
    pub fn new() -> Self {
        InMemoryRecordSource {
            data: HashMap::new(),
        }
    }

    /// Sets the rows of a source, replacing any previous rows.
    pub fn add_rows(&mut self, source: SourceName, rows: Vec<RawRecord>) {
        self.data.insert(source, rows);
    }

    /// Serializes typed records into rows and stores them under `source`.
    ///
    /// # Errors
    /// Returns an error if a record does not serialize to a JSON object.
    pub fn add_records<T: Serialize>(
        &mut self,
        source: SourceName,
        records: &[T],
    ) -> Result<(), serde_json::Error> {
        let mut rows = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::to_value(record)? {
                serde_json::Value::Object(map) => rows.push(map),
                other => {
                    return Err(serde::ser::Error::custom(format!(
                        "record did not serialize to an object: {}",
                        other
                    )))
                }
            }
        }
        self.add_rows(source, rows);
        Ok(())
    }
}

impl RecordSource for InMemoryRecordSource {
    fn fetch(&self, source: SourceName) -> Result<Vec<RawRecord>, SourceError> {
        self.data
            .get(&source)
            .cloned()
            .ok_or(SourceError::NotFound(source))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelLabel;
    use crate::records::CustomerRecord;

    #[test]
    fn test_missing_source_is_error_not_empty() {
        let source = InMemoryRecordSource::new();
        assert_eq!(
            source.fetch(SourceName::Customers),
            Err(SourceError::NotFound(SourceName::Customers))
        );
    }

    #[test]
    fn test_add_records_and_fetch() {
        let mut source = InMemoryRecordSource::new();
        let customers = vec![CustomerRecord::new(1, ChannelLabel::new("Email").unwrap())];
        source.add_records(SourceName::Customers, &customers).unwrap();

        let rows = source.fetch(SourceName::Customers).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["customer_id"], serde_json::json!(1));
        assert_eq!(rows[0]["acquisition_channel"], serde_json::json!("Email"));
    }

    #[test]
    fn test_empty_source_is_not_missing() {
        let mut source = InMemoryRecordSource::new();
        source.add_rows(SourceName::Spend, Vec::new());
        assert_eq!(source.fetch(SourceName::Spend).unwrap().len(), 0);
        assert!(source.fetch(SourceName::SpendExtra).is_err());
    }

    #[test]
    fn test_source_names() {
        assert_eq!(SourceName::Spend.table_name(), "MARKETING_SPEND");
        assert_eq!(SourceName::TouchpointsExtra.to_string(), "touchpoints_extra");
        assert_eq!(SourceName::ALL.len(), 6);
    }
}
