use crate::records::{CustomerRecord, RecordId, SpendRecord, TouchpointRecord};
use crate::source::{RawRecord, RecordSource, SourceError, SourceName};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Result as SqliteResult};
use serde_json::Value;
use std::path::Path;

/// SQLite-based record source.
///
/// Each logical source is a table named after the warehouse table
/// (`CUSTOMERS`, `MARKETING_SPEND`, ...). Rows are read with `SELECT *`, so
/// tables may carry extra columns.
#[derive(Debug)]
pub struct SqliteRecordSource {
    conn: Connection,
}

impl SqliteRecordSource {
    /// Opens a record source over a database file.
    ///
    /// # Errors
    /// Returns an error if the database connection cannot be established.
    pub fn new<P: AsRef<Path>>(db_path: P) -> SqliteResult<Self> {
        let conn = Connection::open(db_path)?;
        Ok(SqliteRecordSource { conn })
    }

    /// Creates a record source over an in-memory database with all tables present.
    ///
    /// Useful for testing.
    pub fn new_in_memory() -> SqliteResult<Self> {
        let conn = Connection::open_in_memory()?;
        let source = SqliteRecordSource { conn };
        source.ensure_schema()?;
        Ok(source)
    }

    /// Creates every source table that does not exist yet.
    ///
    /// Id columns are declared without a type so SQLite keeps integer and
    /// text keys as they were written.
    pub fn ensure_schema(&self) -> SqliteResult<()> {
        for name in [SourceName::Customers, SourceName::CustomersExtra] {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        customer_id NOT NULL,
                        acquisition_channel TEXT NOT NULL
                    )",
                    name.table_name()
                ),
                [],
            )?;
        }

        for name in [SourceName::Spend, SourceName::SpendExtra] {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        spend_id NOT NULL,
                        channel TEXT NOT NULL,
                        spend_amount REAL NOT NULL
                    )",
                    name.table_name()
                ),
                [],
            )?;
        }

        for name in [SourceName::Touchpoints, SourceName::TouchpointsExtra] {
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        touchpoint_id NOT NULL,
                        customer_id NOT NULL,
                        channel TEXT NOT NULL,
                        converted_flag INTEGER NOT NULL
                    )",
                    name.table_name()
                ),
                [],
            )?;
        }

        Ok(())
    }

    /// Checks if a table exists in the database.
    pub fn table_exists(&self, table_name: &str) -> SqliteResult<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")?;
        let exists = stmt.exists([table_name])?;
        Ok(exists)
    }

    /// Appends customer rows to a customer table.
    pub fn insert_customers(
        &mut self,
        source: SourceName,
        customers: &[CustomerRecord],
    ) -> SqliteResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (customer_id, acquisition_channel) VALUES (?1, ?2)",
                source.table_name()
            ))?;
            for customer in customers {
                stmt.execute(params![
                    id_to_sql(&customer.customer_id),
                    customer.acquisition_channel.as_str()
                ])?;
            }
        }
        tx.commit()
    }

    /// Appends spend rows to a spend table.
    pub fn insert_spend(&mut self, source: SourceName, spend: &[SpendRecord]) -> SqliteResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (spend_id, channel, spend_amount) VALUES (?1, ?2, ?3)",
                source.table_name()
            ))?;
            for record in spend {
                stmt.execute(params![
                    id_to_sql(&record.spend_id),
                    record.channel.as_str(),
                    record.spend_amount
                ])?;
            }
        }
        tx.commit()
    }

    /// Appends touchpoint rows to a touchpoint table.
    pub fn insert_touchpoints(
        &mut self,
        source: SourceName,
        touchpoints: &[TouchpointRecord],
    ) -> SqliteResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} (touchpoint_id, customer_id, channel, converted_flag) VALUES (?1, ?2, ?3, ?4)",
                source.table_name()
            ))?;
            for touchpoint in touchpoints {
                stmt.execute(params![
                    id_to_sql(&touchpoint.touchpoint_id),
                    id_to_sql(&touchpoint.customer_id),
                    touchpoint.channel.as_str(),
                    touchpoint.converted_flag
                ])?;
            }
        }
        tx.commit()
    }

    /// Returns a reference to the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn id_to_sql(id: &RecordId) -> rusqlite::types::Value {
    match id {
        RecordId::Int(value) => rusqlite::types::Value::Integer(*value),
        RecordId::Text(value) => rusqlite::types::Value::Text(value.clone()),
    }
}

fn value_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}

impl RecordSource for SqliteRecordSource {
    fn fetch(&self, source: SourceName) -> Result<Vec<RawRecord>, SourceError> {
        let table = source.table_name();
        let retrieval = |e: rusqlite::Error| SourceError::Retrieval {
            source,
            message: format!("SQL error: {}", e),
        };

        if !self.table_exists(table).map_err(retrieval)? {
            return Err(SourceError::NotFound(source));
        }

        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {}", table))
            .map_err(retrieval)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let rows = stmt
            .query_map([], |row| {
                let mut record = RawRecord::new();
                for (idx, column) in columns.iter().enumerate() {
                    let value = value_to_json(row.get_ref(idx)?);
                    // NULL reads as an absent field so decoding reports it missing.
                    if !value.is_null() {
                        record.insert(column.clone(), value);
                    }
                }
                Ok(record)
            })
            .map_err(retrieval)?;

        let mut records = Vec::new();
        for row_result in rows {
            match row_result {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(SourceError::Retrieval {
                        source,
                        message: format!("Row parsing error: {}", e),
                    })
                }
            }
        }

        log::info!("Loaded {} rows from {}", records.len(), table);
        Ok(records)
    }
}
