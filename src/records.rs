//! Typed record sets consumed by the cost pipeline, and decoding from raw rows.

use crate::channel::ChannelLabel;
use crate::dedup::UniqueKey;
use crate::error::PipelineError;
use crate::source::{RawRecord, SourceName};
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Record key as delivered by a source: warehouses hand out integers,
/// flat files often strings.
///
/// `Int(1)` and `Text("1")` are distinct keys. Whole-number floats, as
/// produced by `REAL` columns or float-converted warehouse numbers, decode
/// to `Int`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RecordIdVisitor)
    }
}

struct RecordIdVisitor;

impl<'de> de::Visitor<'de> for RecordIdVisitor {
    type Value = RecordId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "an integer, a whole-number float or a string")
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RecordId, E> {
        Ok(RecordId::Int(value))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RecordId, E> {
        i64::try_from(value)
            .map(RecordId::Int)
            .map_err(|_| E::custom(format!("record id {} is out of range", value)))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<RecordId, E> {
        // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            Ok(RecordId::Int(value as i64))
        } else {
            Err(E::custom(format!("record id {} is not a whole number", value)))
        }
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RecordId, E> {
        Ok(RecordId::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<RecordId, E> {
        Ok(RecordId::Text(value))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        RecordId::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        RecordId::Int(i64::from(value))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        RecordId::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        RecordId::Text(value)
    }
}

/// A customer and the channel they were acquired through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer_id: RecordId,
    pub acquisition_channel: ChannelLabel,
}

impl CustomerRecord {
    pub fn new(customer_id: impl Into<RecordId>, acquisition_channel: ChannelLabel) -> Self {
        CustomerRecord {
            customer_id: customer_id.into(),
            acquisition_channel,
        }
    }
}

/// A single marketing spend line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub spend_id: RecordId,
    pub channel: ChannelLabel,
    #[serde(deserialize_with = "deserialize_amount")]
    pub spend_amount: f64,
}

impl SpendRecord {
    pub fn new(spend_id: impl Into<RecordId>, channel: ChannelLabel, spend_amount: f64) -> Self {
        SpendRecord {
            spend_id: spend_id.into(),
            channel,
            spend_amount,
        }
    }
}

/// A customer interaction on a touchpoint channel, possibly a conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchpointRecord {
    pub touchpoint_id: RecordId,
    /// Logical reference to a customer; it does not have to resolve.
    pub customer_id: RecordId,
    pub channel: ChannelLabel,
    #[serde(deserialize_with = "deserialize_flag")]
    pub converted_flag: bool,
}

impl TouchpointRecord {
    pub fn new(
        touchpoint_id: impl Into<RecordId>,
        customer_id: impl Into<RecordId>,
        channel: ChannelLabel,
        converted_flag: bool,
    ) -> Self {
        TouchpointRecord {
            touchpoint_id: touchpoint_id.into(),
            customer_id: customer_id.into(),
            channel,
            converted_flag,
        }
    }
}

impl UniqueKey for CustomerRecord {
    type Key = RecordId;

    fn unique_key(&self) -> &RecordId {
        &self.customer_id
    }
}

impl UniqueKey for SpendRecord {
    type Key = RecordId;

    fn unique_key(&self) -> &RecordId {
        &self.spend_id
    }
}

impl UniqueKey for TouchpointRecord {
    type Key = RecordId;

    fn unique_key(&self) -> &RecordId {
        &self.touchpoint_id
    }
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let amount = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| de::Error::custom(format!("spend_amount is not numeric: {}", value)))?;

    if !amount.is_finite() || amount < 0.0 {
        return Err(de::Error::custom(format!(
            "spend_amount must be a non-negative finite value, got {}",
            amount
        )));
    }

    Ok(amount)
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Bool(flag) => Ok(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(de::Error::custom(format!("converted_flag is not 0/1: {}", value))),
        },
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            _ => Err(de::Error::custom(format!("converted_flag is not boolean: {}", value))),
        },
        _ => Err(de::Error::custom(format!("converted_flag is not boolean: {}", value))),
    }
}

/// Decodes raw rows from `source` into typed records.
///
/// Field names are matched case-insensitively; unknown fields are ignored.
/// The first row that fails to decode aborts with a schema mismatch.
pub fn decode_rows<T: DeserializeOwned>(
    source: SourceName,
    rows: Vec<RawRecord>,
) -> Result<Vec<T>, PipelineError> {
    rows.into_iter()
        .enumerate()
        .map(|(row, raw)| {
            let normalized: serde_json::Map<String, Value> = raw
                .into_iter()
                .map(|(field, value)| (field.to_lowercase(), value))
                .collect();

            serde_json::from_value(Value::Object(normalized)).map_err(|e| {
                PipelineError::SchemaMismatch {
                    source,
                    row,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test rows must be objects"),
        }
    }

    #[test]
    fn test_decode_customers_with_uppercase_columns() {
        let rows = vec![
            raw(json!({"CUSTOMER_ID": 1, "ACQUISITION_CHANNEL": "Email"})),
            raw(json!({"customer_id": "c-2", "acquisition_channel": "Google", "age": 31})),
        ];

        let customers: Vec<CustomerRecord> = decode_rows(SourceName::Customers, rows).unwrap();
        assert_eq!(customers.len(), 2);
        assert_eq!(customers[0].customer_id, RecordId::Int(1));
        assert_eq!(customers[0].acquisition_channel.as_str(), "Email");
        assert_eq!(customers[1].customer_id, RecordId::Text("c-2".to_string()));
    }

    #[test]
    fn test_decode_missing_field_is_schema_mismatch() {
        let rows = vec![
            raw(json!({"spend_id": "s1", "channel": "Email", "spend_amount": 10.0})),
            raw(json!({"spend_id": "s2", "channel": "Email"})),
        ];

        let result: Result<Vec<SpendRecord>, _> = decode_rows(SourceName::Spend, rows);
        match result {
            Err(PipelineError::SchemaMismatch { source, row, message }) => {
                assert_eq!(source, SourceName::Spend);
                assert_eq!(row, 1);
                assert!(message.contains("spend_amount"));
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_spend_amount_accepts_integers_and_numeric_strings() {
        let rows = vec![
            raw(json!({"spend_id": 1, "channel": "Email", "spend_amount": 250})),
            raw(json!({"spend_id": 2, "channel": "Email", "spend_amount": " 12.5 "})),
        ];

        let spend: Vec<SpendRecord> = decode_rows(SourceName::Spend, rows).unwrap();
        assert_eq!(spend[0].spend_amount, 250.0);
        assert_eq!(spend[1].spend_amount, 12.5);
    }

    #[test]
    fn test_negative_spend_rejected() {
        let rows = vec![raw(json!({"spend_id": 1, "channel": "Email", "spend_amount": -5.0}))];
        let result: Result<Vec<SpendRecord>, _> = decode_rows(SourceName::Spend, rows);
        assert!(matches!(result, Err(PipelineError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_converted_flag_representations() {
        let rows = vec![
            raw(json!({"touchpoint_id": 1, "customer_id": 1, "channel": "Email", "converted_flag": true})),
            raw(json!({"touchpoint_id": 2, "customer_id": 1, "channel": "Email", "converted_flag": 0})),
            raw(json!({"touchpoint_id": 3, "customer_id": 1, "channel": "Email", "converted_flag": "TRUE"})),
            raw(json!({"touchpoint_id": 4, "customer_id": 1, "channel": "Email", "converted_flag": "no"})),
        ];

        let touchpoints: Vec<TouchpointRecord> =
            decode_rows(SourceName::Touchpoints, rows).unwrap();
        let flags: Vec<bool> = touchpoints.iter().map(|t| t.converted_flag).collect();
        assert_eq!(flags, vec![true, false, true, false]);
    }

    #[test]
    fn test_invalid_flag_and_empty_label_rejected() {
        let bad_flag = vec![raw(
            json!({"touchpoint_id": 1, "customer_id": 1, "channel": "Email", "converted_flag": 2}),
        )];
        let result: Result<Vec<TouchpointRecord>, _> =
            decode_rows(SourceName::Touchpoints, bad_flag);
        assert!(result.is_err());

        let empty_label = vec![raw(json!({"customer_id": 1, "acquisition_channel": " "}))];
        let result: Result<Vec<CustomerRecord>, _> =
            decode_rows(SourceName::Customers, empty_label);
        assert!(result.is_err());
    }

    #[test]
    fn test_whole_float_ids_decode_as_integers() {
        let rows = vec![
            raw(json!({"customer_id": 1.0, "acquisition_channel": "Email"})),
            raw(json!({"customer_id": 42, "acquisition_channel": "Google"})),
        ];
        let customers: Vec<CustomerRecord> = decode_rows(SourceName::Customers, rows).unwrap();
        assert_eq!(customers[0].customer_id, RecordId::Int(1));
        assert_eq!(customers[1].customer_id, RecordId::Int(42));

        let fractional = vec![raw(json!({"customer_id": 1.5, "acquisition_channel": "Email"}))];
        let result: Result<Vec<CustomerRecord>, _> =
            decode_rows(SourceName::Customers, fractional);
        match result {
            Err(PipelineError::SchemaMismatch { message, .. }) => {
                assert!(message.contains("not a whole number"));
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_record_id_kinds_are_distinct() {
        assert_ne!(RecordId::from(1), RecordId::from("1"));
        assert_eq!(RecordId::from(7).to_string(), "7");
    }
}
