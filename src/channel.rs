use serde::de;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

/// Channel label shared by every record type as the join key.
///
/// Acquisition channels ("Email", "Referral") and touchpoint channels
/// ("Walk-in", "Direct") use the same label type. Labels are trimmed on
/// construction and compare by exact, case-sensitive text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelLabel(String);

impl ChannelLabel {
    /// Creates a new channel label.
    ///
    /// # Errors
    /// Returns `ChannelLabelError::Empty` if the label is empty or whitespace only.
    pub fn new(label: impl Into<String>) -> Result<Self, ChannelLabelError> {
        let label = label.into();
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return Err(ChannelLabelError::Empty);
        }

        if trimmed.len() == label.len() {
            Ok(ChannelLabel(label))
        } else {
            Ok(ChannelLabel(trimmed.to_string()))
        }
    }

    /// Returns the label text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for ChannelLabel {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ChannelLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for ChannelLabel {
    type Error = ChannelLabelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        ChannelLabel::new(value)
    }
}

impl Serialize for ChannelLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ChannelLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ChannelLabelVisitor)
    }
}

/// Accepts strings, and numbers or booleans taken as their text, since
/// labels like `2024` arrive typed from some sources.
struct ChannelLabelVisitor;

impl<'de> de::Visitor<'de> for ChannelLabelVisitor {
    type Value = ChannelLabel;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "a non-empty channel label")
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<ChannelLabel, E> {
        ChannelLabel::new(value).map_err(E::custom)
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<ChannelLabel, E> {
        ChannelLabel::new(value).map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<ChannelLabel, E> {
        self.visit_string(value.to_string())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<ChannelLabel, E> {
        self.visit_string(value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<ChannelLabel, E> {
        self.visit_string(value.to_string())
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<ChannelLabel, E> {
        self.visit_string(value.to_string())
    }
}

/// Errors that can occur when creating a channel label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelLabelError {
    /// The label is empty or contains only whitespace
    Empty,
}

impl fmt::Display for ChannelLabelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLabelError::Empty => write!(f, "Channel label cannot be empty"),
        }
    }
}

impl std::error::Error for ChannelLabelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_creation() {
        let label = ChannelLabel::new("Email").unwrap();
        assert_eq!(label.as_str(), "Email");
        assert_eq!(label.to_string(), "Email");
    }

    #[test]
    fn test_label_is_trimmed() {
        let label = ChannelLabel::new("  Walk-in ").unwrap();
        assert_eq!(label.as_str(), "Walk-in");
        assert_eq!(label, ChannelLabel::new("Walk-in").unwrap());
    }

    #[test]
    fn test_empty_label_rejected() {
        assert_eq!(ChannelLabel::new(""), Err(ChannelLabelError::Empty));
        assert_eq!(ChannelLabel::new("   "), Err(ChannelLabelError::Empty));
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let upper = ChannelLabel::new("Email").unwrap();
        let lower = ChannelLabel::new("email").unwrap();
        assert_ne!(upper, lower);
    }

    #[test]
    fn test_label_serde_roundtrip_rejects_empty() {
        let label: ChannelLabel = serde_json::from_str("\"Social Media\"").unwrap();
        assert_eq!(label.as_str(), "Social Media");
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"Social Media\"");

        let empty: Result<ChannelLabel, _> = serde_json::from_str("\"\"");
        assert!(empty.is_err());
    }

    #[test]
    fn test_typed_values_decode_as_label_text() {
        let year: ChannelLabel = serde_json::from_value(serde_json::json!(2024)).unwrap();
        assert_eq!(year.as_str(), "2024");
        let flag: ChannelLabel = serde_json::from_value(serde_json::json!(true)).unwrap();
        assert_eq!(flag.as_str(), "true");

        let null: Result<ChannelLabel, _> = serde_json::from_value(serde_json::Value::Null);
        assert!(null.is_err());
    }

    #[test]
    fn test_borrow_lookup() {
        let mut counts = std::collections::HashMap::new();
        counts.insert(ChannelLabel::new("Google").unwrap(), 3usize);
        assert_eq!(counts.get("Google"), Some(&3));
    }
}
