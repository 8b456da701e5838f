//! Address Mapping Types
//!
//! The wallet service owns the deposit-address mappings. The sweeper only
//! holds a read-only snapshot for the duration of one cycle.
//!
//! Wire payloads are loosely typed (missing fields, numbers as strings,
//! `null` everywhere). They are normalized here, once, so the sweep logic
//! works with fully-typed [`AddressRecord`]s.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a mapping record, used only for deletion
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accepts numeric or non-empty string ids
    fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self(s.trim().to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Mapping record as returned by `GET /addresses`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressRecordWire {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub is_disabled: Option<bool>,
    #[serde(default)]
    pub deletion_date: Option<String>,
}

/// Why a wire record was not turned into an [`AddressRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Not a JSON object of the expected shape
    Malformed,
    /// No address, or an empty one
    MissingAddress,
    /// `user_id` absent or not a positive integer
    InvalidUserId,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::Malformed => "malformed",
            SkipReason::MissingAddress => "missing_address",
            SkipReason::InvalidUserId => "invalid_user_id",
        }
    }
}

/// A deposit address owned by one user
#[derive(Debug, Clone, PartialEq)]
pub struct AddressRecord {
    /// Deposit address
    pub address: String,
    /// Owning user, always positive
    pub user_id: u64,
    /// Mapping record id, needed to delete the record
    pub id: Option<RecordId>,
    /// No longer accepting new deposits
    pub is_disabled: bool,
    /// Raw retention cutoff; parsed with [`parse_timestamp`] when needed
    pub deletion_date: Option<String>,
}

impl AddressRecord {
    /// Active record with the given address and user
    pub fn new(address: impl Into<String>, user_id: u64) -> Self {
        Self {
            address: address.into(),
            user_id,
            id: None,
            is_disabled: false,
            deletion_date: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Mark disabled with a retention cutoff
    pub fn disabled_until(mut self, deletion_date: impl Into<String>) -> Self {
        self.is_disabled = true;
        self.deletion_date = Some(deletion_date.into());
        self
    }

    /// Normalize a wire record
    pub fn from_wire(wire: AddressRecordWire) -> Result<Self, SkipReason> {
        let address = wire
            .address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .ok_or(SkipReason::MissingAddress)?;

        let user_id = wire
            .user_id
            .as_ref()
            .and_then(parse_user_id)
            .ok_or(SkipReason::InvalidUserId)?;

        Ok(Self {
            address,
            user_id,
            id: wire.id.as_ref().and_then(RecordId::from_value),
            is_disabled: wire.is_disabled.unwrap_or(false),
            deletion_date: wire
                .deletion_date
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }

    /// Normalize an untyped inventory entry
    pub fn from_value(value: serde_json::Value) -> Result<Self, SkipReason> {
        let wire: AddressRecordWire =
            serde_json::from_value(value).map_err(|_| SkipReason::Malformed)?;
        Self::from_wire(wire)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Positive integer from a number or numeric string
fn parse_user_id(value: &serde_json::Value) -> Option<u64> {
    let id = match value {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f > 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }?;

    (id > 0).then_some(id)
}

/// Parse a timestamp as a UTC instant
///
/// Accepts RFC 3339 (`Z` or numeric offset) plus naive ISO-8601 date-times
/// and bare dates, which are taken as UTC. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    // Lowercase `z` and a space separator show up in hand-edited records
    let normalized = raw.replace(' ', "T");
    let normalized = normalized
        .strip_suffix('z')
        .or_else(|| normalized.strip_suffix('Z'))
        .unwrap_or(&normalized);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&format!("{}Z", normalized)) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(normalized, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(normalized, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(normalized, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_from_value_full_record() {
        let record = AddressRecord::from_value(json!({
            "address": "84A1",
            "user_id": 7,
            "id": 11,
            "is_disabled": true,
            "deletion_date": "2000-01-01T00:00:00Z",
            "label": "ignored"
        }))
        .unwrap();

        assert_eq!(record.address, "84A1");
        assert_eq!(record.user_id, 7);
        assert_eq!(record.id, Some(RecordId::new("11")));
        assert!(record.is_disabled);
        assert_eq!(record.deletion_date.as_deref(), Some("2000-01-01T00:00:00Z"));
    }

    #[test]
    fn test_optional_fields_default() {
        let record = AddressRecord::from_value(json!({
            "address": "84A1",
            "user_id": "12",
            "is_disabled": null,
            "deletion_date": null
        }))
        .unwrap();

        assert_eq!(record.user_id, 12);
        assert_eq!(record.id, None);
        assert!(!record.is_disabled);
        assert_eq!(record.deletion_date, None);
    }

    #[test]
    fn test_skip_reasons() {
        assert_eq!(
            AddressRecord::from_value(json!({"user_id": 1})),
            Err(SkipReason::MissingAddress)
        );
        assert_eq!(
            AddressRecord::from_value(json!({"address": "", "user_id": 1})),
            Err(SkipReason::MissingAddress)
        );
        assert_eq!(
            AddressRecord::from_value(json!({"address": "A", "user_id": 0})),
            Err(SkipReason::InvalidUserId)
        );
        assert_eq!(
            AddressRecord::from_value(json!({"address": "A", "user_id": -4})),
            Err(SkipReason::InvalidUserId)
        );
        assert_eq!(
            AddressRecord::from_value(json!({"address": "A", "user_id": "abc"})),
            Err(SkipReason::InvalidUserId)
        );
        assert_eq!(
            AddressRecord::from_value(json!({"address": "A"})),
            Err(SkipReason::InvalidUserId)
        );
        assert_eq!(
            AddressRecord::from_value(json!("not an object")),
            Err(SkipReason::Malformed)
        );
    }

    #[test]
    fn test_string_record_id() {
        let record =
            AddressRecord::from_value(json!({"address": "A", "user_id": 3.0, "id": "map-9"}))
                .unwrap();
        assert_eq!(record.user_id, 3);
        assert_eq!(record.id.unwrap().as_str(), "map-9");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2024-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00z"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T14:30:00+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00.000000"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2000-01-01"),
            Some(Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("next tuesday"), None);
        assert_eq!(parse_timestamp("2024-13-45T00:00:00Z"), None);
    }
}
