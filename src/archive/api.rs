//! Wire types for the record store and its token exchange.
//!
//! The store keys record fields by fixed human-readable names, not
//! programmatic identifiers, and holds dates as epoch milliseconds.

use super::SyncRecord;
use chrono::DateTime;
use serde::{Deserialize, Serialize};

/// Field name the read path sorts on
pub(crate) const DATE_FIELD: &str = "Date";

#[derive(Clone, Debug, Default, Serialize)]
pub(crate) struct TokenExchangeRequest {
    /// Present only when this side holds the credential pair; an empty
    /// object asks the far side to resolve credentials itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct TokenEnvelope {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub tenant_access_token: Option<String>,
    pub expire: Option<i64>,
}

/// Application-level envelope: `code != 0` is a failure even on HTTP 200.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct StoreEnvelope<T> {
    pub code: i64,
    #[serde(default)]
    pub msg: String,
    pub data: Option<T>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct RecordFields {
    #[serde(rename = "Original", default)]
    pub original: String,
    #[serde(rename = "Refined", default)]
    pub refined: String,
    #[serde(rename = "Style", default)]
    pub style: String,
    #[serde(rename = "Date", default)]
    pub date_ms: i64,
}

impl From<&SyncRecord> for RecordFields {
    fn from(record: &SyncRecord) -> Self {
        RecordFields {
            original: record.original.clone(),
            refined: record.refined.clone(),
            style: record.style.clone(),
            date_ms: record.date.timestamp_millis(),
        }
    }
}

impl From<RecordFields> for SyncRecord {
    fn from(fields: RecordFields) -> Self {
        SyncRecord {
            original: fields.original,
            refined: fields.refined,
            style: fields.style,
            date: DateTime::from_timestamp_millis(fields.date_ms)
                .unwrap_or(DateTime::UNIX_EPOCH),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub(crate) struct CreateRecordRequest {
    pub fields: RecordFields,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RecordItem {
    pub fields: RecordFields,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RecordPage {
    #[serde(default)]
    pub items: Vec<RecordItem>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub page_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn fields_serialize_under_human_readable_names_with_ms_date() {
        let record = SyncRecord {
            original: "draft".into(),
            refined: "better draft".into(),
            style: "The Minimalist".into(),
            date: DateTime::from_timestamp_millis(1_700_000_000_000).unwrap(),
        };

        let json = serde_json::to_value(RecordFields::from(&record)).unwrap();
        assert_eq!(json["Original"], "draft");
        assert_eq!(json["Refined"], "better draft");
        assert_eq!(json["Style"], "The Minimalist");
        assert_eq!(json["Date"], 1_700_000_000_000_i64);
    }

    #[test]
    fn fields_round_trip_through_the_wire_shape() {
        let now_ms = Utc::now().timestamp_millis();
        let fields: RecordFields = serde_json::from_value(serde_json::json!({
            "Original": "q",
            "Refined": "a",
            "Style": "The Skeptic",
            "Date": now_ms,
        }))
        .unwrap();

        let record = SyncRecord::from(fields);
        assert_eq!(record.date.timestamp_millis(), now_ms);
    }

    #[test]
    fn empty_exchange_body_is_an_empty_object() {
        let body = serde_json::to_string(&TokenExchangeRequest::default()).unwrap();
        assert_eq!(body, "{}");
    }

    #[test]
    fn envelope_failure_is_detectable_on_http_200() {
        let envelope: StoreEnvelope<RecordPage> = serde_json::from_str(
            r#"{"code": 1254045, "msg": "table not found"}"#,
        )
        .unwrap();
        assert_ne!(envelope.code, 0);
        assert!(envelope.data.is_none());
    }
}
