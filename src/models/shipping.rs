use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::db::{value::format_time, DbError, Value};

/// Human-readable date used by the listing endpoint (`03/25/22`).
pub const SUMMARY_DATE_FORMAT: &str = "%m/%d/%y";

/// A shipping window as stored. Both bounds are UTC instants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingWindow {
    pub id: String,
    #[serde(serialize_with = "serialize_time")]
    pub start_date: DateTime<Utc>,
    #[serde(serialize_with = "serialize_time")]
    pub end_date: DateTime<Utc>,
    pub message: String,
}

fn serialize_time<S: Serializer>(t: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_time(t))
}

/// Row of GET /shipping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingWindowSummary {
    pub id: String,
    pub start_date: String,
    pub end_date: String,
    pub message: String,
}

/// Body for POST /shipping and PATCH /shipping/{id}/edit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingWindowRequest {
    /// `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub start_date: String,
    pub end_date: String,
    pub message: String,
}

/// Response of POST /shipping.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWindow {
    pub shipping_document: String,
}

impl ShippingWindow {
    /// Read a window out of a `{ref, ts, data}` document.
    pub fn from_document(doc: &Value) -> Result<Self, DbError> {
        let id = doc
            .get("ref")
            .and_then(Value::as_reference)
            .map(|r| r.id.clone())
            .ok_or_else(|| DbError::decode("shipping document has no ref"))?;
        let data = doc
            .get("data")
            .ok_or_else(|| DbError::decode(format!("shipping document {id} has no data")))?;

        let time_field = |name: &str| {
            data.get(name).and_then(Value::as_time).ok_or_else(|| {
                DbError::decode(format!("shipping document {id} has no time value in `{name}`"))
            })
        };

        let message = data
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                DbError::decode(format!("shipping document {id} has no string `message`"))
            })?
            .to_string();

        Ok(Self {
            start_date: time_field("startDate")?,
            end_date: time_field("endDate")?,
            message,
            id,
        })
    }

    pub fn summary(&self) -> ShippingWindowSummary {
        ShippingWindowSummary {
            id: self.id.clone(),
            start_date: self.start_date.format(SUMMARY_DATE_FORMAT).to_string(),
            end_date: self.end_date.format(SUMMARY_DATE_FORMAT).to_string(),
            message: self.message.clone(),
        }
    }
}

/// Normalize a caller-supplied date to the stored representation.
///
/// A bare date means midnight UTC of that day.
pub fn parse_window_date(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| format!("`{raw}` is neither a YYYY-MM-DD date nor an RFC 3339 timestamp"))
}
