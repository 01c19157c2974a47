use serde_json::Value as Json;

/// Coarse classification of a database failure. Each kind maps to exactly
/// one HTTP status in [`crate::error::ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    NotFound,
    Validation,
    PermissionDenied,
    Transient,
    Unknown,
}

/// Error reported by (or while talking to) the document database.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {description}")]
pub struct DbError {
    pub kind: DbErrorKind,
    pub code: String,
    pub description: String,
    /// The database's own diagnostics, passed through to callers verbatim.
    pub errors: Vec<Json>,
}

impl DbError {
    pub fn new(kind: DbErrorKind, code: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            description: description.into(),
            errors: Vec::new(),
        }
    }

    pub fn not_found(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::NotFound, "instance not found", description)
    }

    pub fn invalid_argument(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Validation, "invalid argument", description)
    }

    pub fn invalid_ref(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Validation, "invalid ref", description)
    }

    pub fn already_exists(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Validation, "instance already exists", description)
    }

    pub fn transient(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Transient, "unavailable", description)
    }

    /// The response could not be turned into a [`super::Value`].
    pub fn decode(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Unknown, "invalid response", description)
    }

    pub fn unknown(description: impl Into<String>) -> Self {
        Self::new(DbErrorKind::Unknown, "internal error", description)
    }

    /// Build an error from a non-2xx Fauna response.
    ///
    /// Fauna answers with `{"errors": [{"code", "description", "position"}]}`;
    /// the first entry decides the kind, the HTTP status is the fallback.
    pub fn from_response(status: u16, body: &Json) -> Self {
        let errors: Vec<Json> = body
            .get("errors")
            .and_then(Json::as_array)
            .cloned()
            .unwrap_or_default();

        let first = errors.first();
        let code = first
            .and_then(|e| e.get("code"))
            .and_then(Json::as_str)
            .unwrap_or("unknown error")
            .to_string();
        let description = first
            .and_then(|e| e.get("description"))
            .and_then(Json::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("database responded with HTTP {status}"));

        Self {
            kind: classify(Some(status), &code),
            code,
            description,
            errors,
        }
    }
}

/// Classify an error by its Fauna error code, falling back to the HTTP status.
pub fn classify(status: Option<u16>, code: &str) -> DbErrorKind {
    match code {
        "instance not found" | "value not found" | "not found" => DbErrorKind::NotFound,
        "invalid argument" | "invalid ref" | "invalid expression" | "invalid type"
        | "validation failed" | "instance already exists" | "instance not unique"
        | "bad request" => DbErrorKind::Validation,
        "unauthorized" | "permission denied" | "forbidden" => DbErrorKind::PermissionDenied,
        "contended transaction" | "too many requests" | "unavailable" | "time out" => {
            DbErrorKind::Transient
        }
        _ => match status {
            Some(404) => DbErrorKind::NotFound,
            Some(400) | Some(422) => DbErrorKind::Validation,
            Some(401) | Some(403) => DbErrorKind::PermissionDenied,
            Some(409) | Some(429) | Some(502) | Some(503) | Some(504) => DbErrorKind::Transient,
            _ => DbErrorKind::Unknown,
        },
    }
}

impl From<reqwest::Error> for DbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            DbError::transient(err.to_string())
        } else if err.is_decode() {
            DbError::decode(err.to_string())
        } else {
            match err.status() {
                Some(status) => {
                    let mut e = DbError::unknown(err.to_string());
                    e.kind = classify(Some(status.as_u16()), "");
                    e
                }
                None => DbError::unknown(err.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_response() {
        let body = json!({
            "errors": [{ "position": [], "code": "instance not found", "description": "Document not found." }]
        });
        let err = DbError::from_response(404, &body);

        assert_eq!(err.kind, DbErrorKind::NotFound);
        assert_eq!(err.code, "instance not found");
        assert_eq!(err.description, "Document not found.");
        assert_eq!(err.errors.len(), 1);
    }

    #[test]
    fn code_wins_over_status() {
        let body = json!({ "errors": [{ "code": "invalid ref", "description": "Ref refers to undefined collection" }] });
        assert_eq!(DbError::from_response(404, &body).kind, DbErrorKind::Validation);
    }

    #[test]
    fn status_fallback_for_unknown_codes() {
        assert_eq!(classify(Some(401), "something new"), DbErrorKind::PermissionDenied);
        assert_eq!(classify(Some(503), ""), DbErrorKind::Transient);
        assert_eq!(classify(Some(418), ""), DbErrorKind::Unknown);
        assert_eq!(classify(None, "contended transaction"), DbErrorKind::Transient);
    }

    #[test]
    fn body_without_errors_array() {
        let err = DbError::from_response(502, &Json::Null);
        assert_eq!(err.kind, DbErrorKind::Transient);
        assert!(err.errors.is_empty());
        assert_eq!(err.description, "database responded with HTTP 502");
    }
}
