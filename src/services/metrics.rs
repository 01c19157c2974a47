use std::future::Future;

use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

use crate::db::{DbError, DbErrorKind};

lazy_static! {
    pub static ref DB_QUERIES_COUNTER: CounterVec = register_counter_vec!(
        "shipping_db_queries_total",
        "Database queries issued by operation and outcome",
        &["operation", "outcome"]
    ).unwrap();
}

/// Await one store query and count it under `operation`.
pub async fn observe<T>(
    operation: &str,
    query: impl Future<Output = Result<T, DbError>>,
) -> Result<T, DbError> {
    let result = query.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => outcome_label(e.kind),
    };
    DB_QUERIES_COUNTER
        .with_label_values(&[operation, outcome])
        .inc();
    result
}

fn outcome_label(kind: DbErrorKind) -> &'static str {
    match kind {
        DbErrorKind::NotFound => "not_found",
        DbErrorKind::Validation => "validation",
        DbErrorKind::PermissionDenied => "permission_denied",
        DbErrorKind::Transient => "transient",
        DbErrorKind::Unknown => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn counts_failures_by_kind() {
        let before = DB_QUERIES_COUNTER
            .with_label_values(&["metrics_test", "not_found"])
            .get();

        let result: Result<(), _> =
            observe("metrics_test", async { Err(DbError::not_found("gone")) }).await;
        assert!(result.is_err());

        let after = DB_QUERIES_COUNTER
            .with_label_values(&["metrics_test", "not_found"])
            .get();
        assert_eq!(after - before, 1.0);
    }
}
