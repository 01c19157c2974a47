use chrono::{DateTime, Utc};

use crate::{
    db::{
        schema::{ALL_SHIPPING_INDEX, CURRENT_WINDOWS_FUNCTION, SHIPPING_COLLECTION},
        DbError, DocumentStore, Expr, Value,
    },
    error::ApiError,
    models::shipping::{
        parse_window_date, ShippingWindow, ShippingWindowRequest, ShippingWindowSummary,
    },
    services::metrics,
};

pub struct ShippingService;

impl ShippingService {
    /// Every window, dates rendered as `%m/%d/%y`.
    ///
    /// Follows the `after` cursor until the index is exhausted.
    pub async fn list(
        store: &dyn DocumentStore,
        page_size: u32,
    ) -> Result<Vec<ShippingWindowSummary>, ApiError> {
        let mut windows = Vec::new();
        let mut cursor = None;
        loop {
            let query = list_query(page_size, cursor.take());
            let page = metrics::observe("list", store.query(&query)).await?;
            for doc in page_documents(&page)? {
                windows.push(ShippingWindow::from_document(doc)?.summary());
            }
            match page.get("after") {
                Some(after) => cursor = Some(after.clone()),
                None => return Ok(windows),
            }
        }
    }

    /// Windows whose interval contains `now`, bounds included.
    pub async fn current(
        store: &dyn DocumentStore,
        now: DateTime<Utc>,
    ) -> Result<Vec<ShippingWindow>, ApiError> {
        let page = metrics::observe("current", store.query(&current_query(now))).await?;
        page_documents(&page)?
            .iter()
            .map(|doc| ShippingWindow::from_document(doc).map_err(ApiError::from))
            .collect()
    }

    /// Store a new window and return its id.
    pub async fn create(
        store: &dyn DocumentStore,
        req: &ShippingWindowRequest,
    ) -> Result<String, ApiError> {
        let query = create_query(req)?;
        let doc = metrics::observe("create", store.query(&query)).await?;
        let window = ShippingWindow::from_document(&doc)?;
        tracing::info!("Created shipping window {}", window.id);
        Ok(window.id)
    }

    /// Replace all three fields of the window. Returns the updated document.
    pub async fn update(
        store: &dyn DocumentStore,
        id: &str,
        req: &ShippingWindowRequest,
    ) -> Result<Value, ApiError> {
        let query = update_query(id, req)?;
        let doc = metrics::observe("update", store.query(&query)).await?;
        tracing::info!("Updated shipping window {}", id);
        Ok(doc)
    }

    /// Remove the window for good. Returns the deleted document.
    pub async fn delete(store: &dyn DocumentStore, id: &str) -> Result<Value, ApiError> {
        let query = delete_query(id)?;
        let doc = metrics::observe("delete", store.query(&query)).await?;
        tracing::info!("Deleted shipping window {}", id);
        Ok(doc)
    }
}

/// `Map(Paginate(Match(Index(All_shipping)), after), Lambda(ref, Get(ref)))`
pub fn list_query(page_size: u32, after: Option<Value>) -> Expr {
    let set = Expr::match_index(Expr::index(ALL_SHIPPING_INDEX));
    let page = match after {
        Some(cursor) => Expr::paginate_after(set, Some(page_size), cursor),
        None => Expr::paginate(set, Some(page_size)),
    };
    Expr::map(page, Expr::lambda(&["ref"], Expr::get(Expr::var("ref"))))
}

pub fn current_query(now: DateTime<Utc>) -> Expr {
    Expr::call(Expr::function(CURRENT_WINDOWS_FUNCTION), vec![Expr::time(now)])
}

pub fn create_query(req: &ShippingWindowRequest) -> Result<Expr, ApiError> {
    Ok(Expr::create(
        Expr::collection(SHIPPING_COLLECTION),
        window_params(req)?,
    ))
}

pub fn update_query(id: &str, req: &ShippingWindowRequest) -> Result<Expr, ApiError> {
    let reference = document_ref(id)?;
    Ok(Expr::update(reference, window_params(req)?))
}

pub fn delete_query(id: &str) -> Result<Expr, ApiError> {
    Ok(Expr::delete(document_ref(id)?))
}

/// Document ids are positive 64-bit integers in decimal.
fn document_ref(id: &str) -> Result<Expr, ApiError> {
    let well_formed = !id.is_empty()
        && id.bytes().all(|b| b.is_ascii_digit())
        && id.parse::<u64>().is_ok();
    if !well_formed {
        return Err(ApiError::BadRequest(format!(
            "`{id}` is not a valid shipping document id"
        )));
    }
    Ok(Expr::document(SHIPPING_COLLECTION, id))
}

fn window_params(req: &ShippingWindowRequest) -> Result<Expr, ApiError> {
    let start = parse_window_date(&req.start_date)
        .map_err(|e| ApiError::BadRequest(format!("startDate: {e}")))?;
    let end = parse_window_date(&req.end_date)
        .map_err(|e| ApiError::BadRequest(format!("endDate: {e}")))?;

    Ok(Expr::object([(
        "data",
        Expr::object([
            ("startDate", Expr::time(start)),
            ("endDate", Expr::time(end)),
            ("message", Expr::literal(req.message.clone())),
        ]),
    )]))
}

fn page_documents(page: &Value) -> Result<&[Value], ApiError> {
    page.get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            DbError::decode(format!(
                "expected a page of documents, got {}",
                page.type_name()
            ))
            .into()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(start: &str, end: &str) -> ShippingWindowRequest {
        ShippingWindowRequest {
            start_date: start.into(),
            end_date: end.into(),
            message: "TODAYS DATE TOMORROW EXPIRE".into(),
        }
    }

    #[test]
    fn create_normalizes_dates() {
        let wire = create_query(&request("2022-03-25", "2022-03-26")).unwrap().to_wire();
        assert_eq!(
            wire["params"]["object"]["data"]["object"],
            json!({
                "startDate": { "@ts": "2022-03-25T00:00:00.000Z" },
                "endDate": { "@ts": "2022-03-26T00:00:00.000Z" },
                "message": "TODAYS DATE TOMORROW EXPIRE"
            })
        );
    }

    #[test]
    fn update_addresses_the_document() {
        let wire = update_query("327123234559361616", &request("2022-03-25", "2022-03-26"))
            .unwrap()
            .to_wire();
        assert_eq!(
            wire["update"],
            json!({ "ref": { "collection": "Shipping" }, "id": "327123234559361616" })
        );
    }

    #[test]
    fn ill_formed_ids_are_rejected_before_querying() {
        for id in ["", "abc", "-1", "12a", "99999999999999999999999"] {
            assert!(
                matches!(delete_query(id), Err(ApiError::BadRequest(_))),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn unparseable_dates_are_bad_requests() {
        let err = update_query("1", &request("4", "5")).unwrap_err();
        assert!(err.to_string().starts_with("startDate:"));
    }

    #[test]
    fn later_list_pages_start_at_the_cursor() {
        let cursor = Value::Array(vec![Value::Ref(crate::db::Ref::new("Shipping", "42"))]);
        let wire = list_query(5, Some(cursor)).to_wire();
        assert_eq!(wire["collection"]["size"], json!(5));
        assert_eq!(
            wire["collection"]["after"],
            json!([{ "ref": { "collection": "Shipping" }, "id": "42" }])
        );
        assert!(list_query(5, None).to_wire()["collection"].get("after").is_none());
    }

    #[test]
    fn current_calls_the_stored_function() {
        let now = DateTime::parse_from_rfc3339("2022-03-26T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            current_query(now).to_wire(),
            json!({
                "call": { "function": CURRENT_WINDOWS_FUNCTION },
                "arguments": { "@ts": "2022-03-26T00:00:00.000Z" }
            })
        );
    }
}
