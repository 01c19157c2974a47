//! Database objects the service relies on.
//!
//! The same definitions are sent to Fauna by the `provision-schema` binary
//! and evaluated by [`super::memory::MemoryStore::provisioned`].

use super::query::Expr;

pub const SHIPPING_COLLECTION: &str = "Shipping";

/// Every shipping document, as refs.
pub const ALL_SHIPPING_INDEX: &str = "All_shipping";

/// Entries of `[data.startDate, data.endDate, ref]`.
pub const SHIPPING_PERIODS_INDEX: &str = "Shipping_periods";

/// Stored function taking the caller's "now" and returning the page of
/// shipping documents whose window contains it.
pub const CURRENT_WINDOWS_FUNCTION: &str = "current_shipping_windows";

/// Largest page Fauna will return.
pub const MAX_PAGE_SIZE: u32 = 100_000;

/// Body of [`CURRENT_WINDOWS_FUNCTION`]. Both bounds are inclusive.
pub fn current_windows_body() -> Expr {
    let now = || Expr::var("now");
    let contains_now = Expr::lambda(
        &["startDate", "endDate", "ref"],
        Expr::And(vec![
            Expr::Lte(vec![Expr::var("startDate"), now()]),
            Expr::Gte(vec![Expr::var("endDate"), now()]),
        ]),
    );

    Expr::lambda(
        &["now"],
        Expr::map(
            Expr::paginate(
                Expr::filter(
                    Expr::match_index(Expr::index(SHIPPING_PERIODS_INDEX)),
                    contains_now,
                ),
                Some(MAX_PAGE_SIZE),
            ),
            Expr::lambda(
                &["startDate", "endDate", "ref"],
                Expr::get(Expr::var("ref")),
            ),
        ),
    )
}

/// Creation queries in dependency order, labelled for logging.
pub fn definitions() -> Vec<(&'static str, Expr)> {
    let field = |path: &[&str]| path.iter().map(|p| p.to_string()).collect::<Vec<_>>();

    vec![
        (
            SHIPPING_COLLECTION,
            Expr::CreateCollection {
                name: SHIPPING_COLLECTION.to_string(),
            },
        ),
        (
            ALL_SHIPPING_INDEX,
            Expr::CreateIndex {
                name: ALL_SHIPPING_INDEX.to_string(),
                source: Box::new(Expr::collection(SHIPPING_COLLECTION)),
                values: Vec::new(),
            },
        ),
        (
            SHIPPING_PERIODS_INDEX,
            Expr::CreateIndex {
                name: SHIPPING_PERIODS_INDEX.to_string(),
                source: Box::new(Expr::collection(SHIPPING_COLLECTION)),
                values: vec![
                    field(&["data", "startDate"]),
                    field(&["data", "endDate"]),
                    field(&["ref"]),
                ],
            },
        ),
        (
            CURRENT_WINDOWS_FUNCTION,
            Expr::CreateFunction {
                name: CURRENT_WINDOWS_FUNCTION.to_string(),
                body: Box::new(current_windows_body()),
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn definitions_are_ordered_by_dependency() {
        let names: Vec<_> = definitions().into_iter().map(|(name, _)| name).collect();
        assert_eq!(
            names,
            vec![
                SHIPPING_COLLECTION,
                ALL_SHIPPING_INDEX,
                SHIPPING_PERIODS_INDEX,
                CURRENT_WINDOWS_FUNCTION
            ]
        );
    }

    #[test]
    fn function_body_compares_inclusively() {
        let wire = current_windows_body().to_wire();
        let filter = &wire["expr"]["collection"]["paginate"]["filter"];

        assert_eq!(filter["lambda"], json!(["startDate", "endDate", "ref"]));
        assert_eq!(
            filter["expr"],
            json!({ "and": [
                { "lte": [{ "var": "startDate" }, { "var": "now" }] },
                { "gte": [{ "var": "endDate" }, { "var": "now" }] }
            ]})
        );
    }
}
