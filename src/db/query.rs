//! Query expressions.
//!
//! An [`Expr`] is a tree of FQL v4 calls. It is built with the constructors
//! below, sent to a [`super::DocumentStore`], and encoded for the wire by
//! [`Expr::to_wire`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value as Json};

use super::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Array(Vec<Expr>),
    Object(BTreeMap<String, Expr>),
    Collection(String),
    Index(String),
    Function(String),
    Ref {
        collection: Box<Expr>,
        id: String,
    },
    Var(String),
    Lambda {
        params: Vec<String>,
        body: Box<Expr>,
    },
    Get(Box<Expr>),
    Create {
        collection: Box<Expr>,
        params: Box<Expr>,
    },
    Update {
        reference: Box<Expr>,
        params: Box<Expr>,
    },
    Delete(Box<Expr>),
    Match(Box<Expr>),
    Paginate {
        set: Box<Expr>,
        size: Option<u32>,
        /// Cursor taken from the `after` field of the previous page.
        after: Option<Box<Expr>>,
    },
    Map {
        collection: Box<Expr>,
        lambda: Box<Expr>,
    },
    Filter {
        collection: Box<Expr>,
        lambda: Box<Expr>,
    },
    And(Vec<Expr>),
    Lte(Vec<Expr>),
    Gte(Vec<Expr>),
    Call {
        function: Box<Expr>,
        args: Vec<Expr>,
    },
    CreateCollection {
        name: String,
    },
    CreateIndex {
        name: String,
        source: Box<Expr>,
        /// Field paths emitted per index entry, e.g. `["data", "startDate"]`.
        values: Vec<Vec<String>>,
    },
    CreateFunction {
        name: String,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn time(at: DateTime<Utc>) -> Self {
        Expr::Literal(Value::Time(at))
    }

    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Expr)>) -> Self {
        Expr::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn collection(name: &str) -> Self {
        Expr::Collection(name.to_string())
    }

    pub fn index(name: &str) -> Self {
        Expr::Index(name.to_string())
    }

    pub fn function(name: &str) -> Self {
        Expr::Function(name.to_string())
    }

    /// `Ref(Collection(collection), id)`
    pub fn document(collection: &str, id: &str) -> Self {
        Expr::Ref {
            collection: Box::new(Expr::collection(collection)),
            id: id.to_string(),
        }
    }

    pub fn var(name: &str) -> Self {
        Expr::Var(name.to_string())
    }

    pub fn lambda(params: &[&str], body: Expr) -> Self {
        Expr::Lambda {
            params: params.iter().map(|p| p.to_string()).collect(),
            body: Box::new(body),
        }
    }

    pub fn get(reference: Expr) -> Self {
        Expr::Get(Box::new(reference))
    }

    pub fn create(collection: Expr, params: Expr) -> Self {
        Expr::Create {
            collection: Box::new(collection),
            params: Box::new(params),
        }
    }

    pub fn update(reference: Expr, params: Expr) -> Self {
        Expr::Update {
            reference: Box::new(reference),
            params: Box::new(params),
        }
    }

    pub fn delete(reference: Expr) -> Self {
        Expr::Delete(Box::new(reference))
    }

    pub fn match_index(index: Expr) -> Self {
        Expr::Match(Box::new(index))
    }

    pub fn paginate(set: Expr, size: Option<u32>) -> Self {
        Expr::Paginate {
            set: Box::new(set),
            size,
            after: None,
        }
    }

    /// Next page of `set`, starting at a cursor Fauna handed back.
    pub fn paginate_after(set: Expr, size: Option<u32>, after: Value) -> Self {
        Expr::Paginate {
            set: Box::new(set),
            size,
            after: Some(Box::new(Expr::Literal(after))),
        }
    }

    pub fn map(collection: Expr, lambda: Expr) -> Self {
        Expr::Map {
            collection: Box::new(collection),
            lambda: Box::new(lambda),
        }
    }

    pub fn filter(collection: Expr, lambda: Expr) -> Self {
        Expr::Filter {
            collection: Box::new(collection),
            lambda: Box::new(lambda),
        }
    }

    pub fn call(function: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            function: Box::new(function),
            args,
        }
    }

    /// Encode as the JSON body Fauna's HTTP endpoint accepts.
    pub fn to_wire(&self) -> Json {
        match self {
            Expr::Literal(v) => v.to_wire(),
            Expr::Array(items) => Json::Array(items.iter().map(Expr::to_wire).collect()),
            Expr::Object(fields) => json!({ "object": wire_fields(fields) }),
            Expr::Collection(name) => json!({ "collection": name }),
            Expr::Index(name) => json!({ "index": name }),
            Expr::Function(name) => json!({ "function": name }),
            Expr::Ref { collection, id } => json!({ "ref": collection.to_wire(), "id": id }),
            Expr::Var(name) => json!({ "var": name }),
            Expr::Lambda { params, body } => {
                let params = match params.as_slice() {
                    [single] => json!(single),
                    many => json!(many),
                };
                json!({ "lambda": params, "expr": body.to_wire() })
            }
            Expr::Get(r) => json!({ "get": r.to_wire() }),
            Expr::Create { collection, params } => {
                json!({ "create": collection.to_wire(), "params": params.to_wire() })
            }
            Expr::Update { reference, params } => {
                json!({ "update": reference.to_wire(), "params": params.to_wire() })
            }
            Expr::Delete(r) => json!({ "delete": r.to_wire() }),
            Expr::Match(index) => json!({ "match": index.to_wire() }),
            Expr::Paginate { set, size, after } => {
                let mut wire = Map::new();
                wire.insert("paginate".into(), set.to_wire());
                if let Some(size) = size {
                    wire.insert("size".into(), json!(size));
                }
                if let Some(after) = after {
                    wire.insert("after".into(), after.to_wire());
                }
                Json::Object(wire)
            }
            Expr::Map { collection, lambda } => {
                json!({ "map": lambda.to_wire(), "collection": collection.to_wire() })
            }
            Expr::Filter { collection, lambda } => {
                json!({ "filter": lambda.to_wire(), "collection": collection.to_wire() })
            }
            Expr::And(items) => json!({ "and": wire_list(items) }),
            Expr::Lte(items) => json!({ "lte": wire_list(items) }),
            Expr::Gte(items) => json!({ "gte": wire_list(items) }),
            Expr::Call { function, args } => {
                // A single argument goes bare, several go as an array.
                let arguments = match args.as_slice() {
                    [single] => single.to_wire(),
                    many => wire_list(many),
                };
                json!({ "call": function.to_wire(), "arguments": arguments })
            }
            Expr::CreateCollection { name } => {
                json!({ "create_collection": { "object": { "name": name } } })
            }
            Expr::CreateIndex {
                name,
                source,
                values,
            } => {
                let values: Vec<Json> = values
                    .iter()
                    .map(|field| json!({ "object": { "field": field } }))
                    .collect();
                let mut params = Map::new();
                params.insert("name".into(), json!(name));
                params.insert("source".into(), source.to_wire());
                if !values.is_empty() {
                    params.insert("values".into(), Json::Array(values));
                }
                json!({ "create_index": { "object": params } })
            }
            Expr::CreateFunction { name, body } => json!({
                "create_function": { "object": {
                    "name": name,
                    "body": { "query": body.to_wire() }
                }}
            }),
        }
    }
}

fn wire_list(items: &[Expr]) -> Json {
    Json::Array(items.iter().map(Expr::to_wire).collect())
}

fn wire_fields(fields: &BTreeMap<String, Expr>) -> Map<String, Json> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), v.to_wire()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn document_ref() {
        assert_eq!(
            Expr::document("Shipping", "42").to_wire(),
            json!({ "ref": { "collection": "Shipping" }, "id": "42" })
        );
    }

    #[test]
    fn map_over_paginated_index() {
        let expr = Expr::map(
            Expr::paginate(Expr::match_index(Expr::index("All_shipping")), Some(10)),
            Expr::lambda(&["ref"], Expr::get(Expr::var("ref"))),
        );
        assert_eq!(
            expr.to_wire(),
            json!({
                "map": { "lambda": "ref", "expr": { "get": { "var": "ref" } } },
                "collection": { "paginate": { "match": { "index": "All_shipping" } }, "size": 10 }
            })
        );
    }

    #[test]
    fn paginate_carries_the_cursor() {
        let cursor = Value::Array(vec![Value::Ref(crate::db::Ref::new("Shipping", "7"))]);
        let expr =
            Expr::paginate_after(Expr::match_index(Expr::index("All_shipping")), Some(2), cursor);
        assert_eq!(
            expr.to_wire(),
            json!({
                "paginate": { "match": { "index": "All_shipping" } },
                "size": 2,
                "after": [{ "ref": { "collection": "Shipping" }, "id": "7" }]
            })
        );
    }

    #[test]
    fn multi_param_lambda_uses_array() {
        let expr = Expr::lambda(&["a", "b"], Expr::And(vec![Expr::var("a"), Expr::var("b")]));
        assert_eq!(
            expr.to_wire(),
            json!({ "lambda": ["a", "b"], "expr": { "and": [{ "var": "a" }, { "var": "b" }] } })
        );
    }

    #[test]
    fn create_wraps_params_in_object() {
        let expr = Expr::create(
            Expr::collection("Shipping"),
            Expr::object([(
                "data",
                Expr::object([("message", Expr::literal("hi"))]),
            )]),
        );
        assert_eq!(
            expr.to_wire(),
            json!({
                "create": { "collection": "Shipping" },
                "params": { "object": { "data": { "object": { "message": "hi" } } } }
            })
        );
    }

    #[test]
    fn single_call_argument_is_bare() {
        let at = Utc.with_ymd_and_hms(2022, 3, 26, 0, 0, 0).unwrap();
        let expr = Expr::call(Expr::function("current"), vec![Expr::time(at)]);
        assert_eq!(
            expr.to_wire(),
            json!({
                "call": { "function": "current" },
                "arguments": { "@ts": "2022-03-26T00:00:00.000Z" }
            })
        );
    }

    #[test]
    fn index_definition_lists_field_paths() {
        let expr = Expr::CreateIndex {
            name: "periods".into(),
            source: Box::new(Expr::collection("Shipping")),
            values: vec![vec!["data".into(), "startDate".into()], vec!["ref".into()]],
        };
        assert_eq!(
            expr.to_wire(),
            json!({ "create_index": { "object": {
                "name": "periods",
                "source": { "collection": "Shipping" },
                "values": [
                    { "object": { "field": ["data", "startDate"] } },
                    { "object": { "field": ["ref"] } }
                ]
            }}})
        );
    }
}
