//! In-process document store.
//!
//! Evaluates the subset of [`Expr`] this service issues against plain maps,
//! with the same result shapes and error codes Fauna produces, including the
//! `before`/`after` cursors of truncated pages. Each query runs against a
//! scratch copy of the database that replaces the live one only if the whole
//! query succeeds. Collections sit behind `Arc`s, so the copy only duplicates
//! the collections a query writes to.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use super::error::DbError;
use super::query::Expr;
use super::schema;
use super::value::{Ref, Value};
use super::DocumentStore;

const FIRST_DOCUMENT_ID: u64 = 300_000_000_000_000_000;
const DEFAULT_PAGE_SIZE: u32 = 64;

type Scope = Vec<(String, Value)>;

#[derive(Debug, Clone)]
struct Document {
    data: BTreeMap<String, Value>,
    ts: i64,
}

#[derive(Debug, Clone)]
struct IndexDefinition {
    source: String,
    values: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
struct Database {
    collections: BTreeMap<String, Arc<BTreeMap<String, Document>>>,
    indexes: BTreeMap<String, IndexDefinition>,
    functions: BTreeMap<String, Expr>,
    next_id: u64,
    last_ts: i64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            collections: BTreeMap::new(),
            indexes: BTreeMap::new(),
            functions: BTreeMap::new(),
            next_id: FIRST_DOCUMENT_ID,
            last_ts: 0,
        }
    }
}

pub struct MemoryStore {
    db: Mutex<Database>,
}

impl MemoryStore {
    /// An empty database: no collections, indexes or functions.
    pub fn new() -> Self {
        Self {
            db: Mutex::new(Database::default()),
        }
    }

    /// A database with every object from [`schema::definitions`] created.
    pub fn provisioned() -> Result<Self, DbError> {
        let store = Self::new();
        for (_, definition) in schema::definitions() {
            store.execute(&definition)?;
        }
        Ok(store)
    }

    pub fn execute(&self, expr: &Expr) -> Result<Value, DbError> {
        let mut live = self
            .db
            .lock()
            .map_err(|_| DbError::unknown("memory store lock poisoned"))?;
        let mut scratch = live.clone();
        let value = scratch.eval(expr, &Scope::new())?;
        *live = scratch;
        Ok(value)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn query(&self, expr: &Expr) -> Result<Value, DbError> {
        self.execute(expr)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

impl Database {
    fn eval(&mut self, expr: &Expr, scope: &Scope) -> Result<Value, DbError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Array(items) => items
                .iter()
                .map(|e| self.eval(e, scope))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Expr::Object(fields) => fields
                .iter()
                .map(|(k, e)| self.eval(e, scope).map(|v| (k.clone(), v)))
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(Value::Object),
            Expr::Collection(name) => Ok(Value::Ref(Ref::new("collections", name.clone()))),
            Expr::Index(name) => Ok(Value::Ref(Ref::new("indexes", name.clone()))),
            Expr::Function(name) => Ok(Value::Ref(Ref::new("functions", name.clone()))),
            Expr::Ref { collection, id } => {
                let collection = self.eval_schema_ref(collection, scope, "collections")?;
                Ok(Value::Ref(Ref::new(collection, id.clone())))
            }
            Expr::Var(name) => scope
                .iter()
                .rev()
                .find(|(bound, _)| bound == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| {
                    DbError::new(
                        super::DbErrorKind::Validation,
                        "invalid expression",
                        format!("Variable '{name}' is not defined."),
                    )
                }),
            Expr::Lambda { .. } => Err(DbError::invalid_argument(
                "Lambda must be applied, not returned.",
            )),
            Expr::Get(reference) => {
                let r = self.eval_document_ref(reference, scope)?;
                self.document(&r)
            }
            Expr::Create { collection, params } => {
                let collection = self.eval_schema_ref(collection, scope, "collections")?;
                let params = self.eval(params, scope)?;
                let data = data_of(&params)?;
                self.create(&collection, data)
            }
            Expr::Update { reference, params } => {
                let r = self.eval_document_ref(reference, scope)?;
                let params = self.eval(params, scope)?;
                let data = data_of(&params)?;
                self.update(&r, data)
            }
            Expr::Delete(reference) => {
                let r = self.eval_document_ref(reference, scope)?;
                self.delete(&r)
            }
            Expr::Match(_) => Err(DbError::invalid_argument(
                "Set must be paginated before it is returned.",
            )),
            Expr::Paginate { set, size, after } => {
                let size = size.unwrap_or(DEFAULT_PAGE_SIZE);
                if size == 0 || size > schema::MAX_PAGE_SIZE {
                    return Err(DbError::invalid_argument(format!(
                        "Page size must be between 1 and {}.",
                        schema::MAX_PAGE_SIZE
                    )));
                }
                let items = self.eval_set(set, scope)?;
                let start = match after {
                    Some(cursor) => {
                        let cursor = self.eval(cursor, scope)?;
                        items
                            .iter()
                            .position(|item| cursor_order(&cursor_of(item), &cursor) != Ordering::Less)
                            .unwrap_or(items.len())
                    }
                    None => 0,
                };
                let end = start.saturating_add(size as usize).min(items.len());
                Ok(page(&items, start, end))
            }
            Expr::Map { collection, lambda } => {
                let collection = self.eval(collection, scope)?;
                let (items, page_fields) = items_of(collection)?;
                let mapped = items
                    .into_iter()
                    .map(|item| self.apply(lambda, item, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rewrap(mapped, page_fields))
            }
            Expr::Filter { collection, lambda } => {
                let collection = self.eval(collection, scope)?;
                let (items, page_fields) = items_of(collection)?;
                let kept = self.filter(items, lambda, scope)?;
                Ok(rewrap(kept, page_fields))
            }
            Expr::And(items) => {
                let mut all = true;
                for item in items {
                    match self.eval(item, scope)? {
                        Value::Bool(b) => all &= b,
                        other => {
                            return Err(DbError::invalid_argument(format!(
                                "And expects booleans, got {}.",
                                other.type_name()
                            )))
                        }
                    }
                }
                Ok(Value::Bool(all))
            }
            Expr::Lte(items) => self.chain(items, scope, |o| o != Ordering::Greater),
            Expr::Gte(items) => self.chain(items, scope, |o| o != Ordering::Less),
            Expr::Call { function, args } => {
                let name = self.eval_schema_ref(function, scope, "functions")?;
                let body = self.functions.get(&name).cloned().ok_or_else(|| {
                    DbError::invalid_ref(format!("Ref refers to undefined function '{name}'."))
                })?;
                let mut args = args
                    .iter()
                    .map(|e| self.eval(e, scope))
                    .collect::<Result<Vec<_>, _>>()?;
                let arg = if args.len() == 1 {
                    args.remove(0)
                } else {
                    Value::Array(args)
                };
                self.apply(&body, arg, &Scope::new())
            }
            Expr::CreateCollection { name } => {
                if self.collections.contains_key(name) {
                    return Err(DbError::already_exists(format!(
                        "Collection '{name}' already exists."
                    )));
                }
                self.collections.insert(name.clone(), Arc::default());
                Ok(self.schema_object("collections", name))
            }
            Expr::CreateIndex {
                name,
                source,
                values,
            } => {
                let source = self.eval_schema_ref(source, scope, "collections")?;
                if !self.collections.contains_key(&source) {
                    return Err(DbError::invalid_ref(format!(
                        "Ref refers to undefined collection '{source}'."
                    )));
                }
                if self.indexes.contains_key(name) {
                    return Err(DbError::already_exists(format!("Index '{name}' already exists.")));
                }
                self.indexes.insert(
                    name.clone(),
                    IndexDefinition {
                        source,
                        values: values.clone(),
                    },
                );
                Ok(self.schema_object("indexes", name))
            }
            Expr::CreateFunction { name, body } => {
                if !matches!(&**body, Expr::Lambda { .. }) {
                    return Err(DbError::invalid_argument("Function body must be a Lambda."));
                }
                if self.functions.contains_key(name) {
                    return Err(DbError::already_exists(format!(
                        "Function '{name}' already exists."
                    )));
                }
                self.functions.insert(name.clone(), (**body).clone());
                Ok(self.schema_object("functions", name))
            }
        }
    }

    fn eval_set(&mut self, expr: &Expr, scope: &Scope) -> Result<Vec<Value>, DbError> {
        match expr {
            Expr::Match(index) => {
                let name = self.eval_schema_ref(index, scope, "indexes")?;
                self.index_entries(&name)
            }
            Expr::Filter { collection, lambda } => {
                let items = self.eval_set(collection, scope)?;
                self.filter(items, lambda, scope)
            }
            _ => Err(DbError::invalid_argument("Set expected.")),
        }
    }

    fn apply(&mut self, lambda: &Expr, arg: Value, scope: &Scope) -> Result<Value, DbError> {
        let Expr::Lambda { params, body } = lambda else {
            return Err(DbError::invalid_argument("Lambda expected."));
        };
        let mut inner = scope.clone();
        match params.as_slice() {
            [single] => inner.push((single.clone(), arg)),
            many => match arg {
                Value::Array(items) if items.len() == many.len() => {
                    inner.extend(many.iter().cloned().zip(items));
                }
                _ => {
                    return Err(DbError::invalid_argument(format!(
                        "Lambda expects an array with {} elements.",
                        many.len()
                    )))
                }
            },
        }
        self.eval(body, &inner)
    }

    fn filter(&mut self, items: Vec<Value>, lambda: &Expr, scope: &Scope) -> Result<Vec<Value>, DbError> {
        let mut kept = Vec::new();
        for item in items {
            match self.apply(lambda, item.clone(), scope)? {
                Value::Bool(true) => kept.push(item),
                Value::Bool(false) => {}
                other => {
                    return Err(DbError::invalid_argument(format!(
                        "Filter lambda must return a boolean, got {}.",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(kept)
    }

    /// Incomparable operands make the comparison false.
    fn chain(
        &mut self,
        items: &[Expr],
        scope: &Scope,
        holds: impl Fn(Ordering) -> bool,
    ) -> Result<Value, DbError> {
        if items.is_empty() {
            return Err(DbError::invalid_argument("Comparison expects at least one value."));
        }
        let values = items
            .iter()
            .map(|e| self.eval(e, scope))
            .collect::<Result<Vec<_>, _>>()?;
        let result = values
            .windows(2)
            .all(|pair| pair[0].compare(&pair[1]).map(&holds).unwrap_or(false));
        Ok(Value::Bool(result))
    }

    fn eval_schema_ref(&mut self, expr: &Expr, scope: &Scope, class: &str) -> Result<String, DbError> {
        match self.eval(expr, scope)? {
            Value::Ref(r) if r.collection == class => Ok(r.id),
            other => Err(DbError::invalid_argument(format!(
                "Expected a {class} ref, got {}.",
                other.type_name()
            ))),
        }
    }

    fn eval_document_ref(&mut self, expr: &Expr, scope: &Scope) -> Result<Ref, DbError> {
        match self.eval(expr, scope)? {
            Value::Ref(r) if !matches!(r.collection.as_str(), "collections" | "indexes" | "functions") => {
                Ok(r)
            }
            other => Err(DbError::invalid_argument(format!(
                "Expected a document ref, got {}.",
                other.type_name()
            ))),
        }
    }

    fn documents(&self, collection: &str) -> Result<&BTreeMap<String, Document>, DbError> {
        self.collections.get(collection).map(|docs| &**docs).ok_or_else(|| {
            DbError::invalid_ref(format!("Ref refers to undefined collection '{collection}'."))
        })
    }

    fn documents_mut(&mut self, collection: &str) -> Result<&mut BTreeMap<String, Document>, DbError> {
        self.collections.get_mut(collection).map(Arc::make_mut).ok_or_else(|| {
            DbError::invalid_ref(format!("Ref refers to undefined collection '{collection}'."))
        })
    }

    fn document(&self, r: &Ref) -> Result<Value, DbError> {
        self.documents(&r.collection)?
            .get(&r.id)
            .map(|doc| document_value(r, doc))
            .ok_or_else(|| DbError::not_found("Document not found."))
    }

    fn create(&mut self, collection: &str, data: BTreeMap<String, Value>) -> Result<Value, DbError> {
        self.documents(collection)?;
        let id = self.next_id.to_string();
        self.next_id += 1;
        let doc = Document {
            data,
            ts: self.tick(),
        };
        let value = document_value(&Ref::new(collection, id.clone()), &doc);
        self.documents_mut(collection)?.insert(id, doc);
        Ok(value)
    }

    fn update(&mut self, r: &Ref, data: BTreeMap<String, Value>) -> Result<Value, DbError> {
        let ts = self.tick();
        let doc = self
            .documents_mut(&r.collection)?
            .get_mut(&r.id)
            .ok_or_else(|| DbError::not_found("Document not found."))?;
        for (key, value) in data {
            if value == Value::Null {
                doc.data.remove(&key);
            } else {
                doc.data.insert(key, value);
            }
        }
        doc.ts = ts;
        Ok(document_value(r, doc))
    }

    fn delete(&mut self, r: &Ref) -> Result<Value, DbError> {
        self.documents_mut(&r.collection)?
            .remove(&r.id)
            .map(|doc| document_value(r, &doc))
            .ok_or_else(|| DbError::not_found("Document not found."))
    }

    /// Entries sorted by their covered values, then by ref, as Fauna orders them.
    fn index_entries(&self, name: &str) -> Result<Vec<Value>, DbError> {
        let index = self.indexes.get(name).ok_or_else(|| {
            DbError::invalid_ref(format!("Ref refers to undefined index '{name}'."))
        })?;
        let docs = self.documents(&index.source)?;

        let mut entries: Vec<(Value, Ref)> = docs
            .iter()
            .map(|(id, doc)| {
                let r = Ref::new(index.source.clone(), id.clone());
                let entry = match index.values.as_slice() {
                    [] => Value::Ref(r.clone()),
                    [single] => field(single, &r, doc),
                    many => Value::Array(many.iter().map(|path| field(path, &r, doc)).collect()),
                };
                (entry, r)
            })
            .collect();
        entries.sort_by(|(a, ra), (b, rb)| entry_order(a, b).then_with(|| ra.cmp(rb)));

        Ok(entries.into_iter().map(|(entry, _)| entry).collect())
    }

    fn schema_object(&mut self, class: &str, name: &str) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("ref".to_string(), Value::Ref(Ref::new(class, name)));
        fields.insert("name".to_string(), Value::String(name.to_string()));
        fields.insert("ts".to_string(), Value::Int(self.tick()));
        Value::Object(fields)
    }

    /// Strictly increasing transaction time in microseconds.
    fn tick(&mut self) -> i64 {
        let now = Utc::now().timestamp_micros();
        self.last_ts = now.max(self.last_ts + 1);
        self.last_ts
    }
}

fn document_value(r: &Ref, doc: &Document) -> Value {
    let mut fields = BTreeMap::new();
    fields.insert("ref".to_string(), Value::Ref(r.clone()));
    fields.insert("ts".to_string(), Value::Int(doc.ts));
    fields.insert("data".to_string(), Value::Object(doc.data.clone()));
    Value::Object(fields)
}

fn field(path: &[String], r: &Ref, doc: &Document) -> Value {
    match path {
        [only] if only == "ref" => Value::Ref(r.clone()),
        [only] if only == "ts" => Value::Int(doc.ts),
        [head, rest @ ..] if head == "data" => {
            let mut current = doc.data.get(rest.first().map(String::as_str).unwrap_or_default());
            for key in rest.iter().skip(1) {
                current = current.and_then(|v| v.get(key));
            }
            current.cloned().unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn entry_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Array(a), Value::Array(b)) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| x.compare(y).unwrap_or(Ordering::Equal))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal),
        _ => a.compare(b).unwrap_or(Ordering::Equal),
    }
}

fn data_of(params: &Value) -> Result<BTreeMap<String, Value>, DbError> {
    match params.get("data") {
        None | Some(Value::Null) => Ok(BTreeMap::new()),
        Some(Value::Object(data)) => Ok(data.clone()),
        Some(other) => Err(DbError::new(
            super::DbErrorKind::Validation,
            "validation failed",
            format!("Field 'data' must be an object, got {}.", other.type_name()),
        )),
    }
}

/// Cursor addressing a set entry: its covered values, ref last.
fn cursor_of(entry: &Value) -> Value {
    match entry {
        Value::Array(_) => entry.clone(),
        single => Value::Array(vec![single.clone()]),
    }
}

fn cursor_order(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Array(x), Value::Array(y)) => {
            entry_order(a, b).then_with(|| x.len().cmp(&y.len()))
        }
        _ => entry_order(a, b),
    }
}

/// `items[start..end]` as a page, with cursors to whatever lies on either side.
fn page(items: &[Value], start: usize, end: usize) -> Value {
    let mut fields = BTreeMap::new();
    if start > 0 && start < items.len() {
        fields.insert("before".to_string(), cursor_of(&items[start]));
    }
    if end < items.len() {
        fields.insert("after".to_string(), cursor_of(&items[end]));
    }
    fields.insert("data".to_string(), Value::Array(items[start..end].to_vec()));
    Value::Object(fields)
}

/// Elements of an array or of a page's `data`, plus the page's cursors.
fn items_of(collection: Value) -> Result<(Vec<Value>, Option<BTreeMap<String, Value>>), DbError> {
    match collection {
        Value::Array(items) => Ok((items, None)),
        Value::Object(mut fields) => match fields.remove("data") {
            Some(Value::Array(items)) => Ok((items, Some(fields))),
            _ => Err(DbError::invalid_argument("Array or Page expected.")),
        },
        other => Err(DbError::invalid_argument(format!(
            "Array or Page expected, got {}.",
            other.type_name()
        ))),
    }
}

fn rewrap(items: Vec<Value>, page_fields: Option<BTreeMap<String, Value>>) -> Value {
    match page_fields {
        Some(mut fields) => {
            fields.insert("data".to_string(), Value::Array(items));
            Value::Object(fields)
        }
        None => Value::Array(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbErrorKind;
    use chrono::{DateTime, TimeZone};

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn create_window(store: &MemoryStore, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        let created = store
            .execute(&Expr::create(
                Expr::collection(schema::SHIPPING_COLLECTION),
                Expr::object([(
                    "data",
                    Expr::object([
                        ("startDate", Expr::time(start)),
                        ("endDate", Expr::time(end)),
                        ("message", Expr::literal("window")),
                    ]),
                )]),
            ))
            .unwrap();
        created
            .get("ref")
            .and_then(Value::as_reference)
            .unwrap()
            .id
            .clone()
    }

    fn current_ids(store: &MemoryStore, at: DateTime<Utc>) -> Vec<String> {
        let page = store
            .execute(&Expr::call(
                Expr::function(schema::CURRENT_WINDOWS_FUNCTION),
                vec![Expr::time(at)],
            ))
            .unwrap();
        page.get("data")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|doc| doc.get("ref").and_then(Value::as_reference).unwrap().id.clone())
            .collect()
    }

    #[test]
    fn current_windows_include_both_bounds() {
        let store = MemoryStore::provisioned().unwrap();
        let first = create_window(&store, day(2022, 3, 25), day(2022, 3, 26));
        let second = create_window(&store, day(2022, 3, 26), day(2022, 3, 27));

        assert_eq!(current_ids(&store, day(2022, 3, 26)), vec![first.clone(), second.clone()]);
        assert_eq!(current_ids(&store, day(2022, 3, 25)), vec![first]);
        assert_eq!(current_ids(&store, day(2022, 3, 27)), vec![second]);
        assert!(current_ids(&store, day(2022, 3, 28)).is_empty());
    }

    #[test]
    fn get_update_delete() {
        let store = MemoryStore::provisioned().unwrap();
        let id = create_window(&store, day(2022, 1, 1), day(2022, 1, 2));
        let reference = || Expr::document(schema::SHIPPING_COLLECTION, &id);

        let updated = store
            .execute(&Expr::update(
                reference(),
                Expr::object([("data", Expr::object([("message", Expr::literal("changed"))]))]),
            ))
            .unwrap();
        let data = updated.get("data").unwrap();
        assert_eq!(data.get("message").and_then(Value::as_str), Some("changed"));
        assert_eq!(data.get("startDate").and_then(Value::as_time), Some(day(2022, 1, 1)));

        store.execute(&Expr::delete(reference())).unwrap();

        let err = store.execute(&Expr::get(reference())).unwrap_err();
        assert_eq!(err.kind, DbErrorKind::NotFound);
        let err = store.execute(&Expr::delete(reference())).unwrap_err();
        assert_eq!(err.kind, DbErrorKind::NotFound);
    }

    #[test]
    fn failed_query_leaves_no_trace() {
        let store = MemoryStore::provisioned().unwrap();
        let create = Expr::create(
            Expr::collection(schema::SHIPPING_COLLECTION),
            Expr::object([("data", Expr::object([("message", Expr::literal("orphan"))]))]),
        );
        let missing = Expr::get(Expr::document(schema::SHIPPING_COLLECTION, "1"));

        let err = store.execute(&Expr::Array(vec![create, missing])).unwrap_err();
        assert_eq!(err.kind, DbErrorKind::NotFound);

        let listing = store
            .execute(&Expr::paginate(
                Expr::match_index(Expr::index(schema::ALL_SHIPPING_INDEX)),
                None,
            ))
            .unwrap();
        assert_eq!(listing.get("data").and_then(Value::as_array).map(|d| d.len()), Some(0));
    }

    #[test]
    fn pages_hand_out_cursors_until_exhausted() {
        let store = MemoryStore::provisioned().unwrap();
        let ids: Vec<String> = (1..=3)
            .map(|d| create_window(&store, day(2022, 1, d), day(2022, 1, d + 1)))
            .collect();
        let listing = |after: Option<Value>| {
            let set = Expr::match_index(Expr::index(schema::ALL_SHIPPING_INDEX));
            let query = match after {
                Some(cursor) => Expr::paginate_after(set, Some(2), cursor),
                None => Expr::paginate(set, Some(2)),
            };
            store.execute(&query).unwrap()
        };

        let first = listing(None);
        assert!(first.get("before").is_none());
        let after = first.get("after").cloned().unwrap();
        assert_eq!(
            after,
            Value::Array(vec![Value::Ref(Ref::new(schema::SHIPPING_COLLECTION, ids[2].clone()))])
        );

        let second = listing(Some(after));
        let refs: Vec<String> = second
            .get("data")
            .and_then(Value::as_array)
            .unwrap()
            .iter()
            .map(|r| r.as_reference().unwrap().id.clone())
            .collect();
        assert_eq!(refs, vec![ids[2].clone()]);
        assert!(second.get("after").is_none());
        assert!(second.get("before").is_some());
    }

    #[test]
    fn mapping_a_page_keeps_its_cursor() {
        let store = MemoryStore::provisioned().unwrap();
        create_window(&store, day(2022, 1, 1), day(2022, 1, 2));
        create_window(&store, day(2022, 2, 1), day(2022, 2, 2));

        let page = store
            .execute(&Expr::map(
                Expr::paginate(Expr::match_index(Expr::index(schema::ALL_SHIPPING_INDEX)), Some(1)),
                Expr::lambda(&["ref"], Expr::get(Expr::var("ref"))),
            ))
            .unwrap();
        assert_eq!(page.get("data").and_then(Value::as_array).map(|d| d.len()), Some(1));
        assert!(page.get("after").is_some());
    }

    #[test]
    fn reads_share_collections_with_the_live_database() {
        let store = MemoryStore::provisioned().unwrap();
        create_window(&store, day(2022, 1, 1), day(2022, 1, 2));
        let snapshot = |store: &MemoryStore| {
            store.db.lock().unwrap().collections[schema::SHIPPING_COLLECTION].clone()
        };

        let before = snapshot(&store);
        store
            .execute(&Expr::paginate(
                Expr::match_index(Expr::index(schema::ALL_SHIPPING_INDEX)),
                None,
            ))
            .unwrap();
        assert!(Arc::ptr_eq(&before, &snapshot(&store)));

        create_window(&store, day(2022, 2, 1), day(2022, 2, 2));
        let after = snapshot(&store);
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn provisioning_twice_reports_existing_objects() {
        let store = MemoryStore::provisioned().unwrap();
        let (_, collection) = schema::definitions().remove(0);
        let err = store.execute(&collection).unwrap_err();
        assert_eq!(err.kind, DbErrorKind::Validation);
        assert_eq!(err.code, "instance already exists");
    }

    #[test]
    fn unknown_collection_is_an_invalid_ref() {
        let store = MemoryStore::new();
        let err = store
            .execute(&Expr::get(Expr::document("Nope", "1")))
            .unwrap_err();
        assert_eq!(err.code, "invalid ref");
    }

    #[test]
    fn unpaginated_set_is_rejected() {
        let store = MemoryStore::provisioned().unwrap();
        let err = store
            .execute(&Expr::match_index(Expr::index(schema::ALL_SHIPPING_INDEX)))
            .unwrap_err();
        assert_eq!(err.kind, DbErrorKind::Validation);
    }
}
