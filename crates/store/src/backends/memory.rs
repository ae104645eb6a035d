//! In-memory backend.
//!
//! Keeps every realm's database in process memory behind [`parking_lot`]
//! locks. The filter evaluator mirrors the operator subset the query
//! compiler emits, so code written against this backend behaves the
//! same against a real deployment. Used as the test double throughout
//! and suitable for demos and single-process tools.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use parking_lot::RwLock;

use crate::error::{BackendError, StoreResult};
use crate::store::{DocumentDatabase, DocumentStore, FindSpec};
use crate::tenant::Realm;

const BACKEND_NAME: &str = "memory";

/// Process-local document store.
pub struct MemoryStore {
    database_prefix: String,
    databases: RwLock<HashMap<String, Arc<MemoryDatabase>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        MemoryStore {
            database_prefix: String::new(),
            databases: RwLock::new(HashMap::new()),
        }
    }

    /// Creates an empty store whose database names carry `prefix`.
    pub fn with_database_prefix(prefix: impl Into<String>) -> Self {
        MemoryStore {
            database_prefix: prefix.into(),
            databases: RwLock::new(HashMap::new()),
        }
    }

    fn database_handle(&self, name: &str) -> Arc<MemoryDatabase> {
        if let Some(database) = self.databases.read().get(name) {
            return Arc::clone(database);
        }
        let mut databases = self.databases.write();
        Arc::clone(
            databases
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryDatabase::new(name))),
        )
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn database(&self, realm: &Realm) -> Arc<dyn DocumentDatabase> {
        self.database_handle(&self.database_name(realm))
    }

    fn database_name(&self, realm: &Realm) -> String {
        format!("{}{}", self.database_prefix, realm.as_str())
    }

    async fn database_exists(&self, name: &str) -> StoreResult<bool> {
        let databases = self.databases.read();
        Ok(databases.get(name).is_some_and(|db| db.has_data()))
    }

    async fn list_databases(&self) -> StoreResult<Vec<String>> {
        let databases = self.databases.read();
        let mut names: Vec<String> = databases
            .iter()
            .filter(|(_, db)| db.has_data())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn drop_database(&self, name: &str) -> StoreResult<bool> {
        let mut databases = self.databases.write();
        let has_data = databases.get(name).is_some_and(|db| db.has_data());
        if has_data {
            databases.remove(name);
            tracing::info!(database = name, "database dropped");
            Ok(true)
        } else {
            // idle registrations stay put; resolved handles remain attached
            tracing::debug!(database = name, "no database to drop");
            Ok(false)
        }
    }
}

/// One realm's collections.
pub struct MemoryDatabase {
    name: String,
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryDatabase {
    fn new(name: &str) -> Self {
        MemoryDatabase {
            name: name.to_string(),
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// A database only observably exists once something was written.
    fn has_data(&self) -> bool {
        self.collections
            .read()
            .values()
            .any(|collection| !collection.is_empty())
    }
}

#[async_trait]
impl DocumentDatabase for MemoryDatabase {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<()> {
        let key = match document.get("_id") {
            Some(id) => id_key(id),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                document.insert("_id", id.clone());
                id
            }
        };

        let mut collections = self.collections.write();
        let entries = collections.entry(collection.to_string()).or_default();
        if entries.contains_key(&key) {
            return Err(BackendError::DuplicateKey {
                message: format!("_id '{key}' already present in {collection}"),
            }
            .into());
        }
        entries.insert(key, document);
        Ok(())
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        let collections = self.collections.read();
        let Some(entries) = collections.get(collection) else {
            return Ok(None);
        };
        for document in entries.values() {
            if matches(document, &filter)? {
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        spec: FindSpec,
    ) -> StoreResult<Vec<Document>> {
        let mut results = {
            let collections = self.collections.read();
            let Some(entries) = collections.get(collection) else {
                return Ok(Vec::new());
            };
            let mut matched = Vec::new();
            for document in entries.values() {
                if matches(document, &filter)? {
                    matched.push(document.clone());
                }
            }
            matched
        };

        sort_documents(&mut results, &spec.sort);
        if let Some(skip) = spec.skip {
            let skip = (skip as usize).min(results.len());
            results.drain(..skip);
        }
        if let Some(limit) = spec.limit {
            if limit >= 0 {
                results.truncate(limit as usize);
            }
        }
        Ok(results)
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let collections = self.collections.read();
        let Some(entries) = collections.get(collection) else {
            return Ok(0);
        };
        let mut total = 0;
        for document in entries.values() {
            if matches(document, &filter)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut modified = 0;
        for document in entries.values_mut() {
            if matches(document, &filter)? && apply_update(document, &update)? {
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write();
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(None);
        };
        for document in entries.values_mut() {
            if matches(document, &filter)? {
                apply_update(document, &update)?;
                return Ok(Some(document.clone()));
            }
        }
        Ok(None)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        let mut collections = self.collections.write();
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let mut target = None;
        for (key, document) in entries.iter() {
            if matches(document, &filter)? {
                target = Some(key.clone());
                break;
            }
        }
        Ok(target.and_then(|key| entries.remove(&key)))
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let mut collections = self.collections.write();
        let Some(entries) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let mut doomed = Vec::new();
        for (key, document) in entries.iter() {
            if matches(document, &filter)? {
                doomed.push(key.clone());
            }
        }
        for key in &doomed {
            entries.remove(key);
        }
        Ok(doomed.len() as u64)
    }
}

fn id_key(id: &Bson) -> String {
    match id {
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluates `filter` against `document`.
fn matches(document: &Document, filter: &Document) -> Result<bool, BackendError> {
    for (key, condition) in filter {
        let holds = match key.as_str() {
            "$and" => {
                let clauses = as_clause_list(condition, "$and")?;
                let mut all = true;
                for clause in clauses {
                    if !matches(document, clause)? {
                        all = false;
                        break;
                    }
                }
                all
            }
            "$or" => {
                let clauses = as_clause_list(condition, "$or")?;
                let mut any = false;
                for clause in clauses {
                    if matches(document, clause)? {
                        any = true;
                        break;
                    }
                }
                any
            }
            field => matches_field(document, field, condition)?,
        };
        if !holds {
            return Ok(false);
        }
    }
    Ok(true)
}

fn as_clause_list<'a>(
    condition: &'a Bson,
    combinator: &str,
) -> Result<Vec<&'a Document>, BackendError> {
    let Bson::Array(items) = condition else {
        return Err(BackendError::QueryExecution {
            message: format!("{combinator} requires an array of clauses"),
        });
    };
    items
        .iter()
        .map(|item| {
            item.as_document().ok_or_else(|| BackendError::QueryExecution {
                message: format!("{combinator} clauses must be documents"),
            })
        })
        .collect()
}

fn matches_field(
    document: &Document,
    field: &str,
    condition: &Bson,
) -> Result<bool, BackendError> {
    let actual = lookup(document, field);
    match condition {
        Bson::Document(operators) if is_operator_document(operators) => {
            let options = operators.get_str("$options").ok();
            for (op, operand) in operators {
                if op == "$options" {
                    continue;
                }
                let holds = if op == "$regex" {
                    regex_matches(actual, operand, options)?
                } else {
                    apply_operator(op, actual, operand)?
                };
                if !holds {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        literal => Ok(bson_eq(actual, literal)),
    }
}

fn is_operator_document(operators: &Document) -> bool {
    operators.keys().any(|key| key.starts_with('$'))
}

fn lookup<'a>(document: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut value = document.get(segments.next()?)?;
    for segment in segments {
        match value {
            Bson::Document(inner) => value = inner.get(segment)?,
            _ => return None,
        }
    }
    Some(value)
}

fn apply_operator(
    op: &str,
    actual: Option<&Bson>,
    operand: &Bson,
) -> Result<bool, BackendError> {
    match op {
        "$eq" => Ok(bson_eq(actual, operand)),
        "$in" => {
            let items = as_operand_list(op, operand)?;
            Ok(items.iter().any(|item| bson_eq(actual, item)))
        }
        "$nin" => {
            let items = as_operand_list(op, operand)?;
            Ok(!items.iter().any(|item| bson_eq(actual, item)))
        }
        "$all" => {
            let items = as_operand_list(op, operand)?;
            Ok(items.iter().all(|item| bson_eq(actual, item)))
        }
        "$size" => {
            let Some(expected) = numeric_value(operand) else {
                return Err(BackendError::QueryExecution {
                    message: "$size requires a numeric operand".to_string(),
                });
            };
            Ok(match actual {
                Some(Bson::Array(items)) => items.len() as f64 == expected,
                _ => false,
            })
        }
        "$exists" => {
            let want = match operand {
                Bson::Boolean(b) => *b,
                other => numeric_value(other).map(|n| n != 0.0).unwrap_or(true),
            };
            Ok(actual.is_some() == want)
        }
        "$gt" => Ok(ordered(actual, operand, |ord| ord == Ordering::Greater)),
        "$gte" => Ok(ordered(actual, operand, |ord| ord != Ordering::Less)),
        "$lt" => Ok(ordered(actual, operand, |ord| ord == Ordering::Less)),
        "$lte" => Ok(ordered(actual, operand, |ord| ord != Ordering::Greater)),
        other => Err(BackendError::QueryExecution {
            message: format!("unsupported filter operator '{other}'"),
        }),
    }
}

fn as_operand_list<'a>(op: &str, operand: &'a Bson) -> Result<&'a Vec<Bson>, BackendError> {
    match operand {
        Bson::Array(items) => Ok(items),
        _ => Err(BackendError::QueryExecution {
            message: format!("{op} requires an array operand"),
        }),
    }
}

fn ordered(actual: Option<&Bson>, operand: &Bson, accept: fn(Ordering) -> bool) -> bool {
    actual
        .and_then(|value| compare(value, operand))
        .map(accept)
        .unwrap_or(false)
}

fn regex_matches(
    actual: Option<&Bson>,
    pattern: &Bson,
    options: Option<&str>,
) -> Result<bool, BackendError> {
    let Bson::String(pattern) = pattern else {
        return Err(BackendError::QueryExecution {
            message: "$regex requires a string pattern".to_string(),
        });
    };
    let mut builder = regex::RegexBuilder::new(pattern);
    for flag in options.unwrap_or("").chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            _ => &mut builder,
        };
    }
    let regex = builder.build().map_err(|err| BackendError::QueryExecution {
        message: format!("invalid regex pattern '{pattern}': {err}"),
    })?;

    Ok(match actual {
        Some(Bson::String(value)) => regex.is_match(value),
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| matches!(item, Bson::String(s) if regex.is_match(s))),
        _ => false,
    })
}

/// Equality with native semantics: a missing field equals `null`, and
/// an array field also matches when any element equals the operand.
fn bson_eq(actual: Option<&Bson>, expected: &Bson) -> bool {
    match actual {
        None => matches!(expected, Bson::Null),
        Some(value) => {
            if values_equal(value, expected) {
                return true;
            }
            match value {
                Bson::Array(items) => items.iter().any(|item| values_equal(item, expected)),
                _ => false,
            }
        }
    }
}

fn values_equal(a: &Bson, b: &Bson) -> bool {
    if a == b {
        return true;
    }
    match (numeric_value(a), numeric_value(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn numeric_value(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn compare(a: &Bson, b: &Bson) -> Option<Ordering> {
    match (a, b) {
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        _ => match (numeric_value(a), numeric_value(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y),
            _ => None,
        },
    }
}

fn sort_documents(documents: &mut [Document], sort: &Document) {
    if sort.is_empty() {
        return;
    }
    documents.sort_by(|a, b| {
        for (field, direction) in sort {
            let mut ordering = compare_field(a, b, field);
            if is_descending(direction) {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn is_descending(direction: &Bson) -> bool {
    numeric_value(direction).map(|n| n < 0.0).unwrap_or(false)
}

/// Missing values sort before present ones, matching native ascending
/// order.
fn compare_field(a: &Document, b: &Document, field: &str) -> Ordering {
    match (lookup(a, field), lookup(b, field)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare(x, y).unwrap_or(Ordering::Equal),
    }
}

fn apply_update(document: &mut Document, update: &Document) -> Result<bool, BackendError> {
    let mut changed = false;
    for (op, spec) in update {
        let Bson::Document(fields) = spec else {
            return Err(BackendError::QueryExecution {
                message: format!("update operator '{op}' requires a document operand"),
            });
        };
        match op.as_str() {
            "$set" => {
                for (key, value) in fields {
                    if document.get(key) != Some(value) {
                        document.insert(key.clone(), value.clone());
                        changed = true;
                    }
                }
            }
            "$unset" => {
                for key in fields.keys() {
                    if document.remove(key).is_some() {
                        changed = true;
                    }
                }
            }
            other => {
                return Err(BackendError::QueryExecution {
                    message: format!("unsupported update operator '{other}'"),
                });
            }
        }
    }
    Ok(changed)
}
