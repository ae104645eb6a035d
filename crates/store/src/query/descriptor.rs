//! Typed query descriptors.
//!
//! A [`QueryDescriptor`] is the transient, structured form of a search
//! request. It is either built fluently in code or parsed once from the
//! legacy JSON map format with [`QueryDescriptor::from_json`]; after
//! parsing, every operator is a tagged [`FieldCondition`] variant and no
//! untyped map survives to compilation.

use bson::{Bson, Document};
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;

use crate::error::QueryError;

/// Wire key for the id include list.
const KEY_IDS_LIST: &str = "idsList";
/// Wire key for the id exclude list.
const KEY_NOT_IDS_LIST: &str = "notIdsList";
/// Wire key for the text search term.
const KEY_SEARCH_TEXT: &str = "searchText";
/// Wire key for the text search field list.
const KEY_SEARCH_FIELDS: &str = "searchFields";
/// Wire key for the filter tree.
const KEY_FILTERS: &str = "filters";
/// Wire key for the date filter.
const KEY_DATE_FILTER: &str = "dateFilter";
/// Wire key for the sort map.
const KEY_SORT: &str = "sort";

/// Prefix marking a bare string condition as a regex pattern.
const REGEX_PREFIX: &str = "regex:";

/// Field a date filter applies to when the wire form names none.
pub const DEFAULT_DATE_FIELD: &str = "createdAt";

/// One condition applied to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldCondition {
    /// Exact equality.
    Eq(Bson),
    /// The field value is one of the listed values.
    In(Vec<Bson>),
    /// The field value is none of the listed values.
    Nin(Vec<Bson>),
    /// An array field contains every listed element.
    All(Vec<Bson>),
    /// An array field has exactly this many elements.
    Size(i64),
    /// Field presence or absence.
    Exists(bool),
    /// Pattern match with native regex options (`i`, `m`, `s`, `x`).
    Regex {
        /// The pattern.
        pattern: String,
        /// Option letters, e.g. `"i"` for case-insensitive.
        options: String,
    },
}

impl FieldCondition {
    /// Creates a case-insensitive regex condition.
    pub fn regex_ci(pattern: impl Into<String>) -> Self {
        FieldCondition::Regex {
            pattern: pattern.into(),
            options: "i".to_string(),
        }
    }

    /// Parses the wire form of a single condition.
    ///
    /// Fallback rules, in order:
    /// - an object selects its operator explicitly via `"op"`
    ///   (defaulting to `in`), with the operand under `"values"`,
    ///   `"value"`, or `"pattern"`/`"options"` depending on the operator
    /// - a bare array is [`FieldCondition::In`]
    /// - a bare string starting with `regex:` is a case-insensitive
    ///   [`FieldCondition::Regex`] on the remainder
    /// - any other bare value is [`FieldCondition::Eq`]
    pub fn from_json(field: &str, value: &JsonValue) -> Result<Self, QueryError> {
        match value {
            JsonValue::Object(map) => Self::from_operator_map(field, map),
            JsonValue::Array(items) => {
                Ok(FieldCondition::In(items.iter().map(json_to_bson).collect()))
            }
            JsonValue::String(s) if s.starts_with(REGEX_PREFIX) => {
                Ok(FieldCondition::regex_ci(&s[REGEX_PREFIX.len()..]))
            }
            other => Ok(FieldCondition::Eq(json_to_bson(other))),
        }
    }

    fn from_operator_map(
        field: &str,
        map: &serde_json::Map<String, JsonValue>,
    ) -> Result<Self, QueryError> {
        let op = map
            .get("op")
            .map(json_to_string)
            .unwrap_or_else(|| "in".to_string())
            .to_lowercase();

        match op.as_str() {
            "eq" => Ok(FieldCondition::Eq(
                map.get("value").map(json_to_bson).unwrap_or(Bson::Null),
            )),
            "in" => {
                // legacy forms carried the list under either key
                let operand = map.get("values").or_else(|| map.get("value"));
                match operand.and_then(JsonValue::as_array) {
                    Some(items) => {
                        Ok(FieldCondition::In(items.iter().map(json_to_bson).collect()))
                    }
                    None => Err(malformed(&op, field, "requires a list in 'values'")),
                }
            }
            "nin" => match map.get("values").and_then(JsonValue::as_array) {
                Some(items) => Ok(FieldCondition::Nin(
                    items.iter().map(json_to_bson).collect(),
                )),
                None => Err(malformed(&op, field, "requires a list in 'values'")),
            },
            "all" => match map.get("values").and_then(JsonValue::as_array) {
                Some(items) => Ok(FieldCondition::All(
                    items.iter().map(json_to_bson).collect(),
                )),
                None => Err(malformed(&op, field, "requires a list in 'values'")),
            },
            "size" => match map.get("value").and_then(numeric_as_i64) {
                Some(n) => Ok(FieldCondition::Size(n)),
                None => Err(malformed(&op, field, "requires a numeric 'value'")),
            },
            "exists" => match map.get("value").and_then(JsonValue::as_bool) {
                Some(b) => Ok(FieldCondition::Exists(b)),
                None => Err(malformed(&op, field, "requires a boolean 'value'")),
            },
            "regex" => {
                let pattern = map.get("pattern").map(json_to_string).unwrap_or_default();
                if pattern.is_empty() {
                    return Err(malformed(&op, field, "requires a non-empty 'pattern'"));
                }
                let options = map
                    .get("options")
                    .map(json_to_string)
                    .unwrap_or_else(|| "i".to_string());
                Ok(FieldCondition::Regex { pattern, options })
            }
            other => Err(QueryError::UnsupportedOperator {
                op: other.to_string(),
            }),
        }
    }
}

fn malformed(op: &str, field: &str, reason: &str) -> QueryError {
    QueryError::MalformedOperand {
        op: op.to_string(),
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Case-insensitive literal substring search across named fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSearch {
    /// The literal term; regex metacharacters are escaped at compile
    /// time.
    pub term: String,
    /// The fields searched, OR-combined.
    pub fields: Vec<String>,
}

/// Two buckets of field conditions: `all_of` are AND-combined, `any_of`
/// OR-combined, and the buckets themselves combine as
/// `(any_of) AND (all_of)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    /// Conditions every document must satisfy.
    pub all_of: Vec<(String, FieldCondition)>,
    /// Conditions of which at least one must hold.
    pub any_of: Vec<(String, FieldCondition)>,
}

impl FilterTree {
    /// Returns `true` when both buckets are empty.
    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }
}

/// How a date filter bounds its field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFilterMode {
    /// Within the UTC day containing the instant.
    On(DateTime<Utc>),
    /// On or after the start of the UTC day containing the instant.
    From(DateTime<Utc>),
    /// On or before the end of the UTC day containing the instant.
    Until(DateTime<Utc>),
    /// Within the current UTC day, evaluated at compile time.
    Today,
    /// Within the inclusive day range `[start, end]`.
    Between {
        /// First day of the range.
        start: DateTime<Utc>,
        /// Last day of the range.
        end: DateTime<Utc>,
    },
}

/// A whole-day date constraint on one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFilter {
    /// The document field holding the datetime.
    pub field: String,
    /// The bounding mode.
    pub mode: DateFilterMode,
}

/// Sort direction for one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending (compiles to `1`).
    Asc,
    /// Descending (compiles to `-1`).
    Desc,
}

impl SortDirection {
    /// The native numeric form.
    pub fn as_i32(self) -> i32 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// A structured search request.
///
/// # Examples
///
/// ```
/// use tessera_store::query::{FieldCondition, QueryDescriptor, SortDirection};
///
/// let descriptor = QueryDescriptor::new()
///     .with_filter("status", FieldCondition::Eq("ACTIVE".into()))
///     .with_or_filter("role", FieldCondition::In(vec!["ADMIN".into(), "MANAGER".into()]))
///     .with_sort("lastName", SortDirection::Asc);
///
/// assert!(!descriptor.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    /// Restrict results to these ids.
    pub include_ids: Vec<String>,
    /// Exclude these ids from results.
    pub exclude_ids: Vec<String>,
    /// Free-text search, if any.
    pub text: Option<TextSearch>,
    /// Structured field filters, if any.
    pub filters: Option<FilterTree>,
    /// Date constraint, if any.
    pub date: Option<DateFilter>,
    /// Sort order as `(field, direction)` pairs, applied in order.
    pub sort: Vec<(String, SortDirection)>,
}

impl QueryDescriptor {
    /// Creates an empty descriptor (compiles to match-all).
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to the given ids.
    pub fn with_include_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.include_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Excludes the given ids from results.
    pub fn with_exclude_ids<I>(mut self, ids: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.exclude_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a case-insensitive literal text search across `fields`.
    pub fn with_text<I>(mut self, term: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.text = Some(TextSearch {
            term: term.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Adds a condition to the AND bucket.
    pub fn with_filter(mut self, field: impl Into<String>, condition: FieldCondition) -> Self {
        self.filters
            .get_or_insert_with(FilterTree::default)
            .all_of
            .push((field.into(), condition));
        self
    }

    /// Adds a condition to the OR bucket.
    pub fn with_or_filter(mut self, field: impl Into<String>, condition: FieldCondition) -> Self {
        self.filters
            .get_or_insert_with(FilterTree::default)
            .any_of
            .push((field.into(), condition));
        self
    }

    /// Sets a whole-day date constraint on `field`.
    pub fn with_date(mut self, field: impl Into<String>, mode: DateFilterMode) -> Self {
        self.date = Some(DateFilter {
            field: field.into(),
            mode,
        });
        self
    }

    /// Appends a sort field.
    pub fn with_sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push((field.into(), direction));
        self
    }

    /// Returns `true` when the descriptor carries no filter criteria.
    ///
    /// Sort-only descriptors count as empty: they would compile to a
    /// match-all filter, which the bulk guards must reject.
    pub fn is_empty(&self) -> bool {
        self.include_ids.is_empty()
            && self.exclude_ids.is_empty()
            && self.text.is_none()
            && self.filters.as_ref().is_none_or(FilterTree::is_empty)
            && self.date.is_none()
    }

    /// Parses the legacy JSON map format.
    ///
    /// Recognized keys: `idsList`, `notIdsList`, `searchText` +
    /// `searchFields`, `filters: { and: {..}, or: {..} }`, `dateFilter:
    /// { type, field, startDate, endDate, onDate }`, and `sort:
    /// { field: 1 | -1 }`. Unknown keys are ignored. Non-list id values
    /// are treated as absent, and a non-object `sort` is silently
    /// skipped, both matching the format's historic tolerance.
    pub fn from_json(value: &JsonValue) -> Result<Self, QueryError> {
        let map = value.as_object().ok_or(QueryError::NotAnObject)?;
        let mut descriptor = QueryDescriptor::new();

        if let Some(ids) = map.get(KEY_IDS_LIST) {
            descriptor.include_ids = string_list(ids);
        }
        if let Some(ids) = map.get(KEY_NOT_IDS_LIST) {
            descriptor.exclude_ids = string_list(ids);
        }
        if let (Some(term), Some(fields)) = (map.get(KEY_SEARCH_TEXT), map.get(KEY_SEARCH_FIELDS))
        {
            let term = json_to_string(term).trim().to_string();
            let fields = string_list(fields);
            if !term.is_empty() && !fields.is_empty() {
                descriptor.text = Some(TextSearch { term, fields });
            }
        }
        if let Some(filters) = map.get(KEY_FILTERS) {
            descriptor.filters = Some(parse_filter_tree(filters)?);
        }
        if let Some(date) = map.get(KEY_DATE_FILTER) {
            descriptor.date = Some(parse_date_filter(date)?);
        }
        if let Some(sort) = map.get(KEY_SORT) {
            descriptor.sort = parse_sort(sort)?;
        }

        Ok(descriptor)
    }
}

fn parse_filter_tree(value: &JsonValue) -> Result<FilterTree, QueryError> {
    let map = value
        .as_object()
        .ok_or(QueryError::ExpectedObject { key: "filters" })?;
    let mut tree = FilterTree::default();

    if let Some(bucket) = map.get("or") {
        let bucket = bucket
            .as_object()
            .ok_or(QueryError::ExpectedObject { key: "or" })?;
        for (field, condition) in bucket {
            tree.any_of
                .push((field.clone(), FieldCondition::from_json(field, condition)?));
        }
    }
    if let Some(bucket) = map.get("and") {
        let bucket = bucket
            .as_object()
            .ok_or(QueryError::ExpectedObject { key: "and" })?;
        for (field, condition) in bucket {
            tree.all_of
                .push((field.clone(), FieldCondition::from_json(field, condition)?));
        }
    }

    Ok(tree)
}

fn parse_date_filter(value: &JsonValue) -> Result<DateFilter, QueryError> {
    let map = value.as_object().ok_or(QueryError::ExpectedObject {
        key: "dateFilter",
    })?;

    let mode_raw = map
        .get("type")
        .map(json_to_string)
        .unwrap_or_else(|| "between".to_string())
        .to_lowercase();
    let field = map
        .get("field")
        .map(json_to_string)
        .unwrap_or_else(|| DEFAULT_DATE_FIELD.to_string());

    let start = map.get("startDate").map(parse_timestamp).transpose()?;
    let end = map.get("endDate").map(parse_timestamp).transpose()?;
    let on = map.get("onDate").map(parse_timestamp).transpose()?;

    let mode = match mode_raw.as_str() {
        "on" => DateFilterMode::On(on.ok_or(QueryError::MissingDateBound {
            mode: mode_raw.clone(),
            bound: "onDate",
        })?),
        ">=" => DateFilterMode::From(start.ok_or(QueryError::MissingDateBound {
            mode: mode_raw.clone(),
            bound: "startDate",
        })?),
        "<=" => DateFilterMode::Until(end.ok_or(QueryError::MissingDateBound {
            mode: mode_raw.clone(),
            bound: "endDate",
        })?),
        "today" => DateFilterMode::Today,
        "between" => match (start, end) {
            (Some(start), Some(end)) => DateFilterMode::Between { start, end },
            _ => {
                return Err(QueryError::MissingDateBound {
                    mode: mode_raw,
                    bound: "startDate/endDate",
                });
            }
        },
        _ => return Err(QueryError::UnknownDateMode { mode: mode_raw }),
    };

    Ok(DateFilter { field, mode })
}

fn parse_sort(value: &JsonValue) -> Result<Vec<(String, SortDirection)>, QueryError> {
    let Some(map) = value.as_object() else {
        return Ok(Vec::new());
    };
    let mut sort = Vec::with_capacity(map.len());
    for (field, direction) in map {
        let numeric = direction
            .as_i64()
            .or_else(|| direction.as_f64().map(|f| f as i64));
        match numeric {
            Some(1) => sort.push((field.clone(), SortDirection::Asc)),
            Some(-1) => sort.push((field.clone(), SortDirection::Desc)),
            _ => {
                return Err(QueryError::InvalidSortDirection {
                    field: field.clone(),
                });
            }
        }
    }
    Ok(sort)
}

fn parse_timestamp(value: &JsonValue) -> Result<DateTime<Utc>, QueryError> {
    let raw = json_to_string(value);
    DateTime::parse_from_rfc3339(&raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| QueryError::InvalidTimestamp { value: raw })
}

/// Stringifies a JSON value the way the legacy format did: strings
/// verbatim, everything else via its JSON rendering.
fn json_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_list(value: &JsonValue) -> Vec<String> {
    match value {
        JsonValue::Array(items) => items.iter().map(json_to_string).collect(),
        _ => Vec::new(),
    }
}

fn numeric_as_i64(value: &JsonValue) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

/// Converts a JSON value to BSON without extended-JSON interpretation.
pub(crate) fn json_to_bson(value: &JsonValue) -> Bson {
    match value {
        JsonValue::Null => Bson::Null,
        JsonValue::Bool(b) => Bson::Boolean(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Bson::Int64(i)
            } else {
                Bson::Double(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => Bson::String(s.clone()),
        JsonValue::Array(items) => Bson::Array(items.iter().map(json_to_bson).collect()),
        JsonValue::Object(map) => {
            let mut document = Document::new();
            for (key, entry) in map {
                document.insert(key.clone(), json_to_bson(entry));
            }
            Bson::Document(document)
        }
    }
}
