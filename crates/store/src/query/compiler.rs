//! Compilation of [`QueryDescriptor`] values into native filter
//! documents.
//!
//! Compilation is infallible: every shape that could be rejected was
//! rejected when the descriptor was parsed or built. Each populated
//! descriptor section becomes one clause, and all clauses are
//! AND-combined.

use bson::{Bson, Document, doc};
use chrono::{DateTime, Duration, Utc};

use super::descriptor::{
    DateFilter, DateFilterMode, FieldCondition, FilterTree, QueryDescriptor, TextSearch,
};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// The native form of a descriptor: a filter document and a sort
/// document, both ready to hand to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// The match criteria. Empty means match-all.
    pub filter: Document,
    /// Sort fields in order, each mapped to `1` or `-1`.
    pub sort: Document,
}

/// Compiles a descriptor into its native filter and sort documents.
///
/// An empty descriptor compiles to an empty (match-all) filter;
/// otherwise the filter is always a top-level `$and` of one clause per
/// populated section.
pub fn compile(descriptor: &QueryDescriptor) -> CompiledQuery {
    let mut clauses: Vec<Document> = Vec::new();

    if !descriptor.include_ids.is_empty() {
        clauses.push(doc! { "_id": { "$in": descriptor.include_ids.clone() } });
    }
    if !descriptor.exclude_ids.is_empty() {
        clauses.push(doc! { "_id": { "$nin": descriptor.exclude_ids.clone() } });
    }
    if let Some(clause) = descriptor.text.as_ref().and_then(compile_text) {
        clauses.push(clause);
    }
    if let Some(clause) = descriptor.filters.as_ref().and_then(compile_filters) {
        clauses.push(clause);
    }
    if let Some(date) = &descriptor.date {
        clauses.push(compile_date(date));
    }

    let filter = if clauses.is_empty() {
        Document::new()
    } else {
        doc! { "$and": clauses }
    };

    let mut sort = Document::new();
    for (field, direction) in &descriptor.sort {
        sort.insert(field.clone(), direction.as_i32());
    }

    CompiledQuery { filter, sort }
}

/// Case-insensitive literal match, OR-combined across the fields.
/// Degenerate searches (blank term or no fields) compile to nothing.
fn compile_text(text: &TextSearch) -> Option<Document> {
    let term = text.term.trim();
    if term.is_empty() || text.fields.is_empty() {
        return None;
    }
    let escaped = regex::escape(term);
    let alternatives: Vec<Document> = text
        .fields
        .iter()
        .map(|field| field_clause(field, doc! { "$regex": &escaped, "$options": "i" }))
        .collect();
    Some(doc! { "$or": alternatives })
}

/// `(any_of) AND (all_of)`; a lone bucket stands on its own.
fn compile_filters(filters: &FilterTree) -> Option<Document> {
    let any_of: Vec<Document> = filters
        .any_of
        .iter()
        .map(|(field, condition)| field_clause(field, condition_value(condition)))
        .collect();
    let all_of: Vec<Document> = filters
        .all_of
        .iter()
        .map(|(field, condition)| field_clause(field, condition_value(condition)))
        .collect();

    match (any_of.is_empty(), all_of.is_empty()) {
        (true, true) => None,
        (false, true) => Some(doc! { "$or": any_of }),
        (true, false) => Some(doc! { "$and": all_of }),
        (false, false) => {
            Some(doc! { "$and": [ { "$or": any_of }, { "$and": all_of } ] })
        }
    }
}

fn condition_value(condition: &FieldCondition) -> Bson {
    match condition {
        FieldCondition::Eq(value) => value.clone(),
        FieldCondition::In(values) => Bson::Document(doc! { "$in": values.clone() }),
        FieldCondition::Nin(values) => Bson::Document(doc! { "$nin": values.clone() }),
        FieldCondition::All(values) => Bson::Document(doc! { "$all": values.clone() }),
        FieldCondition::Size(n) => Bson::Document(doc! { "$size": *n }),
        FieldCondition::Exists(present) => Bson::Document(doc! { "$exists": *present }),
        FieldCondition::Regex { pattern, options } => {
            Bson::Document(doc! { "$regex": pattern, "$options": options })
        }
    }
}

/// Bounds are whole UTC days regardless of the time-of-day carried by
/// the descriptor's instants.
fn compile_date(date: &DateFilter) -> Document {
    let bounds = match date.mode {
        DateFilterMode::On(instant) => day_bounds(instant, instant),
        DateFilterMode::Today => {
            let now = Utc::now();
            day_bounds(now, now)
        }
        DateFilterMode::From(instant) => {
            doc! { "$gte": bson::DateTime::from_chrono(day_start(instant)) }
        }
        DateFilterMode::Until(instant) => {
            doc! { "$lte": bson::DateTime::from_chrono(day_end(instant)) }
        }
        DateFilterMode::Between { start, end } => day_bounds(start, end),
    };
    field_clause(&date.field, bounds)
}

fn day_bounds(start: DateTime<Utc>, end: DateTime<Utc>) -> Document {
    doc! {
        "$gte": bson::DateTime::from_chrono(day_start(start)),
        "$lte": bson::DateTime::from_chrono(day_end(end)),
    }
}

/// Midnight UTC of the day containing `instant`.
fn day_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    let floored = instant.timestamp_millis().div_euclid(MILLIS_PER_DAY) * MILLIS_PER_DAY;
    DateTime::from_timestamp_millis(floored).unwrap_or(instant)
}

/// The last representable millisecond of the day containing `instant`.
fn day_end(instant: DateTime<Utc>) -> DateTime<Utc> {
    day_start(instant) + Duration::milliseconds(MILLIS_PER_DAY - 1)
}

/// Builds a single-field clause with a runtime field name.
fn field_clause(field: &str, value: impl Into<Bson>) -> Document {
    let mut clause = Document::new();
    clause.insert(field, value);
    clause
}
