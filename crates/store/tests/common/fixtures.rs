//! Test fixtures for the document store suites.
//!
//! Provides the [`Ticket`] entity used across the integration tests,
//! along with builders for shaping test data.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A support ticket used as the test entity across suites.
///
/// The field layout exercises the serialization conventions the store
/// expects from callers: the logical id maps to `_id`, optional fields
/// are omitted when absent, and timestamps are stored as BSON dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    /// Logical identifier, stored as `_id`.
    #[serde(rename = "_id")]
    pub id: String,
    /// Short summary line.
    pub title: String,
    /// Workflow state ("open", "triaged", "closed", ...).
    pub status: String,
    /// Urgency, higher is more urgent.
    pub priority: i32,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Person the ticket is assigned to, if anyone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Creation instant.
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Ticket {
    /// Creates a ticket with the given id and title and default fields.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Ticket {
            id: id.into(),
            title: title.into(),
            status: "open".to_string(),
            priority: 3,
            tags: Vec::new(),
            assignee: None,
            created_at: millis_aligned_now(),
        }
    }

    /// Sets the workflow state.
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the labels.
    pub fn with_tags(mut self, tags: Vec<&str>) -> Self {
        self.tags = tags.into_iter().map(String::from).collect();
        self
    }

    /// Sets the assignee.
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Sets the creation instant.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// The current instant truncated to millisecond precision.
///
/// BSON dates carry milliseconds, so fixtures built from an aligned
/// "now" round-trip through the store with field equality intact.
pub fn millis_aligned_now() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).expect("timestamp in range")
}

/// Noon UTC on the given day, for date filter fixtures.
pub fn noon(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .expect("valid calendar date")
}
