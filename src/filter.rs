//! Composable listing filter and sort for tasks.
//!
//! The filter always includes the mandatory top-level clause (subtasks are
//! only visible nested under their parent, never directly in a listing).
//! Each present criterion is ANDed on. Ownership scoping is a cross-cutting
//! concern and is conjoined by the domain service, not here.
//!
//! Sort requests parse leniently: an unrecognized field or direction falls
//! back to ascending id instead of failing the listing.

use crate::types::{Priority, TaskStatus};
use chrono::{FixedOffset, NaiveDate, TimeZone};
use rusqlite::types::Value;

/// Optional listing criteria.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    /// Matches tasks due anywhere within this calendar date, evaluated in
    /// the server's reference timezone.
    pub due_date: Option<NaiveDate>,
}

impl TaskFilter {
    /// Build the WHERE fragment and bind values for this filter.
    ///
    /// The fragment always starts from `is_subtask = 0`; only bound values
    /// carry caller input.
    pub fn where_clause(&self, tz: FixedOffset) -> (String, Vec<Value>) {
        let mut sql = String::from("is_subtask = 0");
        let mut bind: Vec<Value> = Vec::new();

        if let Some(status) = self.status {
            sql.push_str(" AND status = ?");
            bind.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(priority) = self.priority {
            sql.push_str(" AND priority = ?");
            bind.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(date) = self.due_date {
            let (start_ms, end_ms) = day_window_ms(date, tz);
            sql.push_str(" AND due_date BETWEEN ? AND ?");
            bind.push(Value::Integer(start_ms));
            bind.push(Value::Integer(end_ms));
        }

        (sql, bind)
    }
}

/// `[00:00:00, 23:59:59]` of the given date in the given offset, as epoch ms.
fn day_window_ms(date: NaiveDate, tz: FixedOffset) -> (i64, i64) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = date.and_hms_opt(23, 59, 59).unwrap_or_default();

    let start_ms = tz
        .from_local_datetime(&start)
        .single()
        .map(|d| d.timestamp_millis())
        .unwrap_or_default();
    let end_ms = tz
        .from_local_datetime(&end)
        .single()
        .map(|d| d.timestamp_millis())
        .unwrap_or_default();

    (start_ms, end_ms)
}

/// Whitelisted sort fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Id,
    Title,
    DueDate,
    Status,
    Priority,
    CreatedAt,
}

impl SortKey {
    /// Lenient parse; anything unrecognized becomes the default (id).
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s.map(|s| s.to_lowercase()).as_deref() {
            Some("id") => SortKey::Id,
            Some("title") => SortKey::Title,
            Some("duedate") | Some("due_date") => SortKey::DueDate,
            Some("status") => SortKey::Status,
            Some("priority") => SortKey::Priority,
            Some("createdat") | Some("created_at") => SortKey::CreatedAt,
            _ => SortKey::Id,
        }
    }

    fn column_expr(&self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Title => "title",
            // NULL due dates sort last either way
            SortKey::DueDate => "due_date",
            SortKey::Status => "status",
            // Rank rather than the accidental alphabetical order of the
            // stored strings
            SortKey::Priority => {
                "CASE priority WHEN 'LOW' THEN 0 WHEN 'MEDIUM' THEN 1 WHEN 'HIGH' THEN 2 END"
            }
            SortKey::CreatedAt => "created_at",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse; anything unrecognized becomes ascending.
    pub fn parse_lenient(s: Option<&str>) -> Self {
        match s.map(|s| s.to_lowercase()).as_deref() {
            Some("desc") => SortDirection::Desc,
            _ => SortDirection::Asc,
        }
    }

    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort request resolved from caller input.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortRequest {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortRequest {
    /// Resolve raw `sort`/`direction` strings, falling back to ascending id.
    pub fn parse_lenient(sort: Option<&str>, direction: Option<&str>) -> Self {
        Self {
            key: SortKey::parse_lenient(sort),
            direction: SortDirection::parse_lenient(direction),
        }
    }

    /// SQL ORDER BY expression. Ties break on id so pagination is stable.
    pub fn order_clause(&self) -> String {
        if self.key == SortKey::Id {
            format!("id {}", self.direction.as_sql())
        } else {
            format!(
                "{} {}, id ASC",
                self.key.column_expr(),
                self.direction.as_sql()
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn test_empty_filter_is_top_level_only() {
        let (sql, bind) = TaskFilter::default().where_clause(utc());
        assert_eq!(sql, "is_subtask = 0");
        assert!(bind.is_empty());
    }

    #[test]
    fn test_all_criteria_conjoined() {
        let filter = TaskFilter {
            status: Some(TaskStatus::Done),
            priority: Some(Priority::High),
            due_date: Some(NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()),
        };
        let (sql, bind) = filter.where_clause(utc());
        assert_eq!(
            sql,
            "is_subtask = 0 AND status = ? AND priority = ? AND due_date BETWEEN ? AND ?"
        );
        assert_eq!(bind.len(), 4);
        assert_eq!(bind[0], Value::Text("DONE".into()));
        assert_eq!(bind[1], Value::Text("HIGH".into()));
    }

    #[test]
    fn test_due_date_window_respects_offset() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        let (utc_start, utc_end) = day_window_ms(date, utc());
        let minus3 = FixedOffset::west_opt(3 * 3600).unwrap();
        let (off_start, off_end) = day_window_ms(date, minus3);

        // Local midnight at UTC-3 is three hours later in absolute time
        assert_eq!(off_start - utc_start, 3 * 3600 * 1000);
        assert_eq!(utc_end - utc_start, (24 * 3600 - 1) * 1000);
        assert_eq!(off_end - off_start, (24 * 3600 - 1) * 1000);
    }

    #[test]
    fn test_sort_parses_known_fields() {
        let sort = SortRequest::parse_lenient(Some("dueDate"), Some("DESC"));
        assert_eq!(sort.key, SortKey::DueDate);
        assert_eq!(sort.direction, SortDirection::Desc);
        assert_eq!(sort.order_clause(), "due_date DESC, id ASC");
    }

    #[test]
    fn test_sort_falls_back_on_garbage() {
        let sort = SortRequest::parse_lenient(Some("passwordHash"), Some("sideways"));
        assert_eq!(sort.key, SortKey::Id);
        assert_eq!(sort.direction, SortDirection::Asc);
        assert_eq!(sort.order_clause(), "id ASC");
    }

    #[test]
    fn test_priority_sort_is_ranked() {
        let sort = SortRequest::parse_lenient(Some("priority"), None);
        assert!(sort.order_clause().starts_with("CASE priority"));
    }
}
