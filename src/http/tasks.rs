//! Task endpoints.
//!
//! Filter and sort query params degrade leniently: an unparseable value is
//! treated as absent rather than failing the listing, matching the
//! documented listing policy.

use super::auth::Caller;
use super::ApiContext;
use crate::error::ApiError;
use crate::filter::{SortRequest, TaskFilter};
use crate::service::PageRequest;
use crate::types::{Page, Priority, Task, TaskDraft, TaskId, TaskStatus};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::Extension;
use chrono::NaiveDate;
use serde::Deserialize;

/// `POST /v1/tasks`
pub async fn create_task(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = ctx.service.create(&draft, caller)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `POST /v1/tasks/{parentId}/subtasks`
pub async fn create_subtask(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(parent_id): Path<TaskId>,
    Json(draft): Json<TaskDraft>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = ctx.service.create_subtask(parent_id, &draft, caller)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Raw listing query params; parsed leniently below.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub sort: Option<String>,
    pub direction: Option<String>,
}

impl ListParams {
    fn filter(&self) -> TaskFilter {
        TaskFilter {
            status: self.status.as_deref().and_then(TaskStatus::parse),
            priority: self.priority.as_deref().and_then(Priority::parse),
            due_date: self
                .due_date
                .as_deref()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
        }
    }

    fn sort(&self) -> SortRequest {
        SortRequest::parse_lenient(self.sort.as_deref(), self.direction.as_deref())
    }

    fn page(&self, default_size: u32) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(default_size),
        }
    }
}

/// `GET /v1/tasks`
pub async fn list_tasks(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Query(params): Query<ListParams>,
) -> Result<Json<Page<Task>>, ApiError> {
    let page = ctx.service.find_all(
        &params.filter(),
        params.sort(),
        params.page(ctx.default_page_size),
        caller,
    )?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: TaskStatus,
}

/// `PATCH /v1/tasks/{id}/status`
pub async fn update_status(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<TaskId>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<StatusCode, ApiError> {
    ctx.service.update_status(req.status, id, caller)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /v1/tasks/{id}`
pub async fn update_task(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<TaskId>,
    Json(draft): Json<TaskDraft>,
) -> Result<StatusCode, ApiError> {
    ctx.service.update(id, &draft, caller)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /v1/tasks/{id}`
pub async fn delete_task(
    State(ctx): State<ApiContext>,
    Extension(Caller(caller)): Extension<Caller>,
    Path(id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    ctx.service.delete(id, caller)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{SortDirection, SortKey};

    #[test]
    fn test_params_parse_leniently() {
        let params = ListParams {
            status: Some("IN_PROGRESS".into()),
            priority: Some("very-high".into()),
            due_date: Some("not-a-date".into()),
            sort: Some("dueDate".into()),
            direction: Some("desc".into()),
            ..Default::default()
        };

        let filter = params.filter();
        assert_eq!(filter.status, Some(TaskStatus::InProgress));
        // Unparseable values are dropped, not rejected
        assert_eq!(filter.priority, None);
        assert_eq!(filter.due_date, None);

        let sort = params.sort();
        assert_eq!(sort.key, SortKey::DueDate);
        assert_eq!(sort.direction, SortDirection::Desc);
    }

    #[test]
    fn test_page_defaults() {
        let params = ListParams::default();
        let page = params.page(10);
        assert_eq!(page.page, 0);
        assert_eq!(page.size, 10);
    }

    #[test]
    fn test_due_date_parses_iso_date() {
        let params = ListParams {
            due_date: Some("2025-08-18".into()),
            ..Default::default()
        };
        assert_eq!(
            params.filter().due_date,
            NaiveDate::from_ymd_opt(2025, 8, 18)
        );
    }
}
