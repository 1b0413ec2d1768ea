//! Task domain service: hierarchy, completion gating, and ownership rules.
//!
//! Every operation takes an explicit caller user id. The caller is assumed
//! to be authenticated already; resolving credentials to an id is the HTTP
//! layer's job.

use crate::db::tasks::NewTask;
use crate::db::{now_ms, Database};
use crate::error::{ApiError, ApiResult};
use crate::filter::{SortRequest, TaskFilter};
use crate::types::{Page, Task, TaskDraft, TaskId, TaskStatus, UserId};
use chrono::FixedOffset;
use rusqlite::types::Value;
use tracing::debug;

/// Fail `Forbidden` unless the task belongs to the caller.
///
/// Invoked before every mutation and deletion, never before creation
/// (a fresh task has no prior owner to check against).
pub fn assert_owned(task: &Task, caller: UserId) -> ApiResult<()> {
    if task.owner_user_id != caller {
        return Err(ApiError::not_owner(task.id));
    }
    Ok(())
}

/// Requested page of a listing, zero-based.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

/// Largest accepted page size; bigger requests are clamped, not rejected.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Domain service for task operations.
#[derive(Clone)]
pub struct TaskService {
    db: Database,
    /// Reference offset used to evaluate calendar-date filters.
    tz: FixedOffset,
}

impl TaskService {
    pub fn new(db: Database, tz: FixedOffset) -> Self {
        Self { db, tz }
    }

    /// Create a top-level task owned by the caller.
    pub fn create(&self, draft: &TaskDraft, owner: UserId) -> ApiResult<Task> {
        validate_draft(draft)?;

        let task = self.db.insert_task(&NewTask {
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            status: draft.status.unwrap_or_default(),
            priority: draft.priority.unwrap_or_default(),
            is_subtask: false,
            parent_task_id: None,
            owner_user_id: owner,
        })?;

        debug!(task_id = task.id, owner, "created task");
        Ok(task)
    }

    /// Create a subtask under an existing top-level task.
    ///
    /// Fails `NotFound` when the parent is absent, `Forbidden` when the
    /// parent belongs to someone else, and `BadRequest` when the parent is
    /// itself a subtask (the hierarchy is at most two levels deep).
    pub fn create_subtask(
        &self,
        parent_id: TaskId,
        draft: &TaskDraft,
        owner: UserId,
    ) -> ApiResult<Task> {
        let parent = self.load(parent_id)?;
        assert_owned(&parent, owner)?;

        if parent.is_subtask {
            return Err(ApiError::subtask_nesting(parent_id));
        }

        validate_draft(draft)?;

        let subtask = self.db.insert_task(&NewTask {
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            status: draft.status.unwrap_or_default(),
            priority: draft.priority.unwrap_or_default(),
            is_subtask: true,
            parent_task_id: Some(parent_id),
            owner_user_id: owner,
        })?;

        debug!(task_id = subtask.id, parent_id, owner, "created subtask");
        Ok(subtask)
    }

    /// Full replace of a task's mutable fields. Subtasks are never replaced
    /// by an update; they are carried over from the stored record.
    ///
    /// A missing status or priority in the draft keeps the stored value.
    pub fn update(&self, id: TaskId, draft: &TaskDraft, owner: UserId) -> ApiResult<()> {
        let existing = self.load(id)?;
        assert_owned(&existing, owner)?;

        validate_draft(draft)?;

        let new_status = draft.status.unwrap_or(existing.status);
        self.check_completion_gate(&existing, new_status)?;

        let updated = Task {
            title: draft.title.clone(),
            description: draft.description.clone(),
            due_date: draft.due_date,
            status: new_status,
            priority: draft.priority.unwrap_or(existing.priority),
            ..existing
        };
        self.db.replace_task(&updated)?;

        debug!(task_id = id, owner, "replaced task");
        Ok(())
    }

    /// Update only the status, subject to the completion gate.
    pub fn update_status(
        &self,
        new_status: TaskStatus,
        id: TaskId,
        owner: UserId,
    ) -> ApiResult<Task> {
        let existing = self.load(id)?;
        assert_owned(&existing, owner)?;

        self.check_completion_gate(&existing, new_status)?;

        self.db.set_task_status(id, new_status)?;

        debug!(task_id = id, status = new_status.as_str(), "updated status");
        Ok(Task {
            status: new_status,
            ..existing
        })
    }

    /// Delete a task. Top-level tasks take all of their subtasks with them
    /// in the same transaction.
    pub fn delete(&self, id: TaskId, owner: UserId) -> ApiResult<()> {
        let existing = self.load(id)?;
        assert_owned(&existing, owner)?;

        self.db.delete_task_cascading(id)?;

        debug!(task_id = id, owner, "deleted task");
        Ok(())
    }

    /// Paged listing of the caller's top-level tasks.
    ///
    /// The filter contributes the top-level clause plus any optional
    /// criteria; ownership scoping is conjoined here.
    pub fn find_all(
        &self,
        filter: &TaskFilter,
        sort: SortRequest,
        page: PageRequest,
        owner: UserId,
    ) -> ApiResult<Page<Task>> {
        let (mut where_sql, mut bind) = filter.where_clause(self.tz);
        where_sql.push_str(" AND owner_user_id = ?");
        bind.push(Value::Integer(owner));

        let size = page.size.clamp(1, MAX_PAGE_SIZE);
        let offset = page.page.saturating_mul(size);

        let total = self.db.count_tasks(&where_sql, &bind)?;
        let tasks = self
            .db
            .list_tasks(&where_sql, &bind, &sort.order_clause(), size, offset)?;

        Ok(Page::new(tasks, page.page, size, total))
    }

    fn load(&self, id: TaskId) -> ApiResult<Task> {
        self.db
            .get_task(id)?
            .ok_or_else(|| ApiError::task_not_found(id))
    }

    /// I2: a top-level task may not reach `DONE` while any subtask is
    /// incomplete. Subtasks and non-DONE targets pass unconditionally.
    fn check_completion_gate(&self, task: &Task, new_status: TaskStatus) -> ApiResult<()> {
        if new_status == TaskStatus::Done && !task.is_subtask && !task.all_subtasks_done() {
            return Err(ApiError::incomplete_subtasks(task.id));
        }
        Ok(())
    }
}

/// Basic field validation, a precondition of every create/replace.
fn validate_draft(draft: &TaskDraft) -> ApiResult<()> {
    if draft.title.trim().is_empty() {
        return Err(ApiError::invalid_value("title", "title must not be blank"));
    }
    if let Some(due) = draft.due_date {
        if due.timestamp_millis() < now_ms() {
            return Err(ApiError::invalid_value(
                "dueDate",
                "due date must not be in the past",
            ));
        }
    }
    Ok(())
}
