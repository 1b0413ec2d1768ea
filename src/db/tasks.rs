//! Task CRUD, child lookup, and filtered listing.

use super::{now_ms, Database};
use crate::types::{Priority, Task, TaskId, TaskStatus, UserId};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, types::Value, Connection, Row};

/// Fields for a task insert. The id and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub is_subtask: bool,
    pub parent_task_id: Option<TaskId>,
    pub owner_user_id: UserId,
}

fn due_date_to_ms(due_date: &Option<DateTime<Utc>>) -> Option<i64> {
    due_date.as_ref().map(|d| d.timestamp_millis())
}

pub(crate) fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let id: TaskId = row.get("id")?;
    let title: String = row.get("title")?;
    let description: Option<String> = row.get("description")?;
    let due_date_ms: Option<i64> = row.get("due_date")?;
    let status: String = row.get("status")?;
    let priority: String = row.get("priority")?;
    let is_subtask: bool = row.get("is_subtask")?;
    let parent_task_id: Option<TaskId> = row.get("parent_task_id")?;
    let owner_user_id: UserId = row.get("owner_user_id")?;
    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;

    Ok(Task {
        id,
        title,
        description,
        due_date: due_date_ms.and_then(DateTime::from_timestamp_millis),
        status: TaskStatus::parse(&status).unwrap_or_default(),
        priority: Priority::parse(&priority).unwrap_or_default(),
        is_subtask,
        parent_task_id,
        subtasks: Vec::new(),
        owner_user_id,
        created_at,
        updated_at,
    })
}

/// Internal helper to get a task using an existing connection.
fn get_task_internal(conn: &Connection, task_id: TaskId) -> Result<Option<Task>> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE id = ?1")?;

    match stmt.query_row(params![task_id], parse_task_row) {
        Ok(task) => Ok(Some(task)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Direct children of a task, oldest first.
fn subtasks_of(conn: &Connection, parent_id: TaskId) -> Result<Vec<Task>> {
    let mut stmt =
        conn.prepare("SELECT * FROM tasks WHERE parent_task_id = ?1 ORDER BY id")?;

    let tasks = stmt
        .query_map(params![parent_id], parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(tasks)
}

impl Database {
    /// Insert a task and return it with its assigned id.
    pub fn insert_task(&self, new: &NewTask) -> Result<Task> {
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (
                    title, description, due_date, status, priority,
                    is_subtask, parent_task_id, owner_user_id, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    &new.title,
                    &new.description,
                    due_date_to_ms(&new.due_date),
                    new.status.as_str(),
                    new.priority.as_str(),
                    new.is_subtask,
                    new.parent_task_id,
                    new.owner_user_id,
                    now,
                    now,
                ],
            )?;

            let id = conn.last_insert_rowid();

            Ok(Task {
                id,
                title: new.title.clone(),
                description: new.description.clone(),
                due_date: new.due_date,
                status: new.status,
                priority: new.priority,
                is_subtask: new.is_subtask,
                parent_task_id: new.parent_task_id,
                subtasks: Vec::new(),
                owner_user_id: new.owner_user_id,
                created_at: now,
                updated_at: now,
            })
        })
    }

    /// Get a task by id. Top-level tasks come back with their subtasks attached.
    pub fn get_task(&self, task_id: TaskId) -> Result<Option<Task>> {
        self.with_conn(|conn| {
            let task = get_task_internal(conn, task_id)?;
            match task {
                None => Ok(None),
                Some(mut task) => {
                    if !task.is_subtask {
                        task.subtasks = subtasks_of(conn, task.id)?;
                    }
                    Ok(Some(task))
                }
            }
        })
    }

    /// Overwrite the mutable columns of an existing task.
    ///
    /// Hierarchy flags, parent, and owner are deliberately not part of the
    /// update; they are immutable after creation.
    pub fn replace_task(&self, task: &Task) -> Result<()> {
        let now = now_ms();

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks
                 SET title = ?1, description = ?2, due_date = ?3,
                     status = ?4, priority = ?5, updated_at = ?6
                 WHERE id = ?7",
                params![
                    &task.title,
                    &task.description,
                    due_date_to_ms(&task.due_date),
                    task.status.as_str(),
                    task.priority.as_str(),
                    now,
                    task.id,
                ],
            )?;

            if changed == 0 {
                return Err(anyhow!("no task with id {}", task.id));
            }
            Ok(())
        })
    }

    /// Set only the status column.
    pub fn set_task_status(&self, task_id: TaskId, status: TaskStatus) -> Result<()> {
        let now = now_ms();

        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), now, task_id],
            )?;

            if changed == 0 {
                return Err(anyhow!("no task with id {}", task_id));
            }
            Ok(())
        })
    }

    /// Delete a task and all of its subtasks in one transaction.
    ///
    /// Either the whole tree disappears or nothing does; orphaned subtasks
    /// are never observable.
    pub fn delete_task_cascading(&self, task_id: TaskId) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                "DELETE FROM tasks WHERE parent_task_id = ?1",
                params![task_id],
            )?;
            tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;

            tx.commit()?;
            Ok(())
        })
    }

    /// List tasks matching a prebuilt WHERE clause, with attached subtasks.
    ///
    /// `where_sql` and `order_sql` come from the filter builder, which only
    /// emits whitelisted column expressions; values are always bound.
    pub fn list_tasks(
        &self,
        where_sql: &str,
        bind: &[Value],
        order_sql: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Task>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT * FROM tasks WHERE {} ORDER BY {} LIMIT {} OFFSET {}",
                where_sql, order_sql, limit, offset
            );
            let mut stmt = conn.prepare(&sql)?;

            let mut tasks = stmt
                .query_map(params_from_iter(bind.iter()), parse_task_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            for task in &mut tasks {
                if !task.is_subtask {
                    task.subtasks = subtasks_of(conn, task.id)?;
                }
            }

            Ok(tasks)
        })
    }

    /// Count tasks matching a prebuilt WHERE clause.
    pub fn count_tasks(&self, where_sql: &str, bind: &[Value]) -> Result<i64> {
        self.with_conn(|conn| {
            let sql = format!("SELECT COUNT(*) FROM tasks WHERE {}", where_sql);
            let count: i64 =
                conn.query_row(&sql, params_from_iter(bind.iter()), |row| row.get(0))?;
            Ok(count)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::users::NewUser;

    fn test_db() -> (Database, UserId) {
        let db = Database::open_in_memory().unwrap();
        let user = db
            .insert_user(&NewUser {
                login: "tester".into(),
                password_hash: "x".into(),
                role: crate::types::Role::User,
            })
            .unwrap();
        (db, user.id)
    }

    fn draft(title: &str, owner: UserId) -> NewTask {
        NewTask {
            title: title.into(),
            description: None,
            due_date: None,
            status: TaskStatus::ToDo,
            priority: Priority::Medium,
            is_subtask: false,
            parent_task_id: None,
            owner_user_id: owner,
        }
    }

    #[test]
    fn test_insert_and_get_round_trip() {
        let (db, owner) = test_db();
        let created = db.insert_task(&draft("write docs", owner)).unwrap();
        assert!(created.id > 0);

        let loaded = db.get_task(created.id).unwrap().unwrap();
        assert_eq!(loaded.title, "write docs");
        assert_eq!(loaded.status, TaskStatus::ToDo);
        assert!(!loaded.is_subtask);
        assert!(loaded.subtasks.is_empty());
    }

    #[test]
    fn test_get_attaches_subtasks() {
        let (db, owner) = test_db();
        let parent = db.insert_task(&draft("parent", owner)).unwrap();

        let mut child = draft("child", owner);
        child.is_subtask = true;
        child.parent_task_id = Some(parent.id);
        db.insert_task(&child).unwrap();

        let loaded = db.get_task(parent.id).unwrap().unwrap();
        assert_eq!(loaded.subtasks.len(), 1);
        assert_eq!(loaded.subtasks[0].title, "child");
        assert_eq!(loaded.subtasks[0].parent_task_id, Some(parent.id));
    }

    #[test]
    fn test_cascading_delete_removes_children() {
        let (db, owner) = test_db();
        let parent = db.insert_task(&draft("parent", owner)).unwrap();
        let mut child = draft("child", owner);
        child.is_subtask = true;
        child.parent_task_id = Some(parent.id);
        let child = db.insert_task(&child).unwrap();

        db.delete_task_cascading(parent.id).unwrap();

        assert!(db.get_task(parent.id).unwrap().is_none());
        assert!(db.get_task(child.id).unwrap().is_none());
    }

    #[test]
    fn test_cascading_delete_leaves_other_trees() {
        let (db, owner) = test_db();
        let doomed = db.insert_task(&draft("doomed", owner)).unwrap();
        let kept = db.insert_task(&draft("kept", owner)).unwrap();
        let mut kept_child = draft("kept child", owner);
        kept_child.is_subtask = true;
        kept_child.parent_task_id = Some(kept.id);
        db.insert_task(&kept_child).unwrap();

        db.delete_task_cascading(doomed.id).unwrap();

        let kept = db.get_task(kept.id).unwrap().unwrap();
        assert_eq!(kept.subtasks.len(), 1);
    }

    #[test]
    fn test_replace_rejects_unknown_id() {
        let (db, owner) = test_db();
        let mut task = db.insert_task(&draft("t", owner)).unwrap();
        task.id = 9999;
        assert!(db.replace_task(&task).is_err());
    }

    #[test]
    fn test_due_date_survives_storage() {
        let (db, owner) = test_db();
        let due = DateTime::from_timestamp_millis(1_755_500_000_000).unwrap();
        let mut new = draft("deadline", owner);
        new.due_date = Some(due);
        let created = db.insert_task(&new).unwrap();

        let loaded = db.get_task(created.id).unwrap().unwrap();
        assert_eq!(loaded.due_date, Some(due));
    }
}
