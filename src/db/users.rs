//! User persistence: registration inserts and credential lookups.

use super::{now_ms, Database};
use crate::types::{Role, User, UserId};
use anyhow::Result;
use rusqlite::{params, Row};

/// Fields for a user insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
    pub role: Role,
}

fn parse_user_row(row: &Row) -> rusqlite::Result<User> {
    let id: UserId = row.get("id")?;
    let login: String = row.get("login")?;
    let password_hash: String = row.get("password_hash")?;
    let role: String = row.get("role")?;
    let created_at: i64 = row.get("created_at")?;

    Ok(User {
        id,
        login,
        password_hash,
        role: Role::parse(&role).unwrap_or_default(),
        created_at,
    })
}

impl Database {
    /// Insert a user and return it with its assigned id.
    pub fn insert_user(&self, new: &NewUser) -> Result<User> {
        let now = now_ms();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (login, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![&new.login, &new.password_hash, new.role.as_str(), now],
            )?;

            Ok(User {
                id: conn.last_insert_rowid(),
                login: new.login.clone(),
                password_hash: new.password_hash.clone(),
                role: new.role,
                created_at: now,
            })
        })
    }

    /// Look up a user by login.
    pub fn find_user_by_login(&self, login: &str) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users WHERE login = ?1")?;

            match stmt.query_row(params![login], parse_user_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Look up a user by id.
    pub fn find_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM users WHERE id = ?1")?;

            match stmt.query_row(params![user_id], parse_user_row) {
                Ok(user) => Ok(Some(user)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }
}
