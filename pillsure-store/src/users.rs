//! User rows: accounts, credentials, and onboarding flags.

use chrono::{DateTime, Utc};
use pillsure_core::model::{User, UserRole};
use pillsure_core::onboarding::OnboardingStatus;
use rusqlite::{Connection, Row, params};

use crate::db::{Db, TxOps, decode_ts, encode_ts};
use crate::error::{Result, map_constraint};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, role, is_active, \
     is_email_verified, onboarding_step, is_onboarding_complete, created_at, updated_at";

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    let role_raw: String = row.get(5)?;
    let role = UserRole::parse(&role_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown role: {}", role_raw).into(),
        )
    })?;
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        password_hash: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        role,
        is_active: row.get(6)?,
        is_email_verified: row.get(7)?,
        onboarding_step: row.get(8)?,
        is_onboarding_complete: row.get(9)?,
        created_at: decode_ts(10, row.get(10)?)?,
        updated_at: decode_ts(11, row.get(11)?)?,
    })
}

fn set_onboarding_on(
    conn: &Connection,
    user_id: &str,
    status: OnboardingStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let rows = conn.execute(
        "UPDATE users SET onboarding_step = ?, is_onboarding_complete = ?, updated_at = ? WHERE id = ?",
        params![
            status.onboarding_step,
            status.is_onboarding_complete,
            encode_ts(&now),
            user_id
        ],
    )?;
    Ok(rows > 0)
}

impl Db {
    pub fn insert_user(&self, user: &User) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, role, is_active, \
             is_email_verified, onboarding_step, is_onboarding_complete, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user.id,
                user.email,
                user.password_hash,
                user.first_name,
                user.last_name,
                user.role.as_str(),
                user.is_active,
                user.is_email_verified,
                user.onboarding_step,
                user.is_onboarding_complete,
                encode_ts(&user.created_at),
                encode_ts(&user.updated_at),
            ],
        )
        .map_err(|e| map_constraint(e, "User with this email already exists"))?;
        Ok(())
    }

    pub fn user_by_id(&self, id: &str) -> Result<Option<User>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))?;
        match stmt.query_row(params![id], row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))?;
        match stmt.query_row(params![email], row_to_user) {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Partial profile update; only provided names change.
    pub fn update_user_names(
        &self,
        user_id: &str,
        first_name: Option<&str>,
        last_name: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE users SET first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name), updated_at = ? WHERE id = ?",
            params![first_name, last_name, encode_ts(&now), user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn set_onboarding(
        &self,
        user_id: &str,
        status: OnboardingStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        set_onboarding_on(&conn, user_id, status, now)
    }

    /// Explicit step update (PUT /api/onboarding/step) without touching the
    /// completion flag.
    pub fn set_onboarding_step(&self, user_id: &str, step: i64, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE users SET onboarding_step = ?, updated_at = ? WHERE id = ?",
            params![step, encode_ts(&now), user_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_users(
        &self,
        search: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<User>, u64)> {
        let conn = self.lock();
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let (where_clause, filter) = match &pattern {
            Some(p) => (
                "WHERE email LIKE ?1 OR first_name LIKE ?1 OR last_name LIKE ?1",
                Some(p.as_str()),
            ),
            None => ("", None),
        };

        let total: u64 = match filter {
            Some(p) => conn.query_row(
                &format!("SELECT COUNT(*) FROM users {}", where_clause),
                params![p],
                |row| row.get(0),
            )?,
            None => conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?,
        };

        let mut users = Vec::new();
        match filter {
            Some(p) => {
                let sql = format!(
                    "SELECT {} FROM users {} ORDER BY created_at DESC LIMIT ?2 OFFSET ?3",
                    USER_COLUMNS, where_clause
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![p, limit, offset as i64], row_to_user)?;
                for user in rows {
                    users.push(user?);
                }
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM users ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    USER_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params![limit, offset as i64], row_to_user)?;
                for user in rows {
                    users.push(user?);
                }
            }
        }
        Ok((users, total))
    }

    pub fn count_users(&self) -> Result<(u64, u64)> {
        let conn = self.lock();
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        let active: u64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok((total, active))
    }

    pub fn user_counts_by_role(&self) -> Result<Vec<(String, u64)>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY role")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}

impl TxOps<'_> {
    pub fn set_onboarding(
        &self,
        user_id: &str,
        status: OnboardingStatus,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        set_onboarding_on(self.conn(), user_id, status, now)
    }
}
