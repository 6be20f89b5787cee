//! SQLite-backed store for the PillSure domain.
//!
//! One database file, one table per entity. All timestamps are RFC3339
//! TEXT; JSON-array columns hold serde_json documents. The onboarding flow
//! writes the profile row and the user's step/completion flags inside a
//! single transaction via [`Db::in_transaction`].

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Transaction};
use serde::de::DeserializeOwned;
use std::ops::Deref;
use std::path::Path;
use std::sync::Mutex;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    role TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    is_email_verified INTEGER NOT NULL DEFAULT 0,
    onboarding_step INTEGER NOT NULL DEFAULT 0,
    is_onboarding_complete INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    gender TEXT,
    mobile TEXT,
    date_of_birth TEXT,
    address TEXT,
    blood_group TEXT,
    has_covid INTEGER NOT NULL DEFAULT 0,
    past_medical_history TEXT NOT NULL DEFAULT '[]',
    surgical_history TEXT,
    allergies TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS doctors (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    gender TEXT,
    mobile TEXT,
    address TEXT,
    specializations TEXT NOT NULL DEFAULT '[]',
    qualifications TEXT NOT NULL DEFAULT '[]',
    experience_years INTEGER,
    satisfaction_rate TEXT NOT NULL DEFAULT '0.00',
    hospital_id TEXT REFERENCES hospitals(id) ON DELETE SET NULL,
    image TEXT,
    fee_pkr TEXT,
    consultation_modes TEXT NOT NULL DEFAULT '[]',
    opening_time TEXT,
    closing_time TEXT,
    available_days TEXT NOT NULL DEFAULT '[]',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_doctors_experience ON doctors(experience_years);
CREATE INDEX IF NOT EXISTS idx_doctors_hospital ON doctors(hospital_id);

CREATE TABLE IF NOT EXISTS hospitals (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
    hospital_name TEXT,
    hospital_address TEXT,
    hospital_contact_no TEXT,
    hospital_email TEXT UNIQUE,
    website TEXT,
    license_no TEXT,
    admin_name TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS medicines (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    medicine_name TEXT NOT NULL,
    medicine_url TEXT,
    price TEXT,
    discount TEXT,
    stock INTEGER,
    images TEXT NOT NULL DEFAULT '[]',
    prescription_required INTEGER NOT NULL DEFAULT 0,
    drug_category TEXT,
    drug_varient TEXT,
    description TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_medicines_name ON medicines(medicine_name);
CREATE INDEX IF NOT EXISTS idx_medicines_category ON medicines(drug_category);
CREATE INDEX IF NOT EXISTS idx_medicines_stock ON medicines(stock);

CREATE TABLE IF NOT EXISTS appointments (
    id TEXT PRIMARY KEY,
    patient_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
    appointment_date TEXT NOT NULL,
    appointment_time TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    consultation_mode TEXT NOT NULL,
    patient_notes TEXT,
    doctor_notes TEXT,
    prescription TEXT,
    diagnosis TEXT,
    cancellation_reason TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_appointments_patient ON appointments(patient_id);
CREATE INDEX IF NOT EXISTS idx_appointments_doctor ON appointments(doctor_id);
CREATE INDEX IF NOT EXISTS idx_appointments_date ON appointments(appointment_date);
-- Closes the check-then-insert race: two concurrent bookings for the same
-- active pending/confirmed slot cannot both commit.
CREATE UNIQUE INDEX IF NOT EXISTS uq_appointments_slot
    ON appointments(doctor_id, appointment_date, appointment_time)
    WHERE status IN ('pending', 'confirmed') AND is_active = 1;

CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    doctor_id TEXT NOT NULL REFERENCES doctors(id) ON DELETE CASCADE,
    rating INTEGER NOT NULL,
    comment TEXT,
    created_at TEXT NOT NULL,
    UNIQUE (user_id, doctor_id)
);
CREATE INDEX IF NOT EXISTS idx_reviews_doctor ON reviews(doctor_id);

CREATE TABLE IF NOT EXISTS specializations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT
);

CREATE TABLE IF NOT EXISTS rag_queries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    query TEXT NOT NULL,
    rewritten_query TEXT,
    embedding_cost TEXT,
    rewritten_query_cost TEXT,
    total_cost TEXT,
    retrieved_documents TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_rag_queries_created_at ON rag_queries(created_at);
";

/// SQLite-backed store.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    /// Open the database (create schema if not exists).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL for read-write concurrency, and enforce foreign keys.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    /// Execute multiple operations atomically within an SQLite transaction.
    pub fn in_transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&TxOps<'_>) -> Result<T>,
    {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        let ops = TxOps { tx: &tx };
        let result = f(&ops)?;
        tx.commit()?;
        Ok(result)
    }
}

/// Operations available within a transaction. Methods are added by the
/// entity modules next to their `Db` counterparts.
pub struct TxOps<'a> {
    tx: &'a Transaction<'a>,
}

impl<'a> TxOps<'a> {
    pub(crate) fn conn(&self) -> &Connection {
        self.tx.deref()
    }
}

// --- row decoding helpers shared by the entity modules ---

pub(crate) fn decode_json<T: DeserializeOwned>(idx: usize, raw: String) -> rusqlite::Result<T> {
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn decode_json_opt<T: DeserializeOwned>(
    idx: usize,
    raw: Option<String>,
) -> rusqlite::Result<Option<T>> {
    raw.map(|s| decode_json(idx, s)).transpose()
}

pub(crate) fn decode_ts(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

pub(crate) fn encode_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

pub(crate) fn encode_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    #[test]
    fn test_open_creates_schema() {
        let db = Db::open(":memory:").unwrap();
        let conn = db.lock();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
                 ('users','patients','doctors','hospitals','medicines','appointments','reviews','specializations','rag_queries')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 9);
    }

    #[test]
    fn test_open_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pillsure.sqlite");
        drop(Db::open(&path).unwrap());
        // Re-opening an existing database must not fail.
        Db::open(&path).unwrap();
    }

    #[test]
    fn test_in_transaction_rolls_back_on_error() {
        let db = Db::open(":memory:").unwrap();
        let result: Result<()> = db.in_transaction(|tx| {
            tx.conn().execute(
                "INSERT INTO specializations (name) VALUES ('Cardiology')",
                [],
            )?;
            Err(StoreError::Other("forced error".into()))
        });
        assert!(result.is_err());

        let conn = db.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM specializations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_slot_unique_index_only_guards_live_slots() {
        let db = Db::open(":memory:").unwrap();
        let conn = db.lock();
        conn.execute_batch(
            "INSERT INTO users (id, email, first_name, last_name, role, created_at, updated_at)
             VALUES ('u1', 'p@x.y', 'P', 'Q', 'patient', '2026-08-06T00:00:00Z', '2026-08-06T00:00:00Z'),
                    ('u2', 'd@x.y', 'D', 'R', 'doctor', '2026-08-06T00:00:00Z', '2026-08-06T00:00:00Z');
             INSERT INTO doctors (id, user_id, created_at, updated_at)
             VALUES ('d1', 'u2', '2026-08-06T00:00:00Z', '2026-08-06T00:00:00Z');",
        )
        .unwrap();
        let insert = |id: &str, status: &str| {
            conn.execute(
                "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, appointment_time, status, consultation_mode, created_at, updated_at)
                 VALUES (?, 'u1', 'd1', '2026-09-01', '10:30 AM', ?, 'online', '2026-08-06T00:00:00Z', '2026-08-06T00:00:00Z')",
                rusqlite::params![id, status],
            )
        };
        insert("a1", "pending").unwrap();
        // Same live slot: rejected by the partial unique index.
        assert!(insert("a2", "pending").is_err());
        // Cancelled rows do not occupy the slot.
        insert("a3", "cancelled").unwrap();
    }
}
