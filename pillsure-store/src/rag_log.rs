//! Logged recommendation queries (the RAG proxy's database side effect).

use chrono::{DateTime, Utc};
use rusqlite::params;

use crate::db::{Db, encode_ts};
use crate::error::Result;

impl Db {
    pub fn insert_rag_query(
        &self,
        query: &str,
        rewritten_query: Option<&str>,
        retrieved_documents: Option<&serde_json::Value>,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO rag_queries (query, rewritten_query, retrieved_documents, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                query,
                rewritten_query,
                retrieved_documents
                    .map(serde_json::to_string)
                    .transpose()?,
                encode_ts(&now),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn count_rag_queries(&self) -> Result<u64> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM rag_queries", [], |row| row.get(0))?)
    }
}
