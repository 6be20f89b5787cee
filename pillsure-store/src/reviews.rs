//! Doctor review rows.

use pillsure_core::model::Review;
use rusqlite::{Row, params};
use serde::Serialize;

use crate::db::{Db, decode_ts, encode_ts};
use crate::error::{Result, map_constraint};

const REVIEW_COLUMNS: &str = "r.id, r.user_id, r.doctor_id, r.rating, r.comment, r.created_at";

fn row_to_review(row: &Row<'_>) -> rusqlite::Result<Review> {
    Ok(Review {
        id: row.get(0)?,
        user_id: row.get(1)?,
        doctor_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        created_at: decode_ts(5, row.get(5)?)?,
    })
}

/// Review joined with the reviewer, as the doctor page shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewListing {
    #[serde(flatten)]
    pub review: Review,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl Db {
    /// One review per user per doctor; a second one trips the unique
    /// constraint and surfaces as `Conflict`.
    pub fn insert_review(&self, review: &Review) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO reviews (id, user_id, doctor_id, rating, comment, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                review.id,
                review.user_id,
                review.doctor_id,
                review.rating,
                review.comment,
                encode_ts(&review.created_at),
            ],
        )
        .map_err(|e| map_constraint(e, "You have already reviewed this doctor"))?;
        Ok(())
    }

    pub fn review_listing_by_id(&self, id: &str) -> Result<Option<ReviewListing>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {}, u.first_name, u.last_name, u.email
             FROM reviews r INNER JOIN users u ON r.user_id = u.id WHERE r.id = ?",
            REVIEW_COLUMNS
        ))?;
        let result = stmt.query_row(params![id], |row| {
            Ok(ReviewListing {
                review: row_to_review(row)?,
                first_name: row.get(6)?,
                last_name: row.get(7)?,
                email: row.get(8)?,
            })
        });
        match result {
            Ok(listing) => Ok(Some(listing)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn reviews_for_doctor(
        &self,
        doctor_id: &str,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<ReviewListing>, u64)> {
        let conn = self.lock();
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE doctor_id = ?",
            params![doctor_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, u.first_name, u.last_name, u.email
             FROM reviews r INNER JOIN users u ON r.user_id = u.id
             WHERE r.doctor_id = ? ORDER BY r.created_at DESC LIMIT ? OFFSET ?",
            REVIEW_COLUMNS
        ))?;
        let rows = stmt.query_map(params![doctor_id, limit, offset as i64], |row| {
            Ok(ReviewListing {
                review: row_to_review(row)?,
                first_name: row.get(6)?,
                last_name: row.get(7)?,
                email: row.get(8)?,
            })
        })?;
        let mut listings = Vec::new();
        for row in rows {
            listings.push(row?);
        }
        Ok((listings, total))
    }

    pub fn average_rating(&self, doctor_id: &str) -> Result<Option<f64>> {
        let conn = self.lock();
        Ok(conn.query_row(
            "SELECT AVG(rating) FROM reviews WHERE doctor_id = ?",
            params![doctor_id],
            |row| row.get(0),
        )?)
    }
}
