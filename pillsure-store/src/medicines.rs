//! Medicine catalog rows.

use pillsure_core::model::{Medicine, MedicineUpdate};
use rusqlite::{Row, params};

use crate::db::{Db, decode_json, decode_json_opt, decode_ts, encode_json, encode_ts};
use crate::error::Result;

const MEDICINE_COLUMNS: &str = "id, medicine_name, medicine_url, price, discount, stock, images, \
     prescription_required, drug_category, drug_varient, description, created_at";

fn row_to_medicine(row: &Row<'_>) -> rusqlite::Result<Medicine> {
    Ok(Medicine {
        id: row.get(0)?,
        medicine_name: row.get(1)?,
        medicine_url: row.get(2)?,
        price: row.get(3)?,
        discount: row.get(4)?,
        stock: row.get(5)?,
        images: decode_json(6, row.get(6)?)?,
        prescription_required: row.get(7)?,
        drug_category: row.get(8)?,
        drug_varient: row.get(9)?,
        description: decode_json_opt(10, row.get(10)?)?,
        created_at: decode_ts(11, row.get(11)?)?,
    })
}

impl Db {
    /// Insert a medicine; the `id` field of the argument is ignored and the
    /// generated rowid is returned.
    pub fn insert_medicine(&self, medicine: &Medicine) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO medicines (medicine_name, medicine_url, price, discount, stock, images, \
             prescription_required, drug_category, drug_varient, description, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                medicine.medicine_name,
                medicine.medicine_url,
                medicine.price,
                medicine.discount,
                medicine.stock,
                encode_json(&medicine.images)?,
                medicine.prescription_required,
                medicine.drug_category,
                medicine.drug_varient,
                medicine
                    .description
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                encode_ts(&medicine.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn medicine_by_id(&self, id: i64) -> Result<Option<Medicine>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medicines WHERE id = ?",
            MEDICINE_COLUMNS
        ))?;
        match stmt.query_row(params![id], row_to_medicine) {
            Ok(medicine) => Ok(Some(medicine)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Fetch medicines for a set of ids (duplicates and non-positive ids are
    /// dropped). Order follows the database, not the input.
    pub fn medicines_by_ids(&self, ids: &[i64]) -> Result<Vec<Medicine>> {
        let mut unique: Vec<i64> = ids.iter().copied().filter(|id| *id > 0).collect();
        unique.sort_unstable();
        unique.dedup();
        if unique.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.lock();
        let placeholders = vec!["?"; unique.len()].join(", ");
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM medicines WHERE id IN ({})",
            MEDICINE_COLUMNS, placeholders
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(unique.iter()), row_to_medicine)?;
        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?);
        }
        Ok(medicines)
    }

    /// Name-substring search, newest first.
    pub fn list_medicines(
        &self,
        search: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<Medicine>, u64)> {
        let conn = self.lock();
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let mut medicines = Vec::new();
        let total: u64;
        match &pattern {
            Some(p) => {
                total = conn.query_row(
                    "SELECT COUNT(*) FROM medicines WHERE medicine_name LIKE ?",
                    params![p],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM medicines WHERE medicine_name LIKE ? \
                     ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    MEDICINE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![p, limit, offset as i64], row_to_medicine)?;
                for row in rows {
                    medicines.push(row?);
                }
            }
            None => {
                total = conn.query_row("SELECT COUNT(*) FROM medicines", [], |row| row.get(0))?;
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM medicines ORDER BY created_at DESC LIMIT ? OFFSET ?",
                    MEDICINE_COLUMNS
                ))?;
                let rows = stmt.query_map(params![limit, offset as i64], row_to_medicine)?;
                for row in rows {
                    medicines.push(row?);
                }
            }
        }
        Ok((medicines, total))
    }

    /// Newest in-stock medicine per drug category, newest categories first.
    pub fn featured_medicines(&self, limit: u32) -> Result<Vec<Medicine>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "WITH latest_in_category AS (
                 SELECT {}, ROW_NUMBER() OVER (
                     PARTITION BY drug_category ORDER BY created_at DESC
                 ) AS rn
                 FROM medicines
                 WHERE stock > 0 AND drug_category IS NOT NULL
             )
             SELECT {} FROM latest_in_category WHERE rn = 1
             ORDER BY created_at DESC LIMIT ?",
            MEDICINE_COLUMNS, MEDICINE_COLUMNS
        ))?;
        let rows = stmt.query_map(params![limit], row_to_medicine)?;
        let mut medicines = Vec::new();
        for row in rows {
            medicines.push(row?);
        }
        Ok(medicines)
    }

    /// Merge-style metadata update; only provided keys change. Returns the
    /// updated row, or None when the medicine does not exist.
    pub fn update_medicine(&self, id: i64, update: &MedicineUpdate) -> Result<Option<Medicine>> {
        let Some(mut medicine) = self.medicine_by_id(id)? else {
            return Ok(None);
        };

        if let Some(v) = &update.medicine_name {
            medicine.medicine_name = v.clone();
        }
        if let Some(v) = &update.medicine_url {
            medicine.medicine_url = Some(v.clone());
        }
        if let Some(v) = update.price {
            medicine.price = Some(format!("{:.2}", v));
        }
        if let Some(v) = update.discount {
            medicine.discount = Some(format!("{:.2}", v));
        }
        if let Some(v) = update.stock {
            medicine.stock = Some(v);
        }
        if let Some(v) = update.prescription_required {
            medicine.prescription_required = v;
        }
        if let Some(v) = &update.drug_category {
            medicine.drug_category = Some(v.clone());
        }
        if let Some(v) = &update.drug_varient {
            medicine.drug_varient = Some(v.clone());
        }
        if let Some(v) = &update.description {
            medicine.description = Some(v.clone());
        }

        let conn = self.lock();
        conn.execute(
            "UPDATE medicines SET medicine_name = ?, medicine_url = ?, price = ?, discount = ?, \
             stock = ?, prescription_required = ?, drug_category = ?, drug_varient = ?, \
             description = ? WHERE id = ?",
            params![
                medicine.medicine_name,
                medicine.medicine_url,
                medicine.price,
                medicine.discount,
                medicine.stock,
                medicine.prescription_required,
                medicine.drug_category,
                medicine.drug_varient,
                medicine
                    .description
                    .as_ref()
                    .map(serde_json::to_string)
                    .transpose()?,
                id,
            ],
        )?;
        Ok(Some(medicine))
    }

    pub fn set_medicine_images(&self, id: i64, images: &[String]) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE medicines SET images = ? WHERE id = ?",
            params![encode_json(&images)?, id],
        )?;
        Ok(rows > 0)
    }

    pub fn count_medicines(&self) -> Result<(u64, u64)> {
        let conn = self.lock();
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM medicines", [], |row| row.get(0))?;
        let in_stock: u64 = conn.query_row(
            "SELECT COUNT(*) FROM medicines WHERE stock > 0",
            [],
            |row| row.get(0),
        )?;
        Ok((total, in_stock))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::medicine;

    #[test]
    fn test_insert_and_get() {
        let db = Db::open(":memory:").unwrap();
        let id = db.insert_medicine(&medicine("Panadol", Some("Analgesic"), Some(50)))
            .unwrap();

        let loaded = db.medicine_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.medicine_name, "Panadol");
        assert_eq!(loaded.stock, Some(50));
        assert!(loaded.images.is_empty());

        assert!(db.medicine_by_id(9999).unwrap().is_none());
    }

    #[test]
    fn test_medicines_by_ids_dedups_and_filters() {
        let db = Db::open(":memory:").unwrap();
        let a = db.insert_medicine(&medicine("A", None, Some(1))).unwrap();
        let b = db.insert_medicine(&medicine("B", None, Some(1))).unwrap();

        let found = db.medicines_by_ids(&[a, a, b, -1, 0, 9999]).unwrap();
        assert_eq!(found.len(), 2);

        assert!(db.medicines_by_ids(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_search_by_name() {
        let db = Db::open(":memory:").unwrap();
        db.insert_medicine(&medicine("Panadol Extra", None, Some(5)))
            .unwrap();
        db.insert_medicine(&medicine("Brufen", None, Some(5))).unwrap();

        let (hits, total) = db.list_medicines(Some("panadol"), 10, 0).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].medicine_name, "Panadol Extra");
    }

    #[test]
    fn test_featured_one_per_category_in_stock_only() {
        let db = Db::open(":memory:").unwrap();
        db.insert_medicine(&medicine("Old Analgesic", Some("Analgesic"), Some(5)))
            .unwrap();
        db.insert_medicine(&medicine("Out of stock", Some("Antibiotic"), Some(0)))
            .unwrap();
        db.insert_medicine(&medicine("Cough Syrup", Some("Antitussive"), Some(3)))
            .unwrap();
        db.insert_medicine(&medicine("Uncategorized", None, Some(9)))
            .unwrap();

        let featured = db.featured_medicines(6).unwrap();
        let names: Vec<&str> = featured.iter().map(|m| m.medicine_name.as_str()).collect();
        assert!(names.contains(&"Old Analgesic"));
        assert!(names.contains(&"Cough Syrup"));
        assert!(!names.contains(&"Out of stock"));
        assert!(!names.contains(&"Uncategorized"));
    }

    #[test]
    fn test_update_medicine_is_partial() {
        let db = Db::open(":memory:").unwrap();
        let id = db.insert_medicine(&medicine("Panadol", Some("Analgesic"), Some(5)))
            .unwrap();

        let update = MedicineUpdate {
            price: Some(12.5),
            stock: Some(80),
            ..Default::default()
        };
        let updated = db.update_medicine(id, &update).unwrap().unwrap();
        assert_eq!(updated.price.as_deref(), Some("12.50"));
        assert_eq!(updated.stock, Some(80));
        assert_eq!(updated.medicine_name, "Panadol");
        assert_eq!(updated.drug_category.as_deref(), Some("Analgesic"));

        assert!(db.update_medicine(777, &update).unwrap().is_none());
    }

    #[test]
    fn test_set_images() {
        let db = Db::open(":memory:").unwrap();
        let id = db.insert_medicine(&medicine("Panadol", None, Some(5))).unwrap();
        let urls = vec!["http://x/a.png".to_string(), "http://x/b.png".to_string()];
        assert!(db.set_medicine_images(id, &urls).unwrap());

        let loaded = db.medicine_by_id(id).unwrap().unwrap();
        assert_eq!(loaded.images, urls);
    }
}
