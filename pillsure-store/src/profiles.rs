//! Role profile rows (patients, doctors, hospitals) plus the
//! specialization lookup table.

use chrono::{DateTime, Utc};
use pillsure_core::model::{DoctorProfile, HospitalProfile, PatientProfile, Specialization};
use rusqlite::{Connection, Row, params};
use serde::Serialize;

use crate::db::{Db, TxOps, decode_json, decode_ts, encode_json, encode_ts};
use crate::error::{Result, map_constraint};

const PATIENT_COLUMNS: &str = "id, user_id, gender, mobile, date_of_birth, address, blood_group, \
     has_covid, past_medical_history, surgical_history, allergies, is_active, created_at, updated_at";

const DOCTOR_COLUMNS: &str = "d.id, d.user_id, d.gender, d.mobile, d.address, d.specializations, \
     d.qualifications, d.experience_years, d.satisfaction_rate, d.hospital_id, d.image, d.fee_pkr, \
     d.consultation_modes, d.opening_time, d.closing_time, d.available_days, d.is_active, \
     d.created_at, d.updated_at";

const HOSPITAL_COLUMNS: &str = "h.id, h.user_id, h.hospital_name, h.hospital_address, \
     h.hospital_contact_no, h.hospital_email, h.website, h.license_no, h.admin_name, h.is_active, \
     h.created_at, h.updated_at";

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<PatientProfile> {
    Ok(PatientProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gender: row.get(2)?,
        mobile: row.get(3)?,
        date_of_birth: row.get(4)?,
        address: row.get(5)?,
        blood_group: row.get(6)?,
        has_covid: row.get(7)?,
        past_medical_history: decode_json(8, row.get(8)?)?,
        surgical_history: row.get(9)?,
        allergies: row.get(10)?,
        is_active: row.get(11)?,
        created_at: decode_ts(12, row.get(12)?)?,
        updated_at: decode_ts(13, row.get(13)?)?,
    })
}

fn row_to_doctor(row: &Row<'_>) -> rusqlite::Result<DoctorProfile> {
    Ok(DoctorProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        gender: row.get(2)?,
        mobile: row.get(3)?,
        address: row.get(4)?,
        specializations: decode_json(5, row.get(5)?)?,
        qualifications: decode_json(6, row.get(6)?)?,
        experience_years: row.get(7)?,
        satisfaction_rate: row.get(8)?,
        hospital_id: row.get(9)?,
        image: row.get(10)?,
        fee_pkr: row.get(11)?,
        consultation_modes: decode_json(12, row.get(12)?)?,
        opening_time: row.get(13)?,
        closing_time: row.get(14)?,
        available_days: decode_json(15, row.get(15)?)?,
        is_active: row.get(16)?,
        created_at: decode_ts(17, row.get(17)?)?,
        updated_at: decode_ts(18, row.get(18)?)?,
    })
}

fn row_to_hospital(row: &Row<'_>) -> rusqlite::Result<HospitalProfile> {
    Ok(HospitalProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        hospital_name: row.get(2)?,
        hospital_address: row.get(3)?,
        hospital_contact_no: row.get(4)?,
        hospital_email: row.get(5)?,
        website: row.get(6)?,
        license_no: row.get(7)?,
        admin_name: row.get(8)?,
        is_active: row.get(9)?,
        created_at: decode_ts(10, row.get(10)?)?,
        updated_at: decode_ts(11, row.get(11)?)?,
    })
}

// Upserts key on the row id (the caller always reuses the loaded row), with
// an explicit conflict clause so that *other* unique constraints, like the
// hospital email, still reject the write instead of replacing foreign rows.

fn upsert_patient_on(conn: &Connection, profile: &PatientProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO patients (id, user_id, gender, mobile, date_of_birth, address, \
         blood_group, has_covid, past_medical_history, surgical_history, allergies, is_active, \
         created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             gender = excluded.gender, mobile = excluded.mobile,
             date_of_birth = excluded.date_of_birth, address = excluded.address,
             blood_group = excluded.blood_group, has_covid = excluded.has_covid,
             past_medical_history = excluded.past_medical_history,
             surgical_history = excluded.surgical_history, allergies = excluded.allergies,
             is_active = excluded.is_active, updated_at = excluded.updated_at",
        params![
            profile.id,
            profile.user_id,
            profile.gender,
            profile.mobile,
            profile.date_of_birth,
            profile.address,
            profile.blood_group,
            profile.has_covid,
            encode_json(&profile.past_medical_history)?,
            profile.surgical_history,
            profile.allergies,
            profile.is_active,
            encode_ts(&profile.created_at),
            encode_ts(&profile.updated_at),
        ],
    )?;
    Ok(())
}

fn upsert_doctor_on(conn: &Connection, profile: &DoctorProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO doctors (id, user_id, gender, mobile, address, specializations, \
         qualifications, experience_years, satisfaction_rate, hospital_id, image, fee_pkr, \
         consultation_modes, opening_time, closing_time, available_days, is_active, created_at, \
         updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             gender = excluded.gender, mobile = excluded.mobile, address = excluded.address,
             specializations = excluded.specializations,
             qualifications = excluded.qualifications,
             experience_years = excluded.experience_years,
             satisfaction_rate = excluded.satisfaction_rate,
             hospital_id = excluded.hospital_id, image = excluded.image,
             fee_pkr = excluded.fee_pkr, consultation_modes = excluded.consultation_modes,
             opening_time = excluded.opening_time, closing_time = excluded.closing_time,
             available_days = excluded.available_days, is_active = excluded.is_active,
             updated_at = excluded.updated_at",
        params![
            profile.id,
            profile.user_id,
            profile.gender,
            profile.mobile,
            profile.address,
            encode_json(&profile.specializations)?,
            encode_json(&profile.qualifications)?,
            profile.experience_years,
            profile.satisfaction_rate,
            profile.hospital_id,
            profile.image,
            profile.fee_pkr,
            encode_json(&profile.consultation_modes)?,
            profile.opening_time,
            profile.closing_time,
            encode_json(&profile.available_days)?,
            profile.is_active,
            encode_ts(&profile.created_at),
            encode_ts(&profile.updated_at),
        ],
    )?;
    Ok(())
}

fn upsert_hospital_on(conn: &Connection, profile: &HospitalProfile) -> Result<()> {
    conn.execute(
        "INSERT INTO hospitals (id, user_id, hospital_name, hospital_address, \
         hospital_contact_no, hospital_email, website, license_no, admin_name, is_active, \
         created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(id) DO UPDATE SET
             hospital_name = excluded.hospital_name,
             hospital_address = excluded.hospital_address,
             hospital_contact_no = excluded.hospital_contact_no,
             hospital_email = excluded.hospital_email, website = excluded.website,
             license_no = excluded.license_no, admin_name = excluded.admin_name,
             is_active = excluded.is_active, updated_at = excluded.updated_at",
        params![
            profile.id,
            profile.user_id,
            profile.hospital_name,
            profile.hospital_address,
            profile.hospital_contact_no,
            profile.hospital_email,
            profile.website,
            profile.license_no,
            profile.admin_name,
            profile.is_active,
            encode_ts(&profile.created_at),
            encode_ts(&profile.updated_at),
        ],
    )
    .map_err(|e| map_constraint(e, "Hospital with this email already exists"))?;
    Ok(())
}

/// Doctor row joined with the owning user and (optionally) hospital, as the
/// admin console lists it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorListing {
    #[serde(flatten)]
    pub doctor: DoctorProfile,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub hospital_contact_no: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalListing {
    #[serde(flatten)]
    pub hospital: HospitalProfile,
    pub user_first_name: String,
    pub user_last_name: String,
    pub user_email: String,
}

impl Db {
    pub fn patient_by_user(&self, user_id: &str) -> Result<Option<PatientProfile>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM patients WHERE user_id = ?",
            PATIENT_COLUMNS
        ))?;
        match stmt.query_row(params![user_id], row_to_patient) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn doctor_by_user(&self, user_id: &str) -> Result<Option<DoctorProfile>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM doctors d WHERE d.user_id = ?",
            DOCTOR_COLUMNS
        ))?;
        match stmt.query_row(params![user_id], row_to_doctor) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn doctor_by_id(&self, id: &str) -> Result<Option<DoctorProfile>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM doctors d WHERE d.id = ?",
            DOCTOR_COLUMNS
        ))?;
        match stmt.query_row(params![id], row_to_doctor) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn hospital_by_user(&self, user_id: &str) -> Result<Option<HospitalProfile>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM hospitals h WHERE h.user_id = ?",
            HOSPITAL_COLUMNS
        ))?;
        match stmt.query_row(params![user_id], row_to_hospital) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn hospital_by_email(&self, email: &str) -> Result<Option<HospitalProfile>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM hospitals h WHERE h.hospital_email = ?",
            HOSPITAL_COLUMNS
        ))?;
        match stmt.query_row(params![email], row_to_hospital) {
            Ok(profile) => Ok(Some(profile)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn upsert_patient(&self, profile: &PatientProfile) -> Result<()> {
        let conn = self.lock();
        upsert_patient_on(&conn, profile)
    }

    pub fn upsert_doctor(&self, profile: &DoctorProfile) -> Result<()> {
        let conn = self.lock();
        upsert_doctor_on(&conn, profile)
    }

    pub fn upsert_hospital(&self, profile: &HospitalProfile) -> Result<()> {
        let conn = self.lock();
        upsert_hospital_on(&conn, profile)
    }

    pub fn update_doctor_satisfaction(
        &self,
        doctor_id: &str,
        rate: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE doctors SET satisfaction_rate = ?, updated_at = ? WHERE id = ?",
            params![rate, encode_ts(&now), doctor_id],
        )?;
        Ok(rows > 0)
    }

    pub fn list_doctors(
        &self,
        search: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<DoctorListing>, u64)> {
        let conn = self.lock();
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let base_from = "FROM doctors d \
             INNER JOIN users u ON d.user_id = u.id \
             LEFT JOIN hospitals h ON d.hospital_id = h.id";
        let where_clause = "WHERE u.first_name LIKE ?1 OR u.last_name LIKE ?1 \
             OR u.email LIKE ?1 OR d.mobile LIKE ?1 OR d.address LIKE ?1";

        let select = format!(
            "SELECT {}, u.first_name, u.last_name, u.email, h.hospital_name, h.hospital_address, \
             h.hospital_contact_no {}",
            DOCTOR_COLUMNS, base_from
        );

        let map_row = |row: &Row<'_>| -> rusqlite::Result<DoctorListing> {
            Ok(DoctorListing {
                doctor: row_to_doctor(row)?,
                first_name: row.get(19)?,
                last_name: row.get(20)?,
                email: row.get(21)?,
                hospital_name: row.get(22)?,
                hospital_address: row.get(23)?,
                hospital_contact_no: row.get(24)?,
            })
        };

        let mut listings = Vec::new();
        let total: u64;
        match &pattern {
            Some(p) => {
                total = conn.query_row(
                    &format!("SELECT COUNT(*) {} {}", base_from, where_clause),
                    params![p],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(&format!(
                    "{} {} ORDER BY d.created_at DESC LIMIT ?2 OFFSET ?3",
                    select, where_clause
                ))?;
                let rows = stmt.query_map(params![p, limit, offset as i64], map_row)?;
                for row in rows {
                    listings.push(row?);
                }
            }
            None => {
                total = conn.query_row(&format!("SELECT COUNT(*) {}", base_from), [], |row| {
                    row.get(0)
                })?;
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY d.created_at DESC LIMIT ? OFFSET ?",
                    select
                ))?;
                let rows = stmt.query_map(params![limit, offset as i64], map_row)?;
                for row in rows {
                    listings.push(row?);
                }
            }
        }
        Ok((listings, total))
    }

    pub fn list_hospitals(
        &self,
        search: Option<&str>,
        limit: u32,
        offset: u64,
    ) -> Result<(Vec<HospitalListing>, u64)> {
        let conn = self.lock();
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let base_from = "FROM hospitals h INNER JOIN users u ON h.user_id = u.id";
        let where_clause = "WHERE h.hospital_name LIKE ?1 OR h.hospital_address LIKE ?1 \
             OR h.hospital_email LIKE ?1 OR h.hospital_contact_no LIKE ?1 \
             OR h.license_no LIKE ?1 OR h.admin_name LIKE ?1 \
             OR u.email LIKE ?1 OR u.first_name LIKE ?1 OR u.last_name LIKE ?1";

        let select = format!(
            "SELECT {}, u.first_name, u.last_name, u.email {}",
            HOSPITAL_COLUMNS, base_from
        );

        let map_row = |row: &Row<'_>| -> rusqlite::Result<HospitalListing> {
            Ok(HospitalListing {
                hospital: row_to_hospital(row)?,
                user_first_name: row.get(12)?,
                user_last_name: row.get(13)?,
                user_email: row.get(14)?,
            })
        };

        let mut listings = Vec::new();
        let total: u64;
        match &pattern {
            Some(p) => {
                total = conn.query_row(
                    &format!("SELECT COUNT(*) {} {}", base_from, where_clause),
                    params![p],
                    |row| row.get(0),
                )?;
                let mut stmt = conn.prepare(&format!(
                    "{} {} ORDER BY h.created_at DESC LIMIT ?2 OFFSET ?3",
                    select, where_clause
                ))?;
                let rows = stmt.query_map(params![p, limit, offset as i64], map_row)?;
                for row in rows {
                    listings.push(row?);
                }
            }
            None => {
                total = conn.query_row(&format!("SELECT COUNT(*) {}", base_from), [], |row| {
                    row.get(0)
                })?;
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY h.created_at DESC LIMIT ? OFFSET ?",
                    select
                ))?;
                let rows = stmt.query_map(params![limit, offset as i64], map_row)?;
                for row in rows {
                    listings.push(row?);
                }
            }
        }
        Ok((listings, total))
    }

    pub fn count_doctors(&self) -> Result<(u64, u64)> {
        let conn = self.lock();
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM doctors", [], |row| row.get(0))?;
        let active: u64 = conn.query_row(
            "SELECT COUNT(*) FROM doctors WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok((total, active))
    }

    pub fn count_hospitals(&self) -> Result<(u64, u64)> {
        let conn = self.lock();
        let total: u64 = conn.query_row("SELECT COUNT(*) FROM hospitals", [], |row| row.get(0))?;
        let active: u64 = conn.query_row(
            "SELECT COUNT(*) FROM hospitals WHERE is_active = 1",
            [],
            |row| row.get(0),
        )?;
        Ok((total, active))
    }

    pub fn list_specializations(&self) -> Result<Vec<Specialization>> {
        let conn = self.lock();
        let mut stmt =
            conn.prepare("SELECT id, name, description FROM specializations ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Specialization {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
            })
        })?;
        let mut specializations = Vec::new();
        for row in rows {
            specializations.push(row?);
        }
        Ok(specializations)
    }

    pub fn insert_specialization(&self, name: &str, description: Option<&str>) -> Result<i64> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO specializations (name, description) VALUES (?, ?)",
            params![name, description],
        )
        .map_err(|e| map_constraint(e, "Specialization already exists"))?;
        Ok(conn.last_insert_rowid())
    }
}

impl TxOps<'_> {
    pub fn upsert_patient(&self, profile: &PatientProfile) -> Result<()> {
        upsert_patient_on(self.conn(), profile)
    }

    pub fn upsert_doctor(&self, profile: &DoctorProfile) -> Result<()> {
        upsert_doctor_on(self.conn(), profile)
    }

    pub fn upsert_hospital(&self, profile: &HospitalProfile) -> Result<()> {
        upsert_hospital_on(self.conn(), profile)
    }
}
