//! Appointment rows and the slot-conflict queries.

use chrono::{DateTime, Utc};
use pillsure_core::model::{Appointment, AppointmentStatus};
use rusqlite::{Row, params};
use serde::Serialize;

use crate::db::{Db, decode_ts, encode_ts};
use crate::error::{Result, map_constraint};

const APPOINTMENT_COLUMNS: &str = "a.id, a.patient_id, a.doctor_id, a.appointment_date, \
     a.appointment_time, a.status, a.consultation_mode, a.patient_notes, a.doctor_notes, \
     a.prescription, a.diagnosis, a.cancellation_reason, a.is_active, a.created_at, a.updated_at";

fn row_to_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let status_raw: String = row.get(5)?;
    let status = AppointmentStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown appointment status: {}", status_raw).into(),
        )
    })?;
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_date: row.get(3)?,
        appointment_time: row.get(4)?,
        status,
        consultation_mode: row.get(6)?,
        patient_notes: row.get(7)?,
        doctor_notes: row.get(8)?,
        prescription: row.get(9)?,
        diagnosis: row.get(10)?,
        cancellation_reason: row.get(11)?,
        is_active: row.get(12)?,
        created_at: decode_ts(13, row.get(13)?)?,
        updated_at: decode_ts(14, row.get(14)?)?,
    })
}

/// Appointment joined with doctor details, as the patient dashboard shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub doctor_name: String,
    pub doctor_image: Option<String>,
    pub doctor_fee: Option<String>,
    pub doctor_mobile: Option<String>,
}

/// Appointment joined with patient details, as the doctor dashboard shows it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointment {
    #[serde(flatten)]
    pub appointment: Appointment,
    pub patient_name: String,
    pub patient_email: String,
}

impl Db {
    /// Exact-tuple conflict check: an active pending/confirmed appointment
    /// already holds this doctor/date/time slot.
    pub fn slot_taken(&self, doctor_id: &str, date: &str, time: &str) -> Result<bool> {
        let conn = self.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM appointments
             WHERE doctor_id = ? AND appointment_date = ? AND appointment_time = ?
               AND is_active = 1 AND status IN ('pending', 'confirmed')",
            params![doctor_id, date, time],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Insert a booking. A concurrent booking that slipped past the
    /// [`Db::slot_taken`] check trips the partial unique index and surfaces
    /// as `Conflict`.
    pub fn insert_appointment(&self, appointment: &Appointment) -> Result<()> {
        let conn = self.lock();
        conn.execute(
            "INSERT INTO appointments (id, patient_id, doctor_id, appointment_date, \
             appointment_time, status, consultation_mode, patient_notes, doctor_notes, \
             prescription, diagnosis, cancellation_reason, is_active, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                appointment.id,
                appointment.patient_id,
                appointment.doctor_id,
                appointment.appointment_date,
                appointment.appointment_time,
                appointment.status.as_str(),
                appointment.consultation_mode,
                appointment.patient_notes,
                appointment.doctor_notes,
                appointment.prescription,
                appointment.diagnosis,
                appointment.cancellation_reason,
                appointment.is_active,
                encode_ts(&appointment.created_at),
                encode_ts(&appointment.updated_at),
            ],
        )
        .map_err(|e| map_constraint(e, "This time slot is already booked"))?;
        Ok(())
    }

    pub fn appointments_for_patient(
        &self,
        patient_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<PatientAppointment>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {}, u.first_name || ' ' || u.last_name, d.image, d.fee_pkr, d.mobile
             FROM appointments a
             INNER JOIN doctors d ON a.doctor_id = d.id
             INNER JOIN users u ON d.user_id = u.id
             WHERE a.patient_id = ?1 AND a.is_active = 1 AND (?2 IS NULL OR a.status = ?2)
             ORDER BY a.appointment_date DESC, a.appointment_time DESC",
            APPOINTMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![patient_id, status.map(|s| s.as_str())],
            |row| {
                Ok(PatientAppointment {
                    appointment: row_to_appointment(row)?,
                    doctor_name: row.get(15)?,
                    doctor_image: row.get(16)?,
                    doctor_fee: row.get(17)?,
                    doctor_mobile: row.get(18)?,
                })
            },
        )?;
        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?);
        }
        Ok(appointments)
    }

    pub fn appointments_for_doctor(
        &self,
        doctor_id: &str,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<DoctorAppointment>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {}, u.first_name || ' ' || u.last_name, u.email
             FROM appointments a
             INNER JOIN users u ON a.patient_id = u.id
             WHERE a.doctor_id = ?1 AND a.is_active = 1 AND (?2 IS NULL OR a.status = ?2)
             ORDER BY a.appointment_date DESC, a.appointment_time DESC",
            APPOINTMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![doctor_id, status.map(|s| s.as_str())],
            |row| {
                Ok(DoctorAppointment {
                    appointment: row_to_appointment(row)?,
                    patient_name: row.get(15)?,
                    patient_email: row.get(16)?,
                })
            },
        )?;
        let mut appointments = Vec::new();
        for row in rows {
            appointments.push(row?);
        }
        Ok(appointments)
    }

    /// Load an active appointment visible to the caller: the booking patient,
    /// or the doctor whose profile the appointment targets.
    pub fn appointment_visible_to(
        &self,
        id: &str,
        user_id: &str,
        doctor_id: Option<&str>,
    ) -> Result<Option<Appointment>> {
        let conn = self.lock();
        let sql = format!(
            "SELECT {} FROM appointments a
             WHERE a.id = ?1 AND a.is_active = 1
               AND (a.patient_id = ?2 OR a.doctor_id = COALESCE(?3, ''))",
            APPOINTMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        match stmt.query_row(params![id, user_id, doctor_id], row_to_appointment) {
            Ok(appointment) => Ok(Some(appointment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
        cancellation_reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE appointments SET status = ?, \
             cancellation_reason = COALESCE(?, cancellation_reason), updated_at = ? WHERE id = ?",
            params![status.as_str(), cancellation_reason, encode_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    /// Merge-style notes update; omitted fields keep their stored value.
    pub fn update_appointment_notes(
        &self,
        id: &str,
        doctor_notes: Option<&str>,
        prescription: Option<&str>,
        diagnosis: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE appointments SET doctor_notes = COALESCE(?, doctor_notes), \
             prescription = COALESCE(?, prescription), diagnosis = COALESCE(?, diagnosis), \
             updated_at = ? WHERE id = ?",
            params![doctor_notes, prescription, diagnosis, encode_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    pub fn soft_delete_appointment(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock();
        let rows = conn.execute(
            "UPDATE appointments SET is_active = 0, updated_at = ? WHERE id = ?",
            params![encode_ts(&now), id],
        )?;
        Ok(rows > 0)
    }

    /// Slot strings still occupied on a given date (anything active that is
    /// not cancelled or rejected).
    pub fn booked_slots(&self, doctor_id: &str, date: &str) -> Result<Vec<String>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT appointment_time FROM appointments
             WHERE doctor_id = ? AND appointment_date = ? AND is_active = 1
               AND status NOT IN ('cancelled', 'rejected')",
        )?;
        let rows = stmt.query_map(params![doctor_id, date], |row| row.get::<_, String>(0))?;
        let mut slots = Vec::new();
        for row in rows {
            slots.push(row?);
        }
        Ok(slots)
    }

    pub fn count_appointments(&self) -> Result<u64> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?)
    }

    pub fn appointment_counts_by_status(&self, doctor_id: Option<&str>) -> Result<Vec<(String, u64)>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT status, COUNT(*) FROM appointments
             WHERE (?1 IS NULL OR doctor_id = ?1) GROUP BY status ORDER BY status",
        )?;
        let rows = stmt.query_map(params![doctor_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}
