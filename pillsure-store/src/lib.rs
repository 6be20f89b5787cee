//! pillsure-store - SQLite persistence for the PillSure backend.

pub mod appointments;
pub mod db;
pub mod error;
pub mod medicines;
pub mod profiles;
pub mod rag_log;
pub mod reviews;
pub mod users;

pub use appointments::{DoctorAppointment, PatientAppointment};
pub use db::{Db, TxOps};
pub use error::{Result, StoreError};
pub use profiles::{DoctorListing, HospitalListing};
pub use reviews::ReviewListing;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use pillsure_core::model::{
        Appointment, AppointmentStatus, DoctorProfile, Medicine, Review, User, UserRole,
    };

    use crate::db::Db;

    pub fn seed_user(db: &Db, id: &str, email: &str, role: UserRole) {
        let now = Utc::now();
        db.insert_user(&User {
            id: id.to_string(),
            email: email.to_string(),
            password_hash: Some("hash".to_string()),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            role,
            is_active: true,
            is_email_verified: false,
            onboarding_step: 0,
            is_onboarding_complete: false,
            created_at: now,
            updated_at: now,
        })
        .unwrap();
    }

    pub fn seed_doctor(db: &Db, id: &str, user_id: &str) {
        let mut profile = DoctorProfile::new(id, user_id, Utc::now());
        profile.gender = Some("female".to_string());
        profile.mobile = Some("3001234567".to_string());
        profile.address = Some("Clinic Rd".to_string());
        db.upsert_doctor(&profile).unwrap();
    }

    pub fn medicine(name: &str, category: Option<&str>, stock: Option<i64>) -> Medicine {
        Medicine {
            id: 0,
            medicine_name: name.to_string(),
            medicine_url: None,
            price: Some("10.00".to_string()),
            discount: None,
            stock,
            images: Vec::new(),
            prescription_required: false,
            drug_category: category.map(String::from),
            drug_varient: None,
            description: None,
            created_at: Utc::now(),
        }
    }

    pub fn appointment(id: &str, patient_id: &str, doctor_id: &str, date: &str, time: &str) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: id.to_string(),
            patient_id: patient_id.to_string(),
            doctor_id: doctor_id.to_string(),
            appointment_date: date.to_string(),
            appointment_time: time.to_string(),
            status: AppointmentStatus::Pending,
            consultation_mode: "online".to_string(),
            patient_notes: None,
            doctor_notes: None,
            prescription: None,
            diagnosis: None,
            cancellation_reason: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn review(id: &str, user_id: &str, doctor_id: &str, rating: i64) -> Review {
        Review {
            id: id.to_string(),
            user_id: user_id.to_string(),
            doctor_id: doctor_id.to_string(),
            rating,
            comment: None,
            created_at: Utc::now(),
        }
    }
}
