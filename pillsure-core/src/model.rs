//! Typed rows for the PillSure domain.
//!
//! Wire format is camelCase to match the public API; the store crate maps
//! these to and from snake_case SQL columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account roles. Stored as a lowercase TEXT column on `users`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Patient,
    Doctor,
    Hospital,
    Pharmacist,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Patient => "patient",
            UserRole::Doctor => "doctor",
            UserRole::Hospital => "hospital",
            UserRole::Pharmacist => "pharmacist",
            UserRole::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "patient" => Some(UserRole::Patient),
            "doctor" => Some(UserRole::Doctor),
            "hospital" => Some(UserRole::Hospital),
            "pharmacist" => Some(UserRole::Pharmacist),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

/// Onboarding step values stored on the user row.
/// 0 = not started, 1 = step 1 saved, 3 = completed.
pub const ONBOARDING_STEP_NONE: i64 = 0;
pub const ONBOARDING_STEP_STARTED: i64 = 1;
pub const ONBOARDING_STEP_COMPLETE: i64 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    /// Never serialized; present only while verifying credentials.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub onboarding_step: i64,
    pub is_onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    pub id: String,
    pub user_id: String,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub has_covid: bool,
    pub past_medical_history: Vec<String>,
    pub surgical_history: Option<String>,
    pub allergies: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PatientProfile {
    /// Fresh, empty profile for a first onboarding save.
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            gender: None,
            mobile: None,
            date_of_birth: None,
            address: None,
            blood_group: None,
            has_covid: false,
            past_medical_history: Vec::new(),
            surgical_history: None,
            allergies: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorProfile {
    pub id: String,
    pub user_id: String,
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    /// Specialization ids (see `Specialization`).
    pub specializations: Vec<i64>,
    pub qualifications: Vec<String>,
    pub experience_years: Option<i64>,
    /// Decimal-as-string, e.g. "4.50". Recomputed from reviews.
    pub satisfaction_rate: String,
    pub hospital_id: Option<String>,
    pub image: Option<String>,
    /// Decimal-as-string consultation fee.
    pub fee_pkr: Option<String>,
    pub consultation_modes: Vec<String>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub available_days: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DoctorProfile {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            gender: None,
            mobile: None,
            address: None,
            specializations: Vec::new(),
            qualifications: Vec::new(),
            experience_years: None,
            satisfaction_rate: "0.00".to_string(),
            hospital_id: None,
            image: None,
            fee_pkr: None,
            consultation_modes: Vec::new(),
            opening_time: None,
            closing_time: None,
            available_days: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalProfile {
    pub id: String,
    pub user_id: String,
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub hospital_contact_no: Option<String>,
    pub hospital_email: Option<String>,
    pub website: Option<String>,
    pub license_no: Option<String>,
    pub admin_name: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HospitalProfile {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            hospital_name: None,
            hospital_address: None,
            hospital_contact_no: None,
            hospital_email: None,
            website: None,
            license_no: None,
            admin_name: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medicine {
    pub id: i64,
    pub medicine_name: String,
    pub medicine_url: Option<String>,
    pub price: Option<String>,
    pub discount: Option<String>,
    pub stock: Option<i64>,
    pub images: Vec<String>,
    pub prescription_required: bool,
    pub drug_category: Option<String>,
    pub drug_varient: Option<String>,
    pub description: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Partial metadata update for a medicine; only provided keys change.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MedicineUpdate {
    pub medicine_name: Option<String>,
    pub medicine_url: Option<String>,
    pub price: Option<f64>,
    pub discount: Option<f64>,
    pub stock: Option<i64>,
    pub prescription_required: Option<bool>,
    pub drug_category: Option<String>,
    pub drug_varient: Option<String>,
    pub description: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
    Rejected,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AppointmentStatus::Pending),
            "confirmed" => Some(AppointmentStatus::Confirmed),
            "completed" => Some(AppointmentStatus::Completed),
            "cancelled" => Some(AppointmentStatus::Cancelled),
            "rejected" => Some(AppointmentStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    /// Calendar date, `yyyy-mm-dd`.
    pub appointment_date: String,
    /// Pre-enumerated slot string, e.g. "10:30 AM". Slots are discrete,
    /// so conflict detection is an exact-tuple check, not interval overlap.
    pub appointment_time: String,
    pub status: AppointmentStatus,
    pub consultation_mode: String,
    pub patient_notes: Option<String>,
    pub doctor_notes: Option<String>,
    pub prescription: Option<String>,
    pub diagnosis: Option<String>,
    pub cancellation_reason: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub user_id: String,
    pub doctor_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specialization {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// One logged recommendation query (the RAG proxy's database side effect).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RagQueryLog {
    pub id: i64,
    pub query: String,
    pub rewritten_query: Option<String>,
    pub embedding_cost: Option<String>,
    pub rewritten_query_cost: Option<String>,
    pub total_cost: Option<String>,
    pub retrieved_documents: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}
