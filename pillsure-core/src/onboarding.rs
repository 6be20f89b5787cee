//! Onboarding merge-and-gate logic.
//!
//! Each role has a typed payload of optional fields. Saving merges the
//! payload over the stored profile (incoming value wins when explicitly
//! provided, stored value otherwise, role default as the last resort),
//! validates the role's step-1 required set over the *merged* state, and
//! then evaluates a completion predicate over the gating set. Partial saves
//! are idempotent and never erase previously stored values; completeness is
//! always recomputed from the merged row, so a save that omits gating fields
//! cannot un-complete a profile.
//!
//! The three roles are handled by three separate typed functions rather
//! than a trait, mirroring the shape of the flows they implement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PillsureError, Result};
use crate::model::{
    DoctorProfile, HospitalProfile, ONBOARDING_STEP_COMPLETE, ONBOARDING_STEP_STARTED,
    PatientProfile,
};

/// Outcome of every onboarding save, returned to the client and written to
/// the user row in the same transaction as the profile upsert.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub onboarding_step: i64,
    pub is_onboarding_complete: bool,
}

impl OnboardingStatus {
    pub fn from_gate(complete: bool) -> Self {
        if complete {
            Self {
                onboarding_step: ONBOARDING_STEP_COMPLETE,
                is_onboarding_complete: true,
            }
        } else {
            Self {
                onboarding_step: ONBOARDING_STEP_STARTED,
                is_onboarding_complete: false,
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientPayload {
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub date_of_birth: Option<String>,
    pub address: Option<String>,
    pub blood_group: Option<String>,
    pub has_covid: Option<bool>,
    pub past_medical_history: Option<Vec<String>>,
    pub surgical_history: Option<String>,
    pub allergies: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DoctorPayload {
    pub gender: Option<String>,
    pub mobile: Option<String>,
    pub address: Option<String>,
    pub specializations: Option<Vec<i64>>,
    pub qualifications: Option<Vec<String>>,
    pub experience_years: Option<i64>,
    pub image: Option<String>,
    pub fee_pkr: Option<f64>,
    pub consultation_modes: Option<Vec<String>>,
    pub opening_time: Option<String>,
    pub closing_time: Option<String>,
    pub available_days: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HospitalPayload {
    pub hospital_name: Option<String>,
    pub hospital_address: Option<String>,
    pub hospital_contact_no: Option<String>,
    pub hospital_email: Option<String>,
    pub website: Option<String>,
    pub license_no: Option<String>,
    pub admin_name: Option<String>,
}

fn take(slot: &mut Option<String>, incoming: &Option<String>) {
    if let Some(v) = incoming {
        *slot = Some(v.clone());
    }
}

/// Merge a patient payload over the stored (or freshly created) profile.
pub fn merge_patient(
    mut profile: PatientProfile,
    payload: &PatientPayload,
    now: DateTime<Utc>,
) -> PatientProfile {
    take(&mut profile.gender, &payload.gender);
    take(&mut profile.mobile, &payload.mobile);
    take(&mut profile.date_of_birth, &payload.date_of_birth);
    take(&mut profile.address, &payload.address);
    take(&mut profile.blood_group, &payload.blood_group);
    // Explicit `false` is a provided value and must win over the stored one.
    if let Some(v) = payload.has_covid {
        profile.has_covid = v;
    }
    if let Some(v) = &payload.past_medical_history {
        profile.past_medical_history = v.clone();
    }
    take(&mut profile.surgical_history, &payload.surgical_history);
    take(&mut profile.allergies, &payload.allergies);
    profile.updated_at = now;
    profile
}

pub fn merge_doctor(
    mut profile: DoctorProfile,
    payload: &DoctorPayload,
    now: DateTime<Utc>,
) -> DoctorProfile {
    take(&mut profile.gender, &payload.gender);
    take(&mut profile.mobile, &payload.mobile);
    take(&mut profile.address, &payload.address);
    if let Some(v) = &payload.specializations {
        profile.specializations = v.clone();
    }
    if let Some(v) = &payload.qualifications {
        profile.qualifications = v.clone();
    }
    if let Some(v) = payload.experience_years {
        profile.experience_years = Some(v);
    }
    take(&mut profile.image, &payload.image);
    if let Some(v) = payload.fee_pkr {
        profile.fee_pkr = Some(format!("{:.2}", v));
    }
    if let Some(v) = &payload.consultation_modes {
        profile.consultation_modes = v.clone();
    }
    take(&mut profile.opening_time, &payload.opening_time);
    take(&mut profile.closing_time, &payload.closing_time);
    if let Some(v) = &payload.available_days {
        profile.available_days = v.clone();
    }
    profile.updated_at = now;
    profile
}

pub fn merge_hospital(
    mut profile: HospitalProfile,
    payload: &HospitalPayload,
    now: DateTime<Utc>,
) -> HospitalProfile {
    take(&mut profile.hospital_name, &payload.hospital_name);
    take(&mut profile.hospital_address, &payload.hospital_address);
    take(&mut profile.hospital_contact_no, &payload.hospital_contact_no);
    take(&mut profile.hospital_email, &payload.hospital_email);
    take(&mut profile.website, &payload.website);
    take(&mut profile.license_no, &payload.license_no);
    take(&mut profile.admin_name, &payload.admin_name);
    profile.updated_at = now;
    profile
}

fn present(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

fn require(missing: &mut Vec<String>, name: &str, ok: bool) {
    if !ok {
        missing.push(name.to_string());
    }
}

/// Step-1 validation for patients: gender, mobile, dateOfBirth, address.
/// Runs over the merged state, so a follow-up save may omit fields that a
/// previous save already stored.
pub fn validate_patient_step_one(profile: &PatientProfile) -> Result<()> {
    let mut missing = Vec::new();
    require(&mut missing, "gender", present(&profile.gender));
    require(&mut missing, "mobile", present(&profile.mobile));
    require(&mut missing, "dateOfBirth", present(&profile.date_of_birth));
    require(&mut missing, "address", present(&profile.address));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PillsureError::MissingFields { fields: missing })
    }
}

/// Step-1 validation for doctors: gender, mobile, address.
pub fn validate_doctor_step_one(profile: &DoctorProfile) -> Result<()> {
    let mut missing = Vec::new();
    require(&mut missing, "gender", present(&profile.gender));
    require(&mut missing, "mobile", present(&profile.mobile));
    require(&mut missing, "address", present(&profile.address));
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PillsureError::MissingFields { fields: missing })
    }
}

/// Step-1 validation for hospitals: name, address, contact number, email.
pub fn validate_hospital_step_one(profile: &HospitalProfile) -> Result<()> {
    let mut missing = Vec::new();
    require(&mut missing, "hospitalName", present(&profile.hospital_name));
    require(
        &mut missing,
        "hospitalAddress",
        present(&profile.hospital_address),
    );
    require(
        &mut missing,
        "hospitalContactNo",
        present(&profile.hospital_contact_no),
    );
    require(
        &mut missing,
        "hospitalEmail",
        present(&profile.hospital_email),
    );
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PillsureError::MissingFields { fields: missing })
    }
}

/// Completion gate for patients: step-1 fields plus bloodGroup.
pub fn patient_is_complete(profile: &PatientProfile) -> bool {
    present(&profile.gender)
        && present(&profile.mobile)
        && present(&profile.date_of_birth)
        && present(&profile.address)
        && present(&profile.blood_group)
}

/// Completion gate for doctors: experience, specializations, qualifications
/// and fee must all be present.
pub fn doctor_is_complete(profile: &DoctorProfile) -> bool {
    profile.experience_years.is_some()
        && !profile.specializations.is_empty()
        && !profile.qualifications.is_empty()
        && present(&profile.fee_pkr)
}

/// Completion gate for hospitals: step-1 fields plus licenseNo and adminName.
pub fn hospital_is_complete(profile: &HospitalProfile) -> bool {
    present(&profile.hospital_name)
        && present(&profile.hospital_address)
        && present(&profile.hospital_contact_no)
        && present(&profile.hospital_email)
        && present(&profile.license_no)
        && present(&profile.admin_name)
}
