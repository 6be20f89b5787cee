//! pillsure-core - Domain model and business rules for the PillSure
//! healthcare marketplace: users and role profiles, the onboarding
//! merge-and-gate flow, appointments, the medicine catalog, and the
//! shared API error/envelope vocabulary.

pub mod envelope;
pub mod error;
pub mod model;
pub mod onboarding;
pub mod pagination;

pub use envelope::{ApiEnvelope, EnvelopeStatus};
pub use error::{PillsureError, Result};
pub use model::{
    Appointment, AppointmentStatus, DoctorProfile, HospitalProfile, Medicine, MedicineUpdate,
    PatientProfile, RagQueryLog, Review, Specialization, User, UserRole,
};
pub use onboarding::OnboardingStatus;
pub use pagination::Pagination;
