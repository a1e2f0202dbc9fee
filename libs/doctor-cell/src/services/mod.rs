pub mod doctor;
pub mod hospital;
pub mod matching;

pub use doctor::DoctorDirectory;
pub use hospital::{normalize_hospital_code, HospitalDirectory};
pub use matching::DoctorMatchingService;
