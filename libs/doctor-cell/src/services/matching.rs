use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, warn};

use crate::models::{DoctorAssignment, DoctorError};
use crate::services::doctor::DoctorDirectory;

pub struct DoctorMatchingService {
    directory: Arc<DoctorDirectory>,
}

impl DoctorMatchingService {
    pub fn new(directory: Arc<DoctorDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &DoctorDirectory {
        &self.directory
    }

    /// CPF of the doctor who will make the visit.
    ///
    /// First visits go to a random eligible doctor of the hospital;
    /// follow-ups stay with the doctor who made the last visit.
    pub fn assign<R: Rng + ?Sized>(
        &self,
        hospital_code: &str,
        assignment: &DoctorAssignment,
        rng: &mut R,
    ) -> Result<String, DoctorError> {
        match assignment {
            DoctorAssignment::FirstVisit => {
                let candidates = self.directory.doctors_for_hospital(hospital_code);
                debug!("{} eligible doctors for hospital {}", candidates.len(), hospital_code);

                candidates
                    .choose(rng)
                    .map(|cpf| cpf.to_string())
                    .ok_or_else(|| {
                        warn!("No doctor found for hospital {}", hospital_code);
                        DoctorError::NoDoctorForHospital(hospital_code.to_string())
                    })
            }
            DoctorAssignment::FollowUp { current_doctor_name } => self
                .directory
                .cpf_by_name(current_doctor_name)
                .map(str::to_string)
                .ok_or_else(|| DoctorError::NotFound(current_doctor_name.clone())),
        }
    }
}
