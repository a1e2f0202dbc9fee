use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::{AppError, SheetTableError};

// "Profissionais" tab (management spreadsheet)
pub const COL_CPF: &str = "CPF";
pub const COL_PROFESSIONAL_NAME: &str = "Nome do profissional";
pub const COL_PROFESSIONAL_AMPLIMED_ID: &str = "profissional_cod_amplimed";
pub const COL_PROFESSIONAL_STATUS: &str = "Status";

// Professionals x hospitals tab (hospitals spreadsheet)
pub const COL_LINK_HOSPITAL_CODE: &str = "Código interno operadora";
pub const COL_LINK_PROFESSIONAL_STATUS: &str = "Status Profissional";
pub const COL_LINK_HOSPITAL_ATTENDANCE: &str = "Status Hospital atendimento";

// Accredited network tab (hospitals spreadsheet)
pub const COL_HOSPITAL_CODE: &str = "cod_referenciado";
pub const COL_HOSPITAL_AMPLIMED_ID: &str = "cod_amplimed";
pub const COL_HOSPITAL_ACTIVE: &str = "hospital_com_atuação";

pub const STATUS_ACTIVE: &str = "Ativo";
pub const YES: &str = "Sim";

/// Width of the insurer's hospital codes once left-padded with zeros.
pub const HOSPITAL_CODE_WIDTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Professional {
    pub cpf: String,
    pub name: String,
    pub amplimed_id: String,
    pub status: String,
}

impl Professional {
    pub fn is_active(&self) -> bool {
        self.status == STATUS_ACTIVE
    }
}

/// Which hospitals a professional attends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfessionalHospital {
    pub cpf: String,
    pub hospital_code: String,
    pub professional_status: String,
    pub hospital_attendance: String,
}

impl ProfessionalHospital {
    pub fn is_eligible(&self) -> bool {
        self.professional_status == STATUS_ACTIVE && self.hospital_attendance == YES
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hospital {
    pub code: String,
    pub amplimed_id: String,
}

/// How the doctor of the next visit is chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum DoctorAssignment {
    /// Any eligible doctor of the hospital, drawn at random.
    FirstVisit,
    /// The doctor who saw the patient last.
    FollowUp { current_doctor_name: String },
}

#[derive(Error, Debug, PartialEq)]
pub enum DoctorError {
    #[error("Doctor not found: {0}")]
    NotFound(String),

    #[error("No active doctor attends hospital {0}")]
    NoDoctorForHospital(String),

    #[error("Professionals sheet: {0}")]
    ProfessionalsSheet(SheetTableError),

    #[error("Professionals x hospitals sheet: {0}")]
    ProfessionalsHospitalsSheet(SheetTableError),

    #[error("Hospitals sheet: {0}")]
    HospitalsSheet(SheetTableError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound(_) | DoctorError::NoDoctorForHospital(_) => AppError::NotFound(err.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}
