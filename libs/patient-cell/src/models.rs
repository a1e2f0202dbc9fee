use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::{AppError, SheetRow, SheetTableError};

// Column headers of the "Pacientes" tab
pub const COL_CARTEIRINHA: &str = "Carteirinha";
pub const COL_SENHA: &str = "Senha";
pub const COL_HOSPITAL_CODE: &str = "Código interno operadora";
pub const COL_AMPLIMED_ID: &str = "ID Amplimed";
pub const COL_STATUS: &str = "Status";
pub const COL_HAS_SCHEDULED_VISIT: &str = "possui_alguma_visita_agendada";
pub const COL_AMPLIMED_STATUS: &str = "Status de cadastro na Amplimed";
pub const COL_FIRST_VISIT_DEADLINE: &str = "data_limite_primeira_visita";

// Column headers of the "Visitas" tab
pub const COL_VISIT_HOSPITAL_CODE: &str = "cod_hospital_operadora";
pub const COL_DOCTOR_NAME: &str = "Profissional";
pub const COL_NEXT_VISIT_DATE: &str = "Data da proxima visita";
pub const COL_SUGGESTED_DATE: &str = "Data sugerida";

pub const STATUS_NEW: &str = "Novo";
pub const NO_SCHEDULED_VISIT: &str = "0";
pub const AMPLIMED_REGISTERED: &str = "Cadastrado";
pub const SCHEDULE_NEXT_VISIT: &str = "Agendar próxima visita";

/// A row of the patients tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    pub carteirinha: String,
    pub in_hospital_stay_code: String,
    pub hospital_id: String,
    pub amplimed_id: String,
    pub status: String,
    pub has_scheduled_visit: String,
    pub amplimed_status: String,
    pub first_visit_deadline: String,
    pub sheet_row: u32,
}

impl Patient {
    pub fn from_row(row: &SheetRow<'_>) -> Self {
        Self {
            carteirinha: row.text(COL_CARTEIRINHA),
            in_hospital_stay_code: row.text(COL_SENHA),
            hospital_id: row.text(COL_HOSPITAL_CODE),
            amplimed_id: row.text(COL_AMPLIMED_ID),
            status: row.text(COL_STATUS),
            has_scheduled_visit: row.text(COL_HAS_SCHEDULED_VISIT),
            amplimed_status: row.text(COL_AMPLIMED_STATUS),
            first_visit_deadline: row.text(COL_FIRST_VISIT_DEADLINE),
            sheet_row: row.sheet_row_number(),
        }
    }

    /// New patient (no completed visit), nothing booked yet and already
    /// registered in Amplimed.
    pub fn needs_first_visit(row: &SheetRow<'_>) -> bool {
        row.is(COL_STATUS, STATUS_NEW)
            && row.is(COL_HAS_SCHEDULED_VISIT, NO_SCHEDULED_VISIT)
            && row.is(COL_AMPLIMED_STATUS, AMPLIMED_REGISTERED)
    }
}

/// A row of the visits tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub carteirinha: String,
    pub in_hospital_stay_code: String,
    pub hospital_id: String,
    pub amplimed_id: String,
    pub doctor_name: String,
    pub next_visit_date: String,
    pub suggested_date: String,
    pub sheet_row: u32,
}

impl Visit {
    pub fn from_row(row: &SheetRow<'_>) -> Self {
        Self {
            carteirinha: row.text(COL_CARTEIRINHA),
            in_hospital_stay_code: row.text(COL_SENHA),
            hospital_id: row.text(COL_VISIT_HOSPITAL_CODE),
            amplimed_id: row.text(COL_AMPLIMED_ID),
            doctor_name: row.text(COL_DOCTOR_NAME),
            next_visit_date: row.text(COL_NEXT_VISIT_DATE),
            suggested_date: row.text(COL_SUGGESTED_DATE),
            sheet_row: row.sheet_row_number(),
        }
    }

    pub fn needs_follow_up(row: &SheetRow<'_>) -> bool {
        row.is(COL_NEXT_VISIT_DATE, SCHEDULE_NEXT_VISIT)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum PatientError {
    #[error("Patients sheet: {0}")]
    PatientsSheet(SheetTableError),

    #[error("Visits sheet: {0}")]
    VisitsSheet(SheetTableError),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        AppError::Validation(err.to_string())
    }
}
