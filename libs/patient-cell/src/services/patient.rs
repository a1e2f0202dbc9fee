use tracing::{debug, info};

use shared_models::SheetTable;

use crate::models::{
    Patient, PatientError, Visit, COL_AMPLIMED_ID, COL_AMPLIMED_STATUS, COL_CARTEIRINHA,
    COL_DOCTOR_NAME, COL_FIRST_VISIT_DEADLINE, COL_HAS_SCHEDULED_VISIT, COL_HOSPITAL_CODE,
    COL_NEXT_VISIT_DATE, COL_SENHA, COL_STATUS, COL_SUGGESTED_DATE, COL_VISIT_HOSPITAL_CODE,
};

/// Selects the candidates of both passes from the management spreadsheet.
pub struct PatientService {
    patients: SheetTable,
    visits: SheetTable,
}

impl PatientService {
    /// Fails when either tab lacks a column the selection reads.
    pub fn new(patients: SheetTable, visits: SheetTable) -> Result<Self, PatientError> {
        patients
            .require_columns(&[
                COL_CARTEIRINHA,
                COL_SENHA,
                COL_HOSPITAL_CODE,
                COL_AMPLIMED_ID,
                COL_STATUS,
                COL_HAS_SCHEDULED_VISIT,
                COL_AMPLIMED_STATUS,
                COL_FIRST_VISIT_DEADLINE,
            ])
            .map_err(PatientError::PatientsSheet)?;

        visits
            .require_columns(&[
                COL_CARTEIRINHA,
                COL_SENHA,
                COL_VISIT_HOSPITAL_CODE,
                COL_AMPLIMED_ID,
                COL_DOCTOR_NAME,
                COL_NEXT_VISIT_DATE,
                COL_SUGGESTED_DATE,
            ])
            .map_err(PatientError::VisitsSheet)?;

        info!("Read {} patient records", patients.len());
        info!("Read {} visit records", visits.len());

        Ok(Self { patients, visits })
    }

    /// Patients still waiting for their first visit, in sheet order.
    pub fn patients_awaiting_first_visit(&self) -> Vec<Patient> {
        let selected: Vec<Patient> = self
            .patients
            .rows()
            .filter(Patient::needs_first_visit)
            .map(|row| Patient::from_row(&row))
            .collect();

        info!("Found {} patients with a pending first visit", selected.len());
        selected
    }

    /// Visits flagged for a follow-up to be booked, in sheet order.
    pub fn visits_awaiting_follow_up(&self) -> Vec<Visit> {
        let selected: Vec<Visit> = self
            .visits
            .rows()
            .filter(Visit::needs_follow_up)
            .map(|row| Visit::from_row(&row))
            .collect();

        info!("Found {} patients with a pending follow-up visit", selected.len());
        selected
    }

    /// First free row of the visits tab: one past the rows holding a
    /// carteirinha, below the header.
    pub fn next_visit_row(&self) -> u32 {
        let row = self.visits.count_present(COL_CARTEIRINHA) as u32 + 2;
        debug!("Next visit row: {}", row);
        row
    }
}
