use tracing::{info, warn};

use shared_models::SheetTable;

use crate::models::{
    DoctorError, Professional, ProfessionalHospital, COL_CPF, COL_LINK_HOSPITAL_ATTENDANCE,
    COL_LINK_HOSPITAL_CODE, COL_LINK_PROFESSIONAL_STATUS, COL_PROFESSIONAL_AMPLIMED_ID,
    COL_PROFESSIONAL_NAME, COL_PROFESSIONAL_STATUS,
};
use crate::services::hospital::normalize_hospital_code;

/// Active professionals and the hospitals they attend.
pub struct DoctorDirectory {
    professionals: Vec<Professional>,
    links: Vec<ProfessionalHospital>,
}

impl DoctorDirectory {
    pub fn from_tables(
        professionals: &SheetTable,
        professionals_hospitals: &SheetTable,
    ) -> Result<Self, DoctorError> {
        professionals
            .require_columns(&[
                COL_CPF,
                COL_PROFESSIONAL_NAME,
                COL_PROFESSIONAL_AMPLIMED_ID,
                COL_PROFESSIONAL_STATUS,
            ])
            .map_err(DoctorError::ProfessionalsSheet)?;

        professionals_hospitals
            .require_columns(&[
                COL_CPF,
                COL_LINK_HOSPITAL_CODE,
                COL_LINK_PROFESSIONAL_STATUS,
                COL_LINK_HOSPITAL_ATTENDANCE,
            ])
            .map_err(DoctorError::ProfessionalsHospitalsSheet)?;

        let links: Vec<ProfessionalHospital> = professionals_hospitals
            .rows()
            .map(|row| ProfessionalHospital {
                cpf: row.text(COL_CPF),
                hospital_code: normalize_hospital_code(&row.text(COL_LINK_HOSPITAL_CODE)),
                professional_status: row.text(COL_LINK_PROFESSIONAL_STATUS),
                hospital_attendance: row.text(COL_LINK_HOSPITAL_ATTENDANCE),
            })
            .collect();
        info!("Read {} professional x hospital records", links.len());

        let professionals: Vec<Professional> = professionals
            .rows()
            .map(|row| Professional {
                cpf: row.text(COL_CPF),
                name: row.text(COL_PROFESSIONAL_NAME),
                amplimed_id: row.text(COL_PROFESSIONAL_AMPLIMED_ID),
                status: row.text(COL_PROFESSIONAL_STATUS),
            })
            .filter(Professional::is_active)
            .collect();
        info!("Read {} active professionals", professionals.len());

        Ok(Self { professionals, links })
    }

    fn by_cpf(&self, cpf: &str) -> Option<&Professional> {
        let found = self.professionals.iter().find(|p| p.cpf == cpf);
        if found.is_none() {
            warn!("No active professional with CPF {}", cpf);
        }
        found
    }

    pub fn amplimed_id_by_cpf(&self, cpf: &str) -> Option<&str> {
        self.by_cpf(cpf)
            .map(|p| p.amplimed_id.as_str())
            .filter(|id| !id.is_empty())
    }

    pub fn name_by_cpf(&self, cpf: &str) -> Option<&str> {
        self.by_cpf(cpf)
            .map(|p| p.name.as_str())
            .filter(|name| !name.is_empty())
    }

    pub fn cpf_by_name(&self, name: &str) -> Option<&str> {
        self.professionals
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.cpf.as_str())
            .filter(|cpf| !cpf.is_empty())
    }

    /// CPFs of active professionals currently attending the hospital, in
    /// sheet order.
    pub fn doctors_for_hospital(&self, hospital_code: &str) -> Vec<&str> {
        let code = normalize_hospital_code(hospital_code);

        self.links
            .iter()
            .filter(|link| link.hospital_code == code && link.is_eligible())
            .map(|link| link.cpf.as_str())
            .collect()
    }
}
