use tracing::{debug, info, warn};

use shared_models::SheetTable;

use crate::models::{
    DoctorError, Hospital, COL_HOSPITAL_ACTIVE, COL_HOSPITAL_AMPLIMED_ID, COL_HOSPITAL_CODE,
    HOSPITAL_CODE_WIDTH, YES,
};

/// Left-pads a hospital code with zeros to the width used by the
/// accredited-network sheet. Longer codes are returned unchanged.
pub fn normalize_hospital_code(code: &str) -> String {
    format!("{:0>width$}", code.trim(), width = HOSPITAL_CODE_WIDTH)
}

/// Hospitals where the home-visit service operates.
pub struct HospitalDirectory {
    hospitals: Vec<Hospital>,
}

impl HospitalDirectory {
    pub fn from_table(table: &SheetTable) -> Result<Self, DoctorError> {
        table
            .require_columns(&[COL_HOSPITAL_CODE, COL_HOSPITAL_AMPLIMED_ID, COL_HOSPITAL_ACTIVE])
            .map_err(DoctorError::HospitalsSheet)?;

        let hospitals: Vec<Hospital> = table
            .rows()
            .filter(|row| row.is(COL_HOSPITAL_ACTIVE, YES))
            .map(|row| Hospital {
                code: normalize_hospital_code(&row.text(COL_HOSPITAL_CODE)),
                amplimed_id: row.text(COL_HOSPITAL_AMPLIMED_ID),
            })
            .collect();

        info!("Read {} hospitals where the service operates", hospitals.len());
        Ok(Self { hospitals })
    }

    pub fn len(&self) -> usize {
        self.hospitals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty()
    }

    /// Amplimed id of the hospital with the given insurer code.
    pub fn amplimed_id(&self, hospital_code: &str) -> Option<&str> {
        let code = normalize_hospital_code(hospital_code);
        debug!("Looking up hospital {}", code);

        match self.hospitals.iter().find(|h| h.code == code) {
            Some(hospital) if !hospital.amplimed_id.is_empty() => Some(hospital.amplimed_id.as_str()),
            Some(_) => {
                warn!("Hospital {} has no Amplimed id", code);
                None
            }
            None => {
                warn!("Hospital not found among hospitals where the service operates. Searched for code: {}", code);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_hospital_code() {
        assert_eq!(normalize_hospital_code("123"), "0000000123");
        assert_eq!(normalize_hospital_code("0000000123"), "0000000123");
        assert_eq!(normalize_hospital_code(" 42 "), "0000000042");
        assert_eq!(normalize_hospital_code("12345678901"), "12345678901");
        assert_eq!(normalize_hospital_code(""), "0000000000");
    }
}
