use std::fmt;

use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use amplimed_cell::AmplimedError;
use doctor_cell::{DoctorAssignment, DoctorError};
use patient_cell::{Patient, Visit};
use shared_config::AppConfig;
use shared_database::SheetsError;
use shared_models::AppError;

pub const CREATE_APPOINTMENT_PATH: &str = "/pag/AGEnda_new/acoes/CRUDagendamento.php";
pub const APPOINTMENT_STATUS_SCHEDULED: &str = "Agendado";
pub const VISIT_STATUS_SCHEDULED: &str = "Agendada";
pub const SLOT_MINUTES: u32 = 30;

const DEADLINE_PATTERN: &str = r"^[0-9]{2}/[0-9]{2}/[0-9]{4}$";
const MIN_DEADLINE_YEAR: u32 = 2022;
const MAX_DEADLINE_YEAR: u32 = 2050;

// ==============================================================================
// DEADLINE
// ==============================================================================

/// A visit deadline as typed in the sheet, `DD/MM/YYYY`.
///
/// Only the shape and the field ranges are checked; `31/02/2026` is
/// accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deadline {
    day: u32,
    month: u32,
    year: u32,
}

impl Deadline {
    pub fn parse(text: &str) -> Result<Self, AppointmentError> {
        let invalid = || AppointmentError::InvalidDeadline(text.to_string());

        let format = Regex::new(DEADLINE_PATTERN).map_err(|_| invalid())?;
        if !format.is_match(text) {
            return Err(invalid());
        }

        let mut parts = text.split('/').map(str::parse::<u32>);
        let (Some(Ok(day)), Some(Ok(month)), Some(Ok(year))) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid());
        };

        if !(1..=31).contains(&day)
            || !(1..=12).contains(&month)
            || !(MIN_DEADLINE_YEAR..=MAX_DEADLINE_YEAR).contains(&year)
        {
            return Err(invalid());
        }

        Ok(Self { day, month, year })
    }

    /// `YYYY-MM-DD`, the date format Amplimed expects.
    pub fn to_amplimed(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}/{:04}", self.day, self.month, self.year)
    }
}

// ==============================================================================
// TIME SLOT
// ==============================================================================

/// A 30-minute visit window starting on the hour or the half hour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSlot {
    hour: u32,
    minute: u32,
}

impl TimeSlot {
    pub fn new(hour: u32, half_past: bool) -> Self {
        Self {
            hour,
            minute: if half_past { 30 } else { 0 },
        }
    }

    /// Start hour uniform in `[min_hour, max_hour]`, minute `00` or `30`.
    pub fn random<R: Rng + ?Sized>(min_hour: u32, max_hour: u32, rng: &mut R) -> Self {
        let hour = rng.gen_range(min_hour..=max_hour.max(min_hour));
        Self::new(hour, rng.gen_bool(0.5))
    }

    pub fn start(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    pub fn end(&self) -> String {
        let total = self.hour * 60 + self.minute + SLOT_MINUTES;
        format!("{:02}:{:02}", total / 60, total % 60)
    }
}

// ==============================================================================
// BOOKING PAYLOAD
// ==============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub hospital_id: String,
    pub slot: TimeSlot,
    pub date: Deadline,
    pub procedure_id: String,
    pub insurer_id: String,
}

impl BookingRequest {
    /// Form fields of Amplimed's "add appointment" action, in the order the
    /// web application sends them.
    pub fn to_form(&self) -> Vec<(&'static str, String)> {
        vec![
            ("action", "ADD".to_string()),
            ("dados[bloqueado]", "false".to_string()),
            ("dados[paciente]", self.patient_id.clone()),
            ("dados[motivo]", String::new()),
            ("dados[local]", self.hospital_id.clone()),
            ("dados[profissional]", self.doctor_id.clone()),
            ("dados[h_inicio]", self.slot.start()),
            ("dados[h_fim]", self.slot.end()),
            ("dados[data]", self.date.to_amplimed()),
            ("dados[procedimento]", self.procedure_id.clone()),
            ("dados[status]", APPOINTMENT_STATUS_SCHEDULED.to_string()),
            ("dados[convenio]", self.insurer_id.clone()),
            ("dados[valor]", "0".to_string()),
            ("dados[plano]", "0".to_string()),
            ("dados[desconto]", "0".to_string()),
            ("dados[tipo_desconto]", "0".to_string()),
            ("dados[valor final]", "0".to_string()),
            ("dados[id_soli]", String::new()),
            ("dados[obs_a]", String::new()),
            ("dados[obs_p]", "<br>".to_string()),
            ("dados[utiliza_integracao]", "false".to_string()),
        ]
    }

    pub fn encode(&self) -> Result<String, AppointmentError> {
        serde_urlencoded::to_string(self.to_form()).map_err(|e| AppointmentError::Encoding(e.to_string()))
    }
}

// ==============================================================================
// VISIT CANDIDATES
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisitKind {
    FirstVisit,
    FollowUp,
}

impl fmt::Display for VisitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitKind::FirstVisit => write!(f, "first visit"),
            VisitKind::FollowUp => write!(f, "follow-up visit"),
        }
    }
}

/// A patient whose next visit should be booked.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitCandidate {
    pub kind: VisitKind,
    pub carteirinha: String,
    pub in_hospital_stay_code: String,
    pub hospital_code: String,
    pub patient_amplimed_id: String,
    pub deadline: String,
    pub current_doctor_name: Option<String>,
    pub sheet_row: u32,
}

impl VisitCandidate {
    pub fn assignment(&self) -> DoctorAssignment {
        match self.kind {
            VisitKind::FirstVisit => DoctorAssignment::FirstVisit,
            VisitKind::FollowUp => DoctorAssignment::FollowUp {
                current_doctor_name: self.current_doctor_name.clone().unwrap_or_default(),
            },
        }
    }
}

impl From<&Patient> for VisitCandidate {
    fn from(patient: &Patient) -> Self {
        Self {
            kind: VisitKind::FirstVisit,
            carteirinha: patient.carteirinha.clone(),
            in_hospital_stay_code: patient.in_hospital_stay_code.clone(),
            hospital_code: patient.hospital_id.clone(),
            patient_amplimed_id: patient.amplimed_id.clone(),
            deadline: patient.first_visit_deadline.clone(),
            current_doctor_name: None,
            sheet_row: patient.sheet_row,
        }
    }
}

impl From<&Visit> for VisitCandidate {
    fn from(visit: &Visit) -> Self {
        Self {
            kind: VisitKind::FollowUp,
            carteirinha: visit.carteirinha.clone(),
            in_hospital_stay_code: visit.in_hospital_stay_code.clone(),
            hospital_code: visit.hospital_id.clone(),
            patient_amplimed_id: visit.amplimed_id.clone(),
            deadline: visit.suggested_date.clone(),
            current_doctor_name: Some(visit.doctor_name.clone()),
            sheet_row: visit.sheet_row,
        }
    }
}

/// Cells appended to the visits tab for a booked visit.
#[derive(Debug, Clone, PartialEq)]
pub struct VisitRow {
    pub carteirinha: String,
    pub in_hospital_stay_code: String,
    pub deadline: String,
    pub doctor_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledVisit {
    pub kind: VisitKind,
    pub carteirinha: String,
    pub doctor_name: String,
    pub date: String,
    pub start: String,
    pub end: String,
    /// Spreadsheet row the visit was written to.
    pub visit_row: u32,
    /// `None` when the booking was not submitted (dry run).
    pub amplimed_response: Option<String>,
}

// ==============================================================================
// SETTINGS
// ==============================================================================

/// Ids that replace the real ones when running against staging.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingOverrides {
    pub patient_id: String,
    pub doctor_id: String,
    pub hospital_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingSettings {
    pub procedure_id: String,
    pub insurer_id: String,
    pub min_schedule_hour: u32,
    pub max_schedule_hour: u32,
    pub staging: Option<StagingOverrides>,
    pub dry_run: bool,
}

impl BookingSettings {
    pub fn from_config(config: &AppConfig, dry_run: bool) -> Self {
        let staging = config.is_staging().then(|| StagingOverrides {
            patient_id: config.staging_amplimed_patient_id.clone(),
            doctor_id: config.staging_amplimed_doctor_id.clone(),
            hospital_id: config.staging_amplimed_hospital_id.clone(),
        });

        Self {
            procedure_id: config.amplimed_procedure_visit_id.clone(),
            insurer_id: config.amplimed_insurer_id.clone(),
            min_schedule_hour: config.min_schedule_hour,
            max_schedule_hour: config.max_schedule_hour,
            staging,
            dry_run,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Hospital {0} not found among hospitals with coverage")]
    HospitalNotFound(String),

    #[error("No doctor for this visit: {0}")]
    NoDoctor(#[from] DoctorError),

    #[error("Amplimed doctor data not found for CPF {0}")]
    DoctorNotFound(String),

    #[error("Invalid visit deadline: {0:?}")]
    InvalidDeadline(String),

    #[error("Could not encode booking: {0}")]
    Encoding(String),

    #[error("Booking submission failed: {0}")]
    Amplimed(#[from] AmplimedError),

    /// The appointment exists in Amplimed but the visits tab does not show
    /// it; it has to be recorded by hand.
    #[error(
        "Booked {} on {} {}-{} with {} but could not record it in visit row {}: {}",
        .visit.carteirinha, .visit.date, .visit.start, .visit.end, .visit.doctor_name, .visit.visit_row, .source
    )]
    NotRecorded {
        visit: Box<ScheduledVisit>,
        #[source]
        source: SheetsError,
    },
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::Amplimed(e) => e.into(),
            AppointmentError::NotRecorded { .. } => AppError::Sheets(err.to_string()),
            AppointmentError::HospitalNotFound(_)
            | AppointmentError::NoDoctor(_)
            | AppointmentError::DoctorNotFound(_) => AppError::NotFound(err.to_string()),
            other => AppError::Validation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deadline_accepts_well_formed_dates() {
        let deadline = Deadline::parse("05/03/2026").unwrap();
        assert_eq!(deadline.to_amplimed(), "2026-03-05");
        assert_eq!(deadline.to_string(), "05/03/2026");

        // Field ranges only, no calendar check
        assert!(Deadline::parse("31/02/2026").is_ok());
        assert!(Deadline::parse("01/01/2022").is_ok());
        assert!(Deadline::parse("31/12/2050").is_ok());
    }

    #[test]
    fn test_deadline_rejects_bad_shapes_and_ranges() {
        for text in [
            "",
            "5/3/2026",
            "2026-03-05",
            "05/03/26",
            " 05/03/2026",
            "05/03/2026 ",
            "00/03/2026",
            "32/03/2026",
            "05/00/2026",
            "05/13/2026",
            "05/03/2021",
            "05/03/2051",
        ] {
            assert_matches!(Deadline::parse(text), Err(AppointmentError::InvalidDeadline(t)) if t == text);
        }
    }

    #[test]
    fn test_slot_end_is_thirty_minutes_later() {
        assert_eq!(TimeSlot::new(8, false).start(), "08:00");
        assert_eq!(TimeSlot::new(8, false).end(), "08:30");
        assert_eq!(TimeSlot::new(9, true).start(), "09:30");
        assert_eq!(TimeSlot::new(9, true).end(), "10:00");
        assert_eq!(TimeSlot::new(17, true).end(), "18:00");
    }

    #[test]
    fn test_random_slot_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let slot = TimeSlot::random(8, 17, &mut rng);
            let start = slot.start();
            let hour: u32 = start[..2].parse().unwrap();
            let minute = &start[3..];

            assert!((8..=17).contains(&hour));
            assert!(minute == "00" || minute == "30");
        }

        let fixed = TimeSlot::random(12, 12, &mut rng);
        assert!(fixed.start().starts_with("12:"));
    }

    #[test]
    fn test_booking_form_order_and_encoding() {
        let request = BookingRequest {
            patient_id: "AMP-P1".to_string(),
            doctor_id: "D-AMP-1".to_string(),
            hospital_id: "H-AMP-123".to_string(),
            slot: TimeSlot::new(14, true),
            date: Deadline::parse("15/11/2026").unwrap(),
            procedure_id: "5".to_string(),
            insurer_id: "6".to_string(),
        };

        let keys: Vec<&str> = request.to_form().iter().map(|(key, _)| *key).collect();
        assert_eq!(keys.len(), 21);
        assert_eq!(keys[0], "action");
        assert_eq!(keys[20], "dados[utiliza_integracao]");

        let encoded = request.encode().unwrap();
        assert!(encoded.starts_with("action=ADD&dados%5Bbloqueado%5D=false&dados%5Bpaciente%5D=AMP-P1&dados%5Bmotivo%5D=&"));
        assert!(encoded.contains("dados%5Bh_inicio%5D=14%3A30&dados%5Bh_fim%5D=15%3A00&dados%5Bdata%5D=2026-11-15"));
        assert!(encoded.contains("dados%5Bvalor+final%5D=0"));
        assert!(encoded.contains("dados%5Bobs_p%5D=%3Cbr%3E"));
    }

    #[test]
    fn test_candidate_from_visit_carries_doctor() {
        let visit = Visit {
            carteirinha: "1002".to_string(),
            in_hospital_stay_code: "SEN-2".to_string(),
            hospital_id: "123".to_string(),
            amplimed_id: "AMP-P2".to_string(),
            doctor_name: "Dra. Ana Souza".to_string(),
            next_visit_date: "Agendar próxima visita".to_string(),
            suggested_date: "20/11/2026".to_string(),
            sheet_row: 2,
        };

        let candidate = VisitCandidate::from(&visit);
        assert_eq!(candidate.kind, VisitKind::FollowUp);
        assert_eq!(candidate.deadline, "20/11/2026");
        assert_eq!(
            candidate.assignment(),
            DoctorAssignment::FollowUp {
                current_doctor_name: "Dra. Ana Souza".to_string()
            }
        );
    }
}
