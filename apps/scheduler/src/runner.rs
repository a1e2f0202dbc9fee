use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::sleep;
use tracing::{error, info, warn};

use amplimed_cell::{AmplimedSession, AmplimedSettings, AntiCaptchaClient, ChromeBrowser};
use appointment_cell::{
    AmplimedClient, AppointmentError, BookingService, BookingSettings, VisitCandidate, VisitKind, VisitRowWriter,
};
use doctor_cell::{DoctorDirectory, DoctorMatchingService, HospitalDirectory};
use patient_cell::PatientService;
use shared_config::AppConfig;
use shared_database::{provider_from_config, GoogleSheetsClient, SheetsError};
use shared_models::{AppError, SheetTable};
use shared_utils::OperatorPrompt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Passes {
    /// First visits only
    First,
    /// Follow-up visits only
    FollowUp,
    /// First visits, then follow-ups
    All,
}

impl Passes {
    fn includes(self, kind: VisitKind) -> bool {
        matches!(
            (self, kind),
            (Passes::All, _) | (Passes::First, VisitKind::FirstVisit) | (Passes::FollowUp, VisitKind::FollowUp)
        )
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub dry_run: bool,
    pub confirm_each: bool,
    pub passes: Passes,
    /// Pause after each successful booking.
    pub wait: Duration,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PassSummary {
    pub candidates: usize,
    pub scheduled: usize,
    pub skipped: usize,
    /// Booked in Amplimed but missing from the visits tab.
    pub unrecorded: usize,
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pending, {} scheduled, {} skipped, {} booked but not recorded",
            self.candidates, self.scheduled, self.skipped, self.unrecorded
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub first_visits: PassSummary,
    pub follow_ups: PassSummary,
    pub aborted: bool,
}

impl RunSummary {
    pub fn log(&self) {
        info!("First visits: {}", self.first_visits);
        info!("Follow-up visits: {}", self.follow_ups);
    }
}

/// Every range the run reads.
pub struct SheetData {
    pub patients: SheetTable,
    pub visits: SheetTable,
    pub hospitals: SheetTable,
    pub professionals_hospitals: SheetTable,
    pub professionals: SheetTable,
}

pub async fn load_sheets(sheets: &GoogleSheetsClient, config: &AppConfig) -> Result<SheetData, SheetsError> {
    let management = config.management_spreadsheet_id();
    let network = config.spreadsheet_hospitals.as_str();
    let tries = config.max_google_api_tries;

    let patients = sheets
        .get_values_with_retry(management, &config.range_patients, tries, "patients")
        .await?;
    let visits = sheets
        .get_values_with_retry(management, &config.range_visits, tries, "visits")
        .await?;
    let hospitals = sheets
        .get_values_with_retry(network, &config.range_hospitals, tries, "hospitals")
        .await?;
    let professionals_hospitals = sheets
        .get_values_with_retry(
            network,
            &config.range_professionals_hospitals,
            tries,
            "professionals x hospitals",
        )
        .await?;
    let professionals = sheets
        .get_values_with_retry(management, &config.range_professionals, tries, "professionals")
        .await?;

    Ok(SheetData {
        patients,
        visits,
        hospitals,
        professionals_hospitals,
        professionals,
    })
}

/// Reads the spreadsheets, books both passes and closes the browser.
pub async fn run(config: &AppConfig, options: &RunOptions, prompt: &dyn OperatorPrompt) -> Result<RunSummary, AppError> {
    let tokens = provider_from_config(config).await?;
    let sheets = Arc::new(GoogleSheetsClient::new(config, tokens));

    let data = load_sheets(&sheets, config).await?;

    let hospitals = HospitalDirectory::from_table(&data.hospitals)?;
    let doctors = DoctorDirectory::from_tables(&data.professionals, &data.professionals_hospitals)?;
    let patients = PatientService::new(data.patients, data.visits)?;

    let next_row = patients.next_visit_row();
    info!("Next visit goes to row {}", next_row);

    let first_visits: Vec<VisitCandidate> = patients
        .patients_awaiting_first_visit()
        .iter()
        .map(VisitCandidate::from)
        .collect();
    let follow_ups: Vec<VisitCandidate> = patients
        .visits_awaiting_follow_up()
        .iter()
        .map(VisitCandidate::from)
        .collect();

    let session = AmplimedSession::new(
        ChromeBrowser::new(config),
        AntiCaptchaClient::new(config),
        AmplimedSettings::from_config(config),
    );
    let writer = VisitRowWriter::new(
        Arc::clone(&sheets),
        config.management_spreadsheet_id(),
        &config.visits_sheet_name,
        next_row,
        options.dry_run,
    );
    let mut booking = BookingService::new(
        Arc::new(hospitals),
        DoctorMatchingService::new(Arc::new(doctors)),
        session,
        writer,
        BookingSettings::from_config(config, options.dry_run),
        StdRng::from_entropy(),
    );

    let summary = run_passes(&mut booking, &first_visits, &follow_ups, options, prompt).await;

    if let Err(e) = booking.client_mut().close().await {
        warn!("Closing the browser failed: {}", e);
    }

    Ok(summary)
}

/// First visits, then follow-ups. A "no" from the operator ends the run.
pub async fn run_passes<C: AmplimedClient>(
    booking: &mut BookingService<C>,
    first_visits: &[VisitCandidate],
    follow_ups: &[VisitCandidate],
    options: &RunOptions,
    prompt: &dyn OperatorPrompt,
) -> RunSummary {
    let mut summary = RunSummary::default();

    let passes = [
        (VisitKind::FirstVisit, first_visits),
        (VisitKind::FollowUp, follow_ups),
    ];

    for (kind, candidates) in passes {
        if !options.passes.includes(kind) {
            continue;
        }

        let pass = match kind {
            VisitKind::FirstVisit => &mut summary.first_visits,
            VisitKind::FollowUp => &mut summary.follow_ups,
        };

        if run_pass(booking, kind, candidates, options, prompt, pass).await.is_err() {
            summary.aborted = true;
            break;
        }
    }

    summary
}

async fn run_pass<C: AmplimedClient>(
    booking: &mut BookingService<C>,
    kind: VisitKind,
    candidates: &[VisitCandidate],
    options: &RunOptions,
    prompt: &dyn OperatorPrompt,
    summary: &mut PassSummary,
) -> Result<(), AppError> {
    info!("Scheduling {}s: {} pending", kind, candidates.len());
    summary.candidates = candidates.len();

    for candidate in candidates {
        info!(
            "[{}] {} for carteirinha {}, senha {}, hospital {}, deadline {}{}",
            candidate.sheet_row,
            kind,
            candidate.carteirinha,
            candidate.in_hospital_stay_code,
            candidate.hospital_code,
            candidate.deadline,
            candidate
                .current_doctor_name
                .as_deref()
                .map(|name| format!(", doctor {}", name))
                .unwrap_or_default()
        );

        match booking.process_visit(candidate).await {
            Ok(visit) => {
                summary.scheduled += 1;
                info!(
                    "Scheduled {} on {} {}-{} with {} (row {})",
                    visit.carteirinha, visit.date, visit.start, visit.end, visit.doctor_name, visit.visit_row
                );

                sleep(options.wait).await;
                if options.confirm_each {
                    prompt.proceed_or_abort()?;
                }
            }
            Err(e @ AppointmentError::NotRecorded { .. }) => {
                summary.unrecorded += 1;
                error!("Stopping the run; record this visit by hand before the next run: {}", e);
                return Err(e.into());
            }
            Err(e) => {
                summary.skipped += 1;
                warn!("Skipping {} of {}: {}", kind, candidate.carteirinha, e);
                prompt.proceed_or_abort()?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use amplimed_cell::{AmplimedApi, AmplimedError};
    use async_trait::async_trait;
    use shared_database::StaticTokenProvider;
    use shared_utils::test_utils::{
        ScriptedPrompt, SheetFixtures, TestConfig, HOSPITALS_SHEET_ID, MANAGEMENT_SHEET_ID, RANGE_HOSPITALS,
        RANGE_PATIENTS, RANGE_PROFESSIONALS, RANGE_PROFESSIONALS_HOSPITALS, RANGE_VISITS,
    };
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Dry runs never submit.
    struct Unreachable;

    #[async_trait]
    impl AmplimedApi for Unreachable {
        async fn post_form(&mut self, _path: &str, _form_body: &str) -> Result<String, AmplimedError> {
            Err(AmplimedError::MissingAuthorization)
        }
    }

    struct Accepting;

    #[async_trait]
    impl AmplimedApi for Accepting {
        async fn post_form(&mut self, _path: &str, _form_body: &str) -> Result<String, AmplimedError> {
            Ok("{\"eventos\":[1]}".to_string())
        }
    }

    fn options(confirm_each: bool, passes: Passes) -> RunOptions {
        RunOptions {
            dry_run: true,
            confirm_each,
            passes,
            wait: Duration::ZERO,
        }
    }

    fn candidates() -> (Vec<VisitCandidate>, Vec<VisitCandidate>) {
        let patients = PatientService::new(
            SheetFixtures::table(SheetFixtures::patients()),
            SheetFixtures::table(SheetFixtures::visits()),
        )
        .unwrap();

        (
            patients.patients_awaiting_first_visit().iter().map(VisitCandidate::from).collect(),
            patients.visits_awaiting_follow_up().iter().map(VisitCandidate::from).collect(),
        )
    }

    fn dry_run_booking() -> BookingService<Unreachable> {
        let config = TestConfig::default().to_app_config();
        let hospitals = HospitalDirectory::from_table(&SheetFixtures::table(SheetFixtures::hospitals())).unwrap();
        let doctors = DoctorDirectory::from_tables(
            &SheetFixtures::table(SheetFixtures::professionals()),
            &SheetFixtures::table(SheetFixtures::professionals_hospitals()),
        )
        .unwrap();
        let sheets = Arc::new(GoogleSheetsClient::with_base_url(
            &config.google_sheets_base_url,
            Arc::new(StaticTokenProvider::new("unused")),
        ));

        BookingService::new(
            Arc::new(hospitals),
            DoctorMatchingService::new(Arc::new(doctors)),
            Unreachable,
            VisitRowWriter::new(sheets, MANAGEMENT_SHEET_ID, "Visitas", 5, true),
            BookingSettings::from_config(&config, true),
            StdRng::seed_from_u64(1),
        )
    }

    #[tokio::test]
    async fn test_failures_ask_before_continuing() {
        // 1001 books, 1005 has a malformed deadline; 1002 books, 1007's doctor is inactive
        let (first, follow) = candidates();
        let prompt = ScriptedPrompt::new(&[true, true]);
        let mut booking = dry_run_booking();

        let summary = run_passes(&mut booking, &first, &follow, &options(false, Passes::All), &prompt).await;

        assert!(!summary.aborted);
        assert_eq!(
            summary.first_visits,
            PassSummary {
                candidates: 2,
                scheduled: 1,
                skipped: 1,
                unrecorded: 0
            }
        );
        assert_eq!(
            summary.follow_ups,
            PassSummary {
                candidates: 2,
                scheduled: 1,
                skipped: 1,
                unrecorded: 0
            }
        );
        assert_eq!(prompt.times_asked(), 2);
        assert_eq!(booking.next_visit_row(), 7);
    }

    #[tokio::test]
    async fn test_operator_can_stop_the_run() {
        let (first, follow) = candidates();
        let prompt = ScriptedPrompt::new(&[false]);
        let mut booking = dry_run_booking();

        let summary = run_passes(&mut booking, &first, &follow, &options(false, Passes::All), &prompt).await;

        assert!(summary.aborted);
        assert_eq!(summary.first_visits.scheduled, 1);
        assert_eq!(summary.follow_ups, PassSummary::default());
    }

    #[tokio::test]
    async fn test_confirm_each_asks_after_every_booking() {
        let (first, follow) = candidates();
        let prompt = ScriptedPrompt::new(&[true; 4]);
        let mut booking = dry_run_booking();

        let summary = run_passes(&mut booking, &first, &follow, &options(true, Passes::All), &prompt).await;

        assert!(!summary.aborted);
        assert_eq!(prompt.times_asked(), 4);
    }

    #[tokio::test]
    async fn test_only_follow_ups() {
        let (first, follow) = candidates();
        let prompt = ScriptedPrompt::new(&[true]);
        let mut booking = dry_run_booking();

        let summary = run_passes(&mut booking, &first, &follow, &options(false, Passes::FollowUp), &prompt).await;

        assert_eq!(summary.first_visits, PassSummary::default());
        assert_eq!(summary.follow_ups.scheduled, 1);
    }

    #[tokio::test]
    async fn test_unrecorded_booking_stops_the_run() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path_regex(r"/values/Visitas!B5$"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "updatedCells": 1 })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"/values/Visitas!C5$"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = TestConfig::with_sheets_url(&server.uri()).to_app_config();
        let hospitals = HospitalDirectory::from_table(&SheetFixtures::table(SheetFixtures::hospitals())).unwrap();
        let doctors = DoctorDirectory::from_tables(
            &SheetFixtures::table(SheetFixtures::professionals()),
            &SheetFixtures::table(SheetFixtures::professionals_hospitals()),
        )
        .unwrap();
        let sheets = Arc::new(GoogleSheetsClient::with_base_url(
            &server.uri(),
            Arc::new(StaticTokenProvider::new("test-google-token")),
        ));
        let mut booking = BookingService::new(
            Arc::new(hospitals),
            DoctorMatchingService::new(Arc::new(doctors)),
            Accepting,
            VisitRowWriter::new(sheets, MANAGEMENT_SHEET_ID, "Visitas", 5, false),
            BookingSettings::from_config(&config, false),
            StdRng::seed_from_u64(1),
        );

        let (first, follow) = candidates();
        let prompt = ScriptedPrompt::new(&[true; 4]);

        let summary = run_passes(&mut booking, &first, &follow, &options(false, Passes::All), &prompt).await;

        assert!(summary.aborted);
        assert_eq!(summary.first_visits.unrecorded, 1);
        assert_eq!(summary.first_visits.scheduled, 0);
        assert_eq!(summary.follow_ups, PassSummary::default());
        assert_eq!(prompt.times_asked(), 0);
        assert_eq!(booking.next_visit_row(), 6);
    }

    #[tokio::test]
    async fn test_load_sheets_reads_every_range() {
        let server = MockServer::start().await;

        let ranges = [
            (MANAGEMENT_SHEET_ID, RANGE_PATIENTS, SheetFixtures::patients()),
            (MANAGEMENT_SHEET_ID, RANGE_VISITS, SheetFixtures::visits()),
            (HOSPITALS_SHEET_ID, RANGE_HOSPITALS, SheetFixtures::hospitals()),
            (
                HOSPITALS_SHEET_ID,
                RANGE_PROFESSIONALS_HOSPITALS,
                SheetFixtures::professionals_hospitals(),
            ),
            (MANAGEMENT_SHEET_ID, RANGE_PROFESSIONALS, SheetFixtures::professionals()),
        ];

        for (sheet_id, range, values) in ranges {
            Mock::given(method("GET"))
                .and(path(format!("/v4/spreadsheets/{}/values/{}", sheet_id, range)))
                .respond_with(ResponseTemplate::new(200).set_body_json(SheetFixtures::response(range, values)))
                .expect(1)
                .mount(&server)
                .await;
        }

        let config = TestConfig::with_sheets_url(&server.uri()).to_app_config();
        let sheets = GoogleSheetsClient::with_base_url(
            &server.uri(),
            Arc::new(StaticTokenProvider::new("test-google-token")),
        );

        let data = load_sheets(&sheets, &config).await.unwrap();

        assert_eq!(data.patients.len(), 5);
        assert_eq!(data.visits.len(), 3);
        assert_eq!(data.hospitals.len(), 3);
        assert_eq!(data.professionals_hospitals.len(), 4);
        assert_eq!(data.professionals.len(), 3);
    }
}
