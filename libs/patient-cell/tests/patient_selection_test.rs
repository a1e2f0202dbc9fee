use assert_matches::assert_matches;

use patient_cell::{PatientError, PatientService};
use shared_models::{SheetTable, SheetTableError};
use shared_utils::test_utils::SheetFixtures;

fn service() -> PatientService {
    PatientService::new(
        SheetFixtures::table(SheetFixtures::patients()),
        SheetFixtures::table(SheetFixtures::visits()),
    )
    .unwrap()
}

#[test]
fn test_first_visit_candidates_match_all_three_predicates() {
    let candidates = service().patients_awaiting_first_visit();

    let carteirinhas: Vec<&str> = candidates.iter().map(|p| p.carteirinha.as_str()).collect();
    assert_eq!(carteirinhas, vec!["1001", "1005"]);

    let first = &candidates[0];
    assert_eq!(first.in_hospital_stay_code, "SEN-1");
    assert_eq!(first.hospital_id, "123");
    assert_eq!(first.amplimed_id, "AMP-P1");
    assert_eq!(first.first_visit_deadline, "15/11/2026");
    assert_eq!(first.sheet_row, 2);
    assert_eq!(candidates[1].sheet_row, 6);
}

#[test]
fn test_follow_up_candidates_keep_sheet_order() {
    let visits = service().visits_awaiting_follow_up();

    assert_eq!(visits.len(), 2);
    assert_eq!(visits[0].carteirinha, "1002");
    assert_eq!(visits[0].doctor_name, "Dra. Ana Souza");
    assert_eq!(visits[0].suggested_date, "20/11/2026");
    assert_eq!(visits[0].hospital_id, "123");
    assert_eq!(visits[1].carteirinha, "1007");
    assert_eq!(visits[1].sheet_row, 4);
}

#[test]
fn test_missing_cells_never_match() {
    let mut patients = SheetFixtures::patients();
    // Trailing cells trimmed by the API: no Amplimed status, no deadline.
    patients.push(vec!["1008".into(), "SEN-8".into(), "123".into(), "AMP-P8".into(), "Novo".into(), "0".into()]);

    let service = PatientService::new(
        SheetFixtures::table(patients),
        SheetFixtures::table(SheetFixtures::visits()),
    )
    .unwrap();

    assert!(service
        .patients_awaiting_first_visit()
        .iter()
        .all(|p| p.carteirinha != "1008"));
}

#[test]
fn test_next_visit_row_counts_present_carteirinhas() {
    assert_eq!(service().next_visit_row(), 5);

    let mut visits = SheetFixtures::visits();
    visits.push(vec!["4".into(), "".into()]);
    visits.push(vec!["5".into()]);

    let service = PatientService::new(
        SheetFixtures::table(SheetFixtures::patients()),
        SheetFixtures::table(visits),
    )
    .unwrap();

    // An empty carteirinha still occupies its row; a missing one does not.
    assert_eq!(service.next_visit_row(), 6);
}

#[test]
fn test_missing_column_is_reported() {
    let patients = SheetTable::from_values(vec![vec!["Carteirinha".to_string()]]).unwrap();

    let result = PatientService::new(patients, SheetFixtures::table(SheetFixtures::visits()));

    assert_matches!(
        result.err(),
        Some(PatientError::PatientsSheet(SheetTableError::MissingColumn(column))) if column == "Senha"
    );
}
