use assert_matches::assert_matches;

use doctor_cell::{DoctorDirectory, DoctorError, HospitalDirectory};
use shared_models::{SheetTable, SheetTableError};
use shared_utils::test_utils::SheetFixtures;

fn doctors() -> DoctorDirectory {
    DoctorDirectory::from_tables(
        &SheetFixtures::table(SheetFixtures::professionals()),
        &SheetFixtures::table(SheetFixtures::professionals_hospitals()),
    )
    .unwrap()
}

#[test]
fn test_hospital_lookup_pads_code() {
    let hospitals = HospitalDirectory::from_table(&SheetFixtures::table(SheetFixtures::hospitals())).unwrap();

    assert_eq!(hospitals.len(), 2);
    assert_eq!(hospitals.amplimed_id("123"), Some("H-AMP-123"));
    assert_eq!(hospitals.amplimed_id("0000000456"), Some("H-AMP-456"));
}

#[test]
fn test_hospital_without_operation_is_not_found() {
    let hospitals = HospitalDirectory::from_table(&SheetFixtures::table(SheetFixtures::hospitals())).unwrap();

    assert_eq!(hospitals.amplimed_id("789"), None);
    assert_eq!(hospitals.amplimed_id("999"), None);
}

#[test]
fn test_hospital_with_blank_amplimed_id_is_not_found() {
    let mut values = SheetFixtures::hospitals();
    values.push(vec!["0000000321".into(), "Hospital Leste".into(), "".into(), "Sim".into()]);
    let hospitals = HospitalDirectory::from_table(&SheetFixtures::table(values)).unwrap();

    assert_eq!(hospitals.amplimed_id("321"), None);
}

#[test]
fn test_lookups_only_see_active_professionals() {
    let directory = doctors();

    assert_eq!(directory.amplimed_id_by_cpf("111.111.111-11"), Some("D-AMP-1"));
    assert_eq!(directory.name_by_cpf("222.222.222-22"), Some("Dr. Bruno Lima"));
    assert_eq!(directory.cpf_by_name("Dra. Ana Souza"), Some("111.111.111-11"));

    // Carlos is inactive.
    assert_eq!(directory.amplimed_id_by_cpf("333.333.333-33"), None);
    assert_eq!(directory.cpf_by_name("Dr. Carlos Dias"), None);
}

#[test]
fn test_doctors_for_hospital_requires_active_and_attending() {
    let directory = doctors();

    assert_eq!(directory.doctors_for_hospital("123"), vec!["111.111.111-11"]);
    assert_eq!(directory.doctors_for_hospital("456"), vec!["222.222.222-22"]);
    assert!(directory.doctors_for_hospital("789").is_empty());
}

#[test]
fn test_missing_professional_column() {
    let professionals = SheetTable::from_values(vec![vec!["CPF".to_string(), "Status".to_string()]]).unwrap();

    let result = DoctorDirectory::from_tables(
        &professionals,
        &SheetFixtures::table(SheetFixtures::professionals_hospitals()),
    );

    assert_matches!(
        result.err(),
        Some(DoctorError::ProfessionalsSheet(SheetTableError::MissingColumn(_)))
    );
}
