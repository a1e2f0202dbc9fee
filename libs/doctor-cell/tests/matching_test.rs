use std::collections::HashSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use rand::rngs::StdRng;
use rand::SeedableRng;

use doctor_cell::{DoctorAssignment, DoctorDirectory, DoctorError, DoctorMatchingService};
use shared_utils::test_utils::SheetFixtures;

fn matching(links: Vec<Vec<String>>) -> DoctorMatchingService {
    let directory = DoctorDirectory::from_tables(
        &SheetFixtures::table(SheetFixtures::professionals()),
        &SheetFixtures::table(links),
    )
    .unwrap();
    DoctorMatchingService::new(Arc::new(directory))
}

#[test]
fn test_first_visit_picks_eligible_doctor() {
    let service = matching(SheetFixtures::professionals_hospitals());
    let mut rng = StdRng::seed_from_u64(7);

    let cpf = service.assign("123", &DoctorAssignment::FirstVisit, &mut rng).unwrap();
    assert_eq!(cpf, "111.111.111-11");
}

#[test]
fn test_first_visit_spreads_over_all_eligible_doctors() {
    let mut links = SheetFixtures::professionals_hospitals();
    links.push(vec![
        "222.222.222-22".into(),
        "Dr. Bruno Lima".into(),
        "123".into(),
        "Ativo".into(),
        "Sim".into(),
    ]);
    let service = matching(links);
    let mut rng = StdRng::seed_from_u64(42);

    let picked: HashSet<String> = (0..64)
        .map(|_| service.assign("0000000123", &DoctorAssignment::FirstVisit, &mut rng).unwrap())
        .collect();

    let expected: HashSet<String> = ["111.111.111-11", "222.222.222-22"].iter().map(|s| s.to_string()).collect();
    assert_eq!(picked, expected);
}

#[test]
fn test_first_visit_without_doctors() {
    let service = matching(SheetFixtures::professionals_hospitals());
    let mut rng = StdRng::seed_from_u64(1);

    assert_eq!(
        service.assign("789", &DoctorAssignment::FirstVisit, &mut rng),
        Err(DoctorError::NoDoctorForHospital("789".to_string()))
    );
}

#[test]
fn test_follow_up_keeps_current_doctor() {
    let service = matching(SheetFixtures::professionals_hospitals());
    let mut rng = StdRng::seed_from_u64(1);

    let assignment = DoctorAssignment::FollowUp {
        current_doctor_name: "Dr. Bruno Lima".to_string(),
    };

    // Bruno does not attend hospital 123, but follow-ups ignore eligibility.
    assert_eq!(service.assign("123", &assignment, &mut rng).unwrap(), "222.222.222-22");
}

#[test]
fn test_follow_up_with_inactive_doctor() {
    let service = matching(SheetFixtures::professionals_hospitals());
    let mut rng = StdRng::seed_from_u64(1);

    let assignment = DoctorAssignment::FollowUp {
        current_doctor_name: "Dr. Carlos Dias".to_string(),
    };

    assert_matches!(service.assign("456", &assignment, &mut rng), Err(DoctorError::NotFound(name)) if name == "Dr. Carlos Dias");
}
