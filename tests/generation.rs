use stryk_engine::fake_slate::{demo_signals, demo_slate};
use stryk_engine::generate::{GenerateRequest, generate_system};
use stryk_engine::risk::RiskProfile;
use stryk_engine::system::{SLATE_SIZE, SystemConfig};

fn request(profile: RiskProfile, seed: u64) -> GenerateRequest {
    let slate = demo_slate(seed);
    let mut request = GenerateRequest::new(slate.clone(), profile, SystemConfig::default(), seed);
    request.signals = demo_signals(&slate, seed);
    request
}

#[test]
fn same_seed_reproduces_the_same_system() {
    for profile in [RiskProfile::Safe, RiskProfile::Balanced, RiskProfile::Risky] {
        let a = generate_system(&request(profile, 31)).unwrap();
        let b = generate_system(&request(profile, 31)).unwrap();

        for (pa, pb) in a.plans.iter().zip(&b.plans) {
            assert_eq!(pa.class, pb.class);
            assert_eq!(pa.covered, pb.covered);
        }
        assert_eq!(a.expected_correct, b.expected_correct);
        assert_eq!(a.rows.unwrap().len(), b.rows.unwrap().len());
    }
}

#[test]
fn plans_come_back_in_slate_order() {
    let req = request(RiskProfile::Risky, 13);
    let system = generate_system(&req).unwrap();
    for (odds, plan) in req.matches.iter().zip(&system.plans) {
        assert_eq!(odds.match_id, plan.match_id);
    }
}

#[test]
fn analytic_expectation_agrees_with_row_enumeration() {
    for profile in [RiskProfile::Safe, RiskProfile::Balanced, RiskProfile::Risky] {
        let system = generate_system(&request(profile, 47)).unwrap();
        let rows = system.rows.as_ref().unwrap();

        let enumerated: f64 =
            rows.iter().map(|r| r.expected_correct).sum::<f64>() / rows.len() as f64;
        assert!(
            (system.expected_correct - enumerated).abs() < 1e-9,
            "{profile:?}: analytic {} vs enumerated {enumerated}",
            system.expected_correct
        );
    }
}

#[test]
fn probabilities_stay_normalized_through_the_pipeline() {
    for profile in [RiskProfile::Safe, RiskProfile::Balanced, RiskProfile::Risky] {
        let system = generate_system(&request(profile, 3)).unwrap();
        for plan in &system.plans {
            assert!(plan.probs.is_normalized(), "{} drifted", plan.match_id);
        }
    }
}

#[test]
fn class_counts_and_cost_match_the_config() {
    let config = SystemConfig::new(6, 0, 7);
    let slate = demo_slate(8);
    let req = GenerateRequest::new(slate, RiskProfile::Balanced, config, 8);
    let system = generate_system(&req).unwrap();

    assert_eq!(system.total_rows, 64);
    assert_eq!(system.cost, 64.0);
    assert_eq!(
        system
            .plans
            .iter()
            .filter(|p| p.class.cardinality() == 2)
            .count(),
        6
    );
    assert_eq!(
        system
            .plans
            .iter()
            .filter(|p| p.class.cardinality() == 3)
            .count(),
        0
    );
    let rows = system.rows.as_ref().unwrap();
    let enumerated = rows.iter().map(|r| r.expected_correct).sum::<f64>() / rows.len() as f64;
    assert!((system.expected_correct - enumerated).abs() < 1e-9);
}

#[test]
fn safe_systems_do_not_depend_on_the_seed_beyond_the_slate() {
    let slate = demo_slate(50);
    let a = generate_system(&GenerateRequest::new(
        slate.clone(),
        RiskProfile::Safe,
        SystemConfig::default(),
        1,
    ))
    .unwrap();
    let b = generate_system(&GenerateRequest::new(
        slate,
        RiskProfile::Safe,
        SystemConfig::default(),
        999,
    ))
    .unwrap();

    for (pa, pb) in a.plans.iter().zip(&b.plans) {
        assert_eq!(pa.class, pb.class);
        assert_eq!(pa.covered, pb.covered);
    }
}

#[test]
fn invalid_inputs_are_rejected_before_generation() {
    // Odds at 1.0 exactly.
    let mut slate = demo_slate(4);
    slate[0].home = 1.0;
    let req = GenerateRequest::new(slate, RiskProfile::Safe, SystemConfig::default(), 4);
    assert!(generate_system(&req).is_err());

    // Counts that do not cover the slate.
    let req = GenerateRequest::new(
        demo_slate(4),
        RiskProfile::Safe,
        SystemConfig::new(5, 1, 5),
        4,
    );
    assert!(generate_system(&req).is_err());

    // A row ceiling below the configured shape.
    let mut req = GenerateRequest::new(
        demo_slate(4),
        RiskProfile::Safe,
        SystemConfig::default(),
        4,
    );
    req.row_ceiling = 64;
    assert!(generate_system(&req).is_err());
}

#[test]
fn system_ids_carry_the_prefix_and_digest() {
    let system = generate_system(&request(RiskProfile::Balanced, 77)).unwrap();
    assert!(system.id.starts_with("sys-"));
    assert_eq!(system.plans.len(), SLATE_SIZE);
}
