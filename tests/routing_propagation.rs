//! Shadow propagation and incremental scoring over random route edits.

use std::sync::Arc;

use planning_core::config::PlanningConfig;
use planning_core::demo_data::{generate_route_plan, random_route_move, DemoData};
use planning_core::director::ScoreDirector;
use planning_core::error::PlanningError;
use planning_core::routing::{define_constraints, RouteMove, VehicleRoutePlan};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn plan(seed: u64) -> VehicleRoutePlan {
    generate_route_plan(DemoData::Small, seed, 50.0).unwrap()
}

fn director(seed: u64) -> ScoreDirector<VehicleRoutePlan> {
    ScoreDirector::new(plan(seed), Arc::new(define_constraints(&PlanningConfig::default()))).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn shadows_stay_consistent_after_random_edits(seed in any::<u64>(), steps in 1usize..150) {
        let mut plan = plan(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        for _ in 0..steps {
            let mv = random_route_move(&plan, &mut rng).unwrap();
            plan.apply_route_move(&mv).unwrap();
        }
        prop_assert!(plan.verify_shadows().is_ok(), "{:?}", plan.verify_shadows());
    }

    #[test]
    fn incremental_score_matches_full_recalculation(seed in any::<u64>(), steps in 1usize..150) {
        let mut director = director(seed);
        let mut rng = StdRng::seed_from_u64(seed.wrapping_add(1));
        for _ in 0..steps {
            let mv = random_route_move(director.working_solution(), &mut rng).unwrap();
            director.apply_move(&mv).unwrap();
        }
        prop_assert_eq!(director.calculate_score_from_scratch().unwrap(), director.score());
        prop_assert_eq!(director.explain().unwrap().score, director.score());
    }

    #[test]
    fn undo_restores_score_and_shadows(seed in any::<u64>(), steps in 1usize..60) {
        let mut director = director(seed);
        let initial = director.score();
        let initial_travel = director.working_solution().total_travel_time();
        let mut rng = StdRng::seed_from_u64(seed);

        let mut undos = Vec::new();
        for _ in 0..steps {
            let mv = random_route_move(director.working_solution(), &mut rng).unwrap();
            undos.push(director.apply_move(&mv).unwrap().undo);
        }
        for undo in undos.into_iter().rev() {
            director.apply_move(&undo).unwrap();
        }

        prop_assert_eq!(director.score(), initial);
        prop_assert_eq!(director.working_solution().total_travel_time(), initial_travel);
        prop_assert!(director.working_solution().verify_shadows().is_ok());
    }
}

#[test]
fn unassigned_visits_have_no_arrival() {
    let mut plan = plan(11);
    let assigned: Vec<usize> = (0..plan.visits().len())
        .filter(|&v| plan.visits()[v].is_assigned())
        .collect();
    for &visit in &assigned {
        plan.apply_route_move(&RouteMove::Unassign { visit }).unwrap();
        assert!(plan.visits()[visit].arrival_time().is_none());
        assert!(matches!(
            plan.travel_time_from_previous(visit),
            Err(PlanningError::InvalidState(_))
        ));
        assert!(matches!(
            plan.visits()[visit].require_arrival_time(),
            Err(PlanningError::InvalidState(_))
        ));
        assert!(matches!(
            plan.visits()[visit].require_departure_time(),
            Err(PlanningError::InvalidState(_))
        ));
    }
    assert_eq!(plan.assigned_visit_count(), 0);
    assert_eq!(plan.total_travel_time(), 0);
    assert!(plan.verify_shadows().is_ok());
}

#[test]
fn reapplying_identical_edit_changes_nothing() {
    let mut plan = plan(5);
    let (vehicle, visit) = plan
        .vehicles()
        .iter()
        .enumerate()
        .find_map(|(v, vehicle)| vehicle.visits().first().map(|&visit| (v, visit)))
        .unwrap();

    let before: Vec<_> = plan.visits().iter().map(|v| v.arrival_time()).collect();
    let applied = plan
        .apply_route_move(&RouteMove::Change { visit, vehicle, position: 0 })
        .unwrap();
    let after: Vec<_> = plan.visits().iter().map(|v| v.arrival_time()).collect();

    assert!(applied.touched_groups.is_empty());
    assert_eq!(before, after);
}

#[test]
fn invalid_edits_leave_plan_untouched() {
    let mut director = director(9);
    let score = director.score();
    let visits = director.working_solution().visits().len();
    let vehicles = director.working_solution().vehicles().len();

    for mv in [
        RouteMove::Unassign { visit: visits },
        RouteMove::Assign { visit: 0, vehicle: vehicles, position: 0 },
        RouteMove::Change { visit: 0, vehicle: 0, position: visits + 1 },
    ] {
        assert!(director.apply_move(&mv).is_err(), "{}", mv);
    }
    assert_eq!(director.score(), score);
    assert!(director.working_solution().verify_shadows().is_ok());
}
