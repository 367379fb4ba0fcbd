//! Benchmark for incremental scoring performance.
//!
//! Run with: cargo run --release --bin bench -- [config.toml] [SMALL|LARGE]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use planning_core::config::PlanningConfig;
use planning_core::console::{self, PhaseTimer};
use planning_core::demo_data::{self, DemoData};
use planning_core::director::{PlanningSolution, ScoreDirector};
use planning_core::error::Result;
use planning_core::parallel;
use planning_core::{routing, scheduling};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Moves generated per domain.
const MOVE_COUNT: usize = 20_000;
/// Candidates scored by the parallel batch.
const CANDIDATE_COUNT: usize = 2_000;

struct Outcome {
    elapsed: Duration,
    moves: u64,
    verified: bool,
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("planning_core=info".parse()?))
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => PlanningConfig::load(&path)?,
        None => PlanningConfig::default(),
    };
    let demo = args
        .next()
        .and_then(|s| s.parse::<DemoData>().ok())
        .unwrap_or(DemoData::Large);
    let seed = config.random_seed.unwrap_or(0);

    console::print_banner();
    info!(demo = demo.as_str(), seed, "Benchmark starting");

    // =========================================================================
    // Routing
    // =========================================================================
    let plan = demo_data::generate_route_plan(demo, seed, config.routing.average_speed_kmph)?;
    console::print_routing_problem(plan.vehicles().len(), plan.visits().len(), plan.locations().len());
    plan.travel_times().warm();

    let mut rng = StdRng::seed_from_u64(seed);
    let moves: Vec<_> = (0..MOVE_COUNT)
        .filter_map(|_| demo_data::random_route_move(&plan, &mut rng))
        .collect();
    let walk: Vec<_> = {
        // Generated against an evolving copy so every edit stays valid
        let mut copy = plan.clone();
        let mut walk = Vec::new();
        for _ in 0..MOVE_COUNT / 10 {
            if let Some(mv) = demo_data::random_route_move(&copy, &mut rng) {
                copy.apply_route_move(&mv)?;
                walk.push(mv);
            }
        }
        walk
    };
    let mut director = ScoreDirector::new(plan, Arc::new(routing::define_constraints(&config)))?;
    let routing_outcome = run("Routing", &mut director, &moves, &walk)?;
    console::print_benchmark_ended(
        routing_outcome.elapsed,
        routing_outcome.moves,
        director.score(),
        routing_outcome.verified,
    );

    // =========================================================================
    // Scheduling
    // =========================================================================
    let schedule = demo_data::generate_schedule(demo, seed)?;
    console::print_scheduling_problem(schedule.employees().len(), schedule.shifts().len());

    let moves: Vec<_> = (0..MOVE_COUNT)
        .filter_map(|_| demo_data::random_shift_move(&schedule, &mut rng))
        .collect();
    let walk: Vec<_> = moves.iter().take(MOVE_COUNT / 10).copied().collect();
    let mut director = ScoreDirector::new(schedule, Arc::new(scheduling::define_constraints(&config)))?;
    let scheduling_outcome = run("Scheduling", &mut director, &moves, &walk)?;
    console::print_benchmark_ended(
        scheduling_outcome.elapsed,
        scheduling_outcome.moves,
        director.score(),
        scheduling_outcome.verified,
    );

    if !(routing_outcome.verified && scheduling_outcome.verified) {
        warn!("Incremental score diverged from a full recalculation");
        std::process::exit(1);
    }
    Ok(())
}

/// Runs do/undo cycles, a parallel candidate batch and a committed walk.
fn run<S: PlanningSolution>(
    name: &str,
    director: &mut ScoreDirector<S>,
    moves: &[S::Move],
    walk: &[S::Move],
) -> Result<Outcome> {
    let initial_score = director.score();

    // Do/undo cycles measure pure incremental scoring throughput
    let mut timer = PhaseTimer::start(format!("{} do/undo", name));
    for mv in moves {
        let applied = director.apply_move(mv)?;
        director.apply_move(&applied.undo)?;
        timer.record_moves(2);
    }
    let (mut elapsed, mut total_moves) = timer.finish(director.score());
    let mut verified = director.score() == initial_score;

    let candidates = &moves[..moves.len().min(CANDIDATE_COUNT)];
    let mut timer = PhaseTimer::start(format!("{} parallel", name));
    let best = parallel::best_candidate(director, candidates)?;
    timer.record_moves(candidates.len() as u64 * 2);
    let (batch_elapsed, batch_moves) = timer.finish(best.map_or(initial_score, |(_, score)| score));
    elapsed += batch_elapsed;
    total_moves += batch_moves;
    if let Some((index, score)) = best {
        info!(index, score = %score, "Best candidate");
    }

    let mut timer = PhaseTimer::start(format!("{} walk", name));
    for mv in walk {
        director.apply_move(mv)?;
        timer.record_moves(1);
    }
    let (walk_elapsed, walk_moves) = timer.finish(director.score());
    elapsed += walk_elapsed;
    total_moves += walk_moves;

    verified &= director.calculate_score_from_scratch()? == director.score();
    console::print_explanation(name, &director.explain()?);

    Ok(Outcome {
        elapsed,
        moves: total_moves,
        verified,
    })
}
