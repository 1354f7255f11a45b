//! Benchmarks for the strategy engine.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use reactive_strategy::engine::{EngineConfig, Move, PerRole, Policy, ReactivePlayer};
use reactive_strategy::games::prisoners::{run_scenario, PrisonersTree, Scenario};

fn single_round_benchmark(c: &mut Criterion) {
    let tree = PrisonersTree::sequential();
    let terminals = PerRole::new(
        tree.terminal_for(Move::Cooperate, Move::Defect),
        tree.terminal_for(Move::Defect, Move::Cooperate),
    );
    let mut player = ReactivePlayer::new(EngineConfig::default().with_seed(42)).unwrap();

    c.bench_function("sequential_single_round", |b| {
        b.iter(|| {
            let mut request = tree.request_after(terminals);
            black_box(player.respond(&tree, &mut request).unwrap())
        })
    });
}

fn match_benchmark(c: &mut Criterion) {
    let scenario = Scenario::new("bench", 1000)
        .with_opponent(vec![Move::Cooperate, Move::Cooperate, Move::Defect]);

    for policy in [Policy::gradual(), Policy::hybrid()] {
        let config = EngineConfig::default().with_policy(policy.clone()).with_seed(42);
        c.bench_function(&format!("{}_1000_rounds", policy.name()), |b| {
            b.iter(|| run_scenario(&config, black_box(&scenario)).unwrap())
        });
    }
}

criterion_group!(benches, single_round_benchmark, match_benchmark);
criterion_main!(benches);
