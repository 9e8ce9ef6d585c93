use criterion::*;

use c4solver::{BitBoard, SolveMode, Solver};

// early-game openings, the most expensive positions per ply of depth
const EARLY_01: &str = "4";
const EARLY_02: &str = "4455";

// midgame positions with live threats on both sides
const MID_01: &str = "444455553";
const MID_02: &str = "43443551512";

// solvers are built outside the timing loop so the table allocation is
// paid once; after the first iteration the table is warm but stable
fn bench_weak(crit: &mut Criterion) {
    let mut early = Solver::new(black_box(BitBoard::from_moves(EARLY_01).unwrap()));
    let mut mid = Solver::new(black_box(BitBoard::from_moves(MID_01).unwrap()));

    crit.bench_function("weak_early_d11", |b| {
        b.iter(|| early.solve(11, SolveMode::Weak))
    });
    crit.bench_function("weak_mid_d13", |b| b.iter(|| mid.solve(13, SolveMode::Weak)));
}

fn bench_strong(crit: &mut Criterion) {
    let mut early = Solver::new(black_box(BitBoard::from_moves(EARLY_02).unwrap()));
    let mut mid = Solver::new(black_box(BitBoard::from_moves(MID_02).unwrap()));

    crit.bench_function("strong_early_d11", |b| {
        b.iter(|| early.solve(11, SolveMode::Strong))
    });
    crit.bench_function("strong_mid_d13", |b| {
        b.iter(|| mid.solve(13, SolveMode::Strong))
    });
}

criterion_group!(benches, bench_weak, bench_strong);
criterion_main!(benches);
