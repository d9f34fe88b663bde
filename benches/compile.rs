//! Compilation benchmarks.
//!
//! N-queens is the canonical BDD workload: small formulas whose compiled
//! diagrams exercise the apply cache, garbage collection and table growth.
//!
//! Run with:
//! ```bash
//! cargo bench --bench compile
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use rand::rngs::StdRng;

use robdd_rs::bdd::BddKernel;
use robdd_rs::compile::{compile, compile_with_kernel};
use robdd_rs::formula::{Formula, Variable};
use robdd_rs::reorder::ReorderMethod;

fn queens(n: usize) -> Formula {
    let q = |i: usize, j: usize| Variable::new(format!("q_{}_{}", i, j));
    let mut constraints = Vec::new();
    for i in 0..n {
        constraints.push(Formula::exactly_one((0..n).map(|j| q(i, j))));
        constraints.push(Formula::exactly_one((0..n).map(|j| q(j, i))));
    }
    for i in 0..n {
        for j in 0..n {
            for k in i + 1..n {
                let d = k - i;
                for l in [j + d, j.wrapping_sub(d)] {
                    if l < n {
                        constraints.push(Formula::or([Formula::lit(q(i, j).neg()), Formula::lit(q(k, l).neg())]));
                    }
                }
            }
        }
    }
    Formula::and(constraints)
}

/// Random 3-CNF over `vars` variables.
fn random_cnf(rng: &mut StdRng, vars: usize, clauses: usize) -> Formula {
    Formula::and((0..clauses).map(|_| {
        Formula::or((0..3).map(|_| {
            let v = Variable::new(format!("x{}", rng.gen_range(0..vars)));
            Formula::lit(if rng.gen_bool(0.5) { v.pos() } else { v.neg() })
        }))
    }))
}

fn bench_queens(c: &mut Criterion) {
    let mut group = c.benchmark_group("queens");
    group.sample_size(10);
    for n in [4, 5, 6, 7] {
        let formula = queens(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &formula, |b, f| {
            b.iter(|| compile(f).unwrap().node_count())
        });
    }
    group.finish();
}

fn bench_random_cnf(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_3cnf");
    group.sample_size(10);
    for vars in [20, 30, 40] {
        let mut rng = StdRng::seed_from_u64(42);
        let formula = random_cnf(&mut rng, vars, vars * 3);
        group.bench_with_input(BenchmarkId::from_parameter(vars), &formula, |b, f| {
            b.iter(|| compile(f).unwrap().model_count())
        });
    }
    group.finish();
}

fn bench_sifting(c: &mut Criterion) {
    let mut group = c.benchmark_group("sifting");
    group.sample_size(10);
    for n in [4, 5, 6] {
        let formula = queens(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &formula, |b, f| {
            b.iter(|| {
                let kernel = BddKernel::new((n * n) as u32, 20_000, 20_000);
                let bdd = compile_with_kernel(f, &kernel).unwrap();
                kernel.add_all_variables_as_block();
                kernel.reorder(ReorderMethod::Sift);
                bdd.node_count()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_queens, bench_random_cnf, bench_sifting);
criterion_main!(benches);
