mod common;

use num_bigint::BigUint;
use rand::prelude::*;
use rand::rngs::StdRng;
use test_log::test;

use robdd_rs::bdd::BddKernel;
use robdd_rs::compile::compile_with_kernel;
use robdd_rs::debug::check_invariants;
use robdd_rs::formula::Variable;
use robdd_rs::reorder::ReorderMethod;

use common::{pairs, queens};

#[test]
fn test_sifting_finds_the_interleaved_order() {
    let (f, _, separated) = pairs(4);
    let kernel = BddKernel::with_ordering(&separated, 200, 100);
    let bdd = compile_with_kernel(&f, &kernel).unwrap();
    assert_eq!(bdd.node_count(), 30);
    let count = bdd.model_count();

    kernel.add_all_variables_as_block();
    let stats = kernel.reorder(ReorderMethod::Sift);
    assert!(bdd.node_count() < 30, "sifting left {} nodes", bdd.node_count());
    assert!(stats.final_size <= stats.initial_size);
    assert_eq!(bdd.model_count(), count);

    // Canonicity under the new order: recompiling lands on the same node.
    let again = compile_with_kernel(&f, &kernel).unwrap();
    assert_eq!(again, bdd);
    check_invariants(&kernel.borrow());
}

#[test]
fn test_reordering_preserves_queens() {
    for method in [
        ReorderMethod::Win2,
        ReorderMethod::Win2Ite,
        ReorderMethod::Win3,
        ReorderMethod::Win3Ite,
        ReorderMethod::Sift,
        ReorderMethod::SiftIte,
        ReorderMethod::Random,
    ] {
        let (vars, f) = queens(5);
        let kernel = BddKernel::with_ordering(&vars, 1000, 1000);
        let bdd = compile_with_kernel(&f, &kernel).unwrap();
        let before = bdd.node_count();

        kernel.add_all_variables_as_block();
        kernel.reorder(method);
        assert_eq!(bdd.model_count(), BigUint::from(10u32), "{:?}", method);
        if method != ReorderMethod::Random {
            assert!(bdd.node_count() <= before, "{:?} grew {} to {}", method, before, bdd.node_count());
        }
        let again = compile_with_kernel(&f, &kernel).unwrap();
        assert_eq!(again, bdd, "{:?}", method);
        check_invariants(&kernel.borrow());
    }
}

#[test]
fn test_swap_variables() {
    let (f, _, separated) = pairs(3);
    let kernel = BddKernel::with_ordering(&separated, 200, 100);
    let bdd = compile_with_kernel(&f, &kernel).unwrap();
    assert_eq!(bdd.node_count(), 14);

    // a0 a1 a2 b0 b1 b2  ->  a0 b0 a2 a1 b1 b2
    kernel.swap_variables(&Variable::new("a1"), &Variable::new("b0")).unwrap();
    let order: Vec<String> = bdd.variable_order().iter().map(|v| v.name().to_string()).collect();
    assert_eq!(order, ["a0", "b0", "a2", "a1", "b1", "b2"]);
    assert_eq!(bdd.model_count(), BigUint::from(64u32 - 27));
    check_invariants(&kernel.borrow());

    assert!(kernel.swap_variables(&Variable::new("a0"), &Variable::new("zz")).is_err());
}

#[test]
fn test_fixed_blocks_keep_their_order() {
    let (f, _, separated) = pairs(3);
    let kernel = BddKernel::with_ordering(&separated, 200, 100);
    let bdd = compile_with_kernel(&f, &kernel).unwrap();

    let a0 = kernel.index_for_variable(&Variable::new("a0")).unwrap();
    let a2 = kernel.index_for_variable(&Variable::new("a2")).unwrap();
    kernel.add_variable_block(a0, a2, true).unwrap();
    kernel.add_all_variables_as_block();
    kernel.reorder(ReorderMethod::Sift);

    let order = bdd.variable_order();
    let pos = |name: &str| order.iter().position(|v| v.name() == name).unwrap();
    assert_eq!(pos("a1"), pos("a0") + 1);
    assert_eq!(pos("a2"), pos("a1") + 1);
    check_invariants(&kernel.borrow());
}

#[test]
fn test_reorder_during_build() {
    let (f, _, separated) = pairs(6);
    let kernel = BddKernel::with_ordering(&separated, 40, 100);
    kernel.add_all_variables_as_block();
    kernel.activate_reorder_during_build(ReorderMethod::Sift, 1);
    let bdd = compile_with_kernel(&f, &kernel).unwrap();

    assert_eq!(kernel.statistics().reorders, 1);
    // 4096 assignments, 729 of which falsify every pair.
    assert_eq!(bdd.model_count(), BigUint::from(4096u32 - 729));
    let again = compile_with_kernel(&f, &kernel).unwrap();
    assert_eq!(again, bdd);
    check_invariants(&kernel.borrow());
}

#[test]
fn test_random_reorders_keep_every_root() {
    let mut rng = StdRng::seed_from_u64(7);
    let vars = common::vars("x", 8);
    let kernel = BddKernel::with_ordering(&vars, 500, 500);
    let formulas: Vec<_> = (0..10).map(|_| common::random_formula(&mut rng, &vars, 4)).collect();
    let bdds: Vec<_> = formulas.iter().map(|f| compile_with_kernel(f, &kernel).unwrap()).collect();
    let counts: Vec<_> = bdds.iter().map(|b| b.model_count()).collect();

    kernel.add_all_variables_as_block();
    for _ in 0..5 {
        kernel.reorder(ReorderMethod::Random);
        check_invariants(&kernel.borrow());
        for ((f, bdd), count) in formulas.iter().zip(&bdds).zip(&counts) {
            assert_eq!(&bdd.model_count(), count);
            assert_eq!(&compile_with_kernel(f, &kernel).unwrap(), bdd);
        }
    }
}
