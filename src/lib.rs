//! # robdd-rs: Reduced Ordered Binary Decision Diagrams in Rust
//!
//! **`robdd-rs`** compiles propositional formulas into **Reduced Ordered Binary Decision Diagrams**
//! and answers questions about them: model counting, model enumeration, quantification,
//! restriction and conversion back into CNF or DNF.
//!
//! ## What is a BDD?
//!
//! A Binary Decision Diagram is a data structure that represents a boolean function as a directed acyclic graph.
//! It is **canonical**: for a fixed variable ordering, every boolean function has exactly one representation.
//! Equivalence checking is therefore a comparison of node indices.
//!
//! ## Key Features
//!
//! - **Shared kernel**: all BDDs of a [`Kernel`][crate::kernel::Kernel] live in one hash-consed node table.
//!   Nodes are reference counted and reclaimed by a mark-sweep garbage collector; the table grows on demand.
//! - **Operation caches**: every recursive operation is memoized in a fixed-size cache.
//! - **Dynamic reordering**: sifting and window permutation over variable blocks, on request or automatically
//!   while a formula is being compiled.
//! - **Cancellation**: compilation polls a [`ComputationHandler`][crate::handler::ComputationHandler], so node
//!   budgets and timeouts abort cleanly.
//!
//! ## Basic Usage
//!
//! ```rust
//! use num_bigint::BigUint;
//! use robdd_rs::compile::compile;
//! use robdd_rs::formula::{Formula, Variable};
//!
//! // Exactly one of a, b, c.
//! let vars = ["a", "b", "c"].map(Variable::new);
//! let f = Formula::exactly_one(vars.clone());
//! let bdd = compile(&f).unwrap();
//!
//! assert_eq!(bdd.model_count(), BigUint::from(3u32));
//! assert!(!bdd.is_tautology());
//!
//! // Projecting `a` away leaves "at most one of b, c".
//! let g = bdd.exists(&vars[..1]);
//! assert_eq!(g.model_count(), BigUint::from(6u32));
//! ```
//!
//! ## Core Components
//!
//! - **[`kernel`]**: node table, reference counting, garbage collection and variable sets.
//! - **[`apply`]**, **[`quantify`]**, **[`count`]**, **[`sat`]**, **[`paths`]**: operations on node indices.
//! - **[`reorder`]** and **[`blocks`]**: dynamic variable reordering.
//! - **[`compile`]** and **[`ordering`]**: from formulas to BDDs.
//! - **[`bdd`]**: reference-counted handles, the convenient entry point.

pub mod apply;
pub mod bdd;
pub mod blocks;
pub mod cache;
pub mod compile;
pub mod count;
pub mod debug;
pub mod error;
pub mod factory;
pub mod formula;
pub mod handler;
pub mod kernel;
pub mod node;
pub mod ordering;
pub mod paths;
pub mod primes;
pub mod quantify;
pub mod reference;
pub mod reorder;
pub mod sat;
pub mod table;
pub mod types;
pub mod utils;
