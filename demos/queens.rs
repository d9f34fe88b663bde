use clap::{Parser, ValueEnum};
use log::info;

use robdd_rs::bdd::BddKernel;
use robdd_rs::compile::{compile_with_kernel, default_cache_size, default_node_size};
use robdd_rs::factory::DefaultFactory;
use robdd_rs::formula::{Formula, Variable};
use robdd_rs::ordering::VariableOrdering;
use robdd_rs::reorder::ReorderMethod;

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Ordering {
    Insertion,
    Bfs,
    Dfs,
    MinToMax,
    MaxToMin,
    Force,
}

#[derive(Debug, Copy, Clone, ValueEnum)]
enum Reorder {
    None,
    Win2,
    Win3,
    Sift,
    SiftIte,
    Random,
}

impl From<Reorder> for ReorderMethod {
    fn from(value: Reorder) -> Self {
        match value {
            Reorder::None => ReorderMethod::None,
            Reorder::Win2 => ReorderMethod::Win2,
            Reorder::Win3 => ReorderMethod::Win3,
            Reorder::Sift => ReorderMethod::Sift,
            Reorder::SiftIte => ReorderMethod::SiftIte,
            Reorder::Random => ReorderMethod::Random,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Number of queens.
    #[arg(value_name = "INT", default_value = "8")]
    n: usize,

    /// Static variable ordering computed before compilation.
    #[clap(long, value_enum, default_value = "insertion")]
    ordering: Ordering,

    /// Reordering applied once after compilation.
    #[clap(long, value_enum, default_value = "none")]
    reorder: Reorder,

    /// Print every solution (only sensible for small boards).
    #[clap(long)]
    print: bool,
}

/// `q_i_j`: a queen stands in row `i`, column `j`.
fn queens_formula(n: usize) -> (Vec<Vec<Variable>>, Formula) {
    let q: Vec<Vec<Variable>> = (0..n)
        .map(|i| (0..n).map(|j| Variable::new(format!("q_{}_{}", i, j))).collect())
        .collect();

    let mut constraints = Vec::new();
    for i in 0..n {
        constraints.push(Formula::exactly_one(q[i].iter().cloned()));
    }
    for j in 0..n {
        constraints.push(Formula::exactly_one((0..n).map(|i| q[i][j].clone())));
    }
    // Diagonals in both directions, identified by `i - j` and `i + j`.
    for d in 0..2 * n - 1 {
        let falling: Vec<Variable> = (0..n)
            .filter_map(|i| (i + n - 1).checked_sub(d).filter(|&j| j < n).map(|j| q[i][j].clone()))
            .collect();
        let rising: Vec<Variable> = (0..n).filter_map(|i| d.checked_sub(i).filter(|&j| j < n).map(|j| q[i][j].clone())).collect();
        for diag in [falling, rising] {
            if diag.len() > 1 {
                constraints.push(Formula::at_most_one(diag));
            }
        }
    }
    (q, Formula::and(constraints))
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let n = args.n;
    println!("Encoding n-queens problem with n = {}", n);
    let (q, formula) = queens_formula(n);

    let ordering = match args.ordering {
        Ordering::Insertion => q.iter().flatten().cloned().collect(),
        Ordering::Bfs => VariableOrdering::Bfs.order(&DefaultFactory, &formula),
        Ordering::Dfs => VariableOrdering::Dfs.order(&DefaultFactory, &formula),
        Ordering::MinToMax => VariableOrdering::MinToMax.order(&DefaultFactory, &formula),
        Ordering::MaxToMin => VariableOrdering::MaxToMin.order(&DefaultFactory, &formula),
        Ordering::Force => VariableOrdering::Force.order(&DefaultFactory, &formula),
    };
    let var_count = ordering.len();
    let kernel = BddKernel::with_ordering(&ordering, default_node_size(var_count), default_cache_size(var_count));
    println!("kernel = {:?}", kernel);

    let time_compile = std::time::Instant::now();
    let bdd = compile_with_kernel(&formula, &kernel)?;
    info!("Compiled in {:.3} s", time_compile.elapsed().as_secs_f64());
    println!("res of size {}", bdd.node_count());

    if !matches!(args.reorder, Reorder::None) {
        kernel.add_all_variables_as_block();
        let stats = kernel.reorder(args.reorder.into());
        println!(
            "Reordered with {:?}: {} -> {} nodes ({:.1}% smaller, {} swaps)",
            args.reorder,
            stats.initial_size,
            stats.final_size,
            stats.reduction_percent(),
            stats.swaps
        );
        println!("res of size {}", bdd.node_count());
    }

    println!("Number of solutions: {}", bdd.model_count());

    if args.print {
        let all: Vec<Variable> = q.iter().flatten().cloned().collect();
        for model in bdd.model_enumeration(&all) {
            for row in &q {
                let line: String = row
                    .iter()
                    .map(|v| if model.contains(&v.pos()) { 'Q' } else { '.' })
                    .collect();
                println!("{}", line);
            }
            println!();
        }
    }

    let stats = kernel.statistics();
    println!("cache hits: {}", stats.cache_hits);
    println!("cache misses: {}", stats.cache_misses);
    println!("gc runs: {}", stats.gc_runs);

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
