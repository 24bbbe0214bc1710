use std::fs;
use std::io::{self, BufRead};
use std::path::PathBuf;

use clap::Parser;
use mdpart::{ModelError, MultiSet, SubsetSpec};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

mod hierarchy;
mod values;

/// Compute optimal rectangular partitions of a multidimensional dataset.
#[derive(Debug, Parser)]
#[command(name = "mdpart")]
struct Args {
    /// Dimension hierarchy file as `NAME=FILE`; repeatable, order fixes the
    /// dimension order.
    #[arg(long = "set", value_name = "NAME=FILE")]
    sets: Vec<String>,

    /// Cell value file (`name_0 … name_{d-1} value` per line; missing cells
    /// default to 0).
    #[arg(long, value_name = "FILE")]
    values: Option<PathBuf>,

    /// Fill every cell with a seeded uniform value before applying --values.
    #[arg(long, value_name = "SEED")]
    random: Option<u64>,

    /// Use the built-in three-dimensional sample space instead of --set files.
    #[arg(long)]
    demo: bool,

    /// Trade-off weight λ ≥ 0; repeatable. Without it, λ values are read from
    /// stdin, one per line.
    #[arg(long = "lambda", value_name = "λ")]
    lambdas: Vec<f64>,

    /// Check that every declared partition exactly tiles its subset.
    #[arg(long)]
    check: bool,

    /// Also list every cell of the grid.
    #[arg(long, short)]
    verbose: bool,

    /// Emit one JSON document per λ instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("bad --set argument '{0}', expected NAME=FILE")]
    BadSetArg(String),
    #[error("no dimensions given (use --set or --demo)")]
    NoDimensions,
}

fn main() -> Result<(), CliError> {
    init_subscriber();
    run(&Args::parse())
}

/// Default subscriber logging to stdout, respecting `RUST_LOG` (default INFO).
fn init_subscriber() {
    let fmt_layer = fmt::layer().with_target(false);

    let filter_layer = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}

fn run(args: &Args) -> Result<(), CliError> {
    let mut ms = build_model(args)?;
    if args.check {
        for set in ms.sets() {
            set.validate_partitions()?;
        }
    }

    ms.build_multi_elements();
    let mut loaded = false;
    if let Some(seed) = args.random {
        random_fill(&mut ms, seed);
        loaded = true;
    }
    if let Some(path) = &args.values {
        values::load_values(&mut ms, &fs::read_to_string(path)?);
        loaded = true;
    }
    if args.demo && !loaded {
        ms.set_multi_element(&["a3", "b2", "c1"], 2.0)?;
    }

    ms.build_multi_subsets()?;
    print!("{}", ms.render(args.verbose));

    if args.lambdas.is_empty() {
        info!("reading λ values from stdin, one per line");
        for line in io::stdin().lock().lines() {
            for token in line?.split_whitespace() {
                match token.parse::<f64>() {
                    Ok(lambda) if lambda >= 0.0 => report(&mut ms, lambda, args.json)?,
                    _ => warn!(token, "not a valid λ"),
                }
            }
        }
    } else {
        for &lambda in &args.lambdas {
            report(&mut ms, lambda, args.json)?;
        }
    }
    Ok(())
}

fn build_model(args: &Args) -> Result<MultiSet, CliError> {
    if args.demo {
        return demo_multiset().map_err(Into::into);
    }
    if args.sets.is_empty() {
        return Err(CliError::NoDimensions);
    }
    let mut ms = MultiSet::new("data");
    for entry in &args.sets {
        let (name, path) = entry
            .split_once('=')
            .ok_or_else(|| CliError::BadSetArg(entry.clone()))?;
        let dim = ms.add_set(name)?;
        let text = fs::read_to_string(path)?;
        hierarchy::load_hierarchy(ms.set_mut(dim), &text)?;
    }
    Ok(ms)
}

fn random_fill(ms: &mut MultiSet, seed: u64) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    for id in 0..ms.multi_elements().len() {
        ms.set_value_at(id, rng.gen::<f64>());
    }
}

#[derive(Serialize)]
struct Report {
    lambda: f64,
    size: usize,
    loss: f64,
    cost: f64,
    blocks: Vec<BlockReport>,
}

#[derive(Serialize)]
struct BlockReport {
    subsets: Vec<String>,
    sum_value: f64,
    cell_count: usize,
    loss: f64,
}

fn report(ms: &mut MultiSet, lambda: f64, json: bool) -> Result<(), CliError> {
    let best = ms.optimal_partition(lambda)?;
    if json {
        let blocks = best
            .blocks
            .iter()
            .map(|&block| {
                let block = ms.multi_subset(block);
                BlockReport {
                    subsets: block
                        .subset_ids()
                        .iter()
                        .zip(ms.sets())
                        .map(|(&subset, set)| set.subset(subset).name().to_owned())
                        .collect(),
                    sum_value: block.sum_value(),
                    cell_count: block.cell_count(),
                    loss: block.loss(),
                }
            })
            .collect();
        let out = Report {
            lambda: best.lambda,
            size: best.size,
            loss: best.loss,
            cost: best.cost,
            blocks,
        };
        println!("{}", serde_json::to_string(&out)?);
    } else {
        println!(
            "λ = {lambda}: size = {}, loss = {:.6}, cost = {:.6}",
            best.size, best.loss, best.cost
        );
        for &block in &best.blocks {
            println!(
                "\t{}  value = {}, loss = {:.6}",
                ms.block_label(block),
                ms.multi_subset(block).sum_value(),
                ms.multi_subset(block).loss()
            );
        }
    }
    Ok(())
}

/// The sample space of the interactive walkthrough: `A = {a1..a4}`,
/// `B = {b1..b3}` with two alternative top partitions, `C = {c1..c2}`.
fn demo_multiset() -> Result<MultiSet, ModelError> {
    let mut ms = MultiSet::new("ABC");

    let a = ms.add_set("A")?;
    let set = ms.set_mut(a);
    for name in ["a1", "a2", "a3", "a4"] {
        set.add_element(name)?;
    }
    set.add_subset("A1", SubsetSpec::Leaf { element: "a1" })?;
    set.add_subset("A2", SubsetSpec::Leaf { element: "a2" })?;
    set.add_subset("A3", SubsetSpec::Leaf { element: "a3" })?;
    set.add_subset("A4", SubsetSpec::Leaf { element: "a4" })?;
    set.add_subset("A12", SubsetSpec::Internal)?;
    set.add_partition("A12", &["A1", "A2"])?;
    set.add_subset("A34", SubsetSpec::Internal)?;
    set.add_partition("A34", &["A3", "A4"])?;
    set.add_subset("A1234", SubsetSpec::Top)?;
    set.add_partition("A1234", &["A12", "A34"])?;

    let b = ms.add_set("B")?;
    let set = ms.set_mut(b);
    for name in ["b1", "b2", "b3"] {
        set.add_element(name)?;
    }
    set.add_subset("B1", SubsetSpec::Leaf { element: "b1" })?;
    set.add_subset("B2", SubsetSpec::Leaf { element: "b2" })?;
    set.add_subset("B3", SubsetSpec::Leaf { element: "b3" })?;
    set.add_subset("B12", SubsetSpec::Internal)?;
    set.add_partition("B12", &["B1", "B2"])?;
    set.add_subset("B23", SubsetSpec::Internal)?;
    set.add_partition("B23", &["B2", "B3"])?;
    set.add_subset("B123", SubsetSpec::Top)?;
    set.add_partition("B123", &["B1", "B23"])?;
    set.add_partition("B123", &["B12", "B3"])?;

    let c = ms.add_set("C")?;
    let set = ms.set_mut(c);
    set.add_element("c1")?;
    set.add_element("c2")?;
    set.add_subset("C1", SubsetSpec::Leaf { element: "c1" })?;
    set.add_subset("C2", SubsetSpec::Leaf { element: "c2" })?;
    set.add_subset("C12", SubsetSpec::Top)?;
    set.add_partition("C12", &["C1", "C2"])?;

    Ok(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_space_builds_and_optimizes() {
        let mut ms = demo_multiset().unwrap();
        for set in ms.sets() {
            set.validate_partitions().unwrap();
        }
        ms.build_multi_elements();
        ms.set_multi_element(&["a3", "b2", "c1"], 2.0).unwrap();
        ms.build_multi_subsets().unwrap();

        let coarse = ms.optimal_partition(0.0).unwrap();
        assert_eq!(coarse.size, 1);

        let fine = ms.optimal_partition(100_000.0).unwrap();
        assert!(fine.size > 1);
    }

    #[test]
    fn random_fill_is_deterministic_per_seed() {
        let mut first = demo_multiset().unwrap();
        first.build_multi_elements();
        random_fill(&mut first, 7);

        let mut second = demo_multiset().unwrap();
        second.build_multi_elements();
        random_fill(&mut second, 7);

        for (a, b) in first
            .multi_elements()
            .iter()
            .zip(second.multi_elements().iter())
        {
            assert::close(a.value(), b.value(), 0.0);
        }
    }
}
