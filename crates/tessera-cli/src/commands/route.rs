//! The `route` subcommand: tiled-mesh teleportation simulation.

use anyhow::{Context, Result};
use clap::Args;
use rustc_hash::FxHashMap;
use tessera_sim::{
    FactoryModel, LeafProgram, SmoothingPolicy, TileLayout, TileSimulator, aggregate,
    concatenation_level, expand::ExpandContext, expand_leaf,
};
use tessera_trace::{
    KqReport, parse_cg, parse_freq, parse_lpfs, render_ages, render_storage, render_usage,
    route_report_name, smoothing_suffix,
};

use super::common::Benchmark;

#[derive(Args)]
pub struct RouteArgs {
    /// Benchmark path without extension (expects .lpfs, .freq and .cg)
    pub benchmark: String,

    /// Device error exponent: physical error rate is 10^-p
    #[arg(long, default_value = "5")]
    pub p: i32,

    /// Ancilla moves admitted per cycle ("inf" = unlimited; implies forward)
    #[arg(long, default_value = "inf")]
    pub cap: String,

    /// Admit ancilla moves only this close to the stream head ("inf" = always)
    #[arg(long, default_value = "inf")]
    pub window: String,

    /// Forward smoothing: create ancillas just in time
    #[arg(long)]
    pub forward: bool,

    /// Backward smoothing: prefetch the next leaf's ancilla moves
    #[arg(long)]
    pub backward: bool,

    /// Both smoothing directions
    #[arg(long)]
    pub backforth: bool,

    /// Write the per-cycle ancilla usage time series
    #[arg(long)]
    pub usage: bool,

    /// Write the ancilla age summary
    #[arg(long)]
    pub ages: bool,

    /// Write the per-tile peak storage summary
    #[arg(long)]
    pub storage: bool,
}

fn parse_inf(value: &str, what: &str) -> Result<Option<u64>> {
    if value == "inf" {
        Ok(None)
    } else {
        value
            .parse()
            .map(Some)
            .with_context(|| format!("bad {what} value '{value}'"))
    }
}

pub fn execute(args: &RouteArgs) -> Result<()> {
    let benchmark = Benchmark::from_arg(&args.benchmark);
    let lpfs = parse_lpfs(&benchmark.read_input("lpfs")?)
        .with_context(|| format!("parsing {}.lpfs", benchmark.name))?;
    let freqs = parse_freq(&benchmark.read_input("freq")?)
        .with_context(|| format!("parsing {}.freq", benchmark.name))?;
    let cg = parse_cg(&benchmark.read_input("cg")?)
        .with_context(|| format!("parsing {}.cg", benchmark.name))?;

    let mov_cap = parse_inf(&args.cap, "--cap")?;
    let window_size = parse_inf(&args.window, "--window")?;
    let policy = SmoothingPolicy {
        forward: args.forward
            || args.backforth
            || (!args.backward && (mov_cap.is_some() || window_size.is_some())),
        backward: args.backward || args.backforth,
        mov_cap,
        window_size,
    };

    // Size the program for the error budget.
    let total_logical_gates: u64 = lpfs
        .leaves
        .iter()
        .map(|l| l.logical_op_count() * freqs.get(&l.name).copied().unwrap_or(0))
        .sum();
    let (l_error_rate, level) = concatenation_level(args.p, total_logical_gates)?;
    let factories = FactoryModel::new(level);
    println!("total logical gates: {total_logical_gates}");
    println!("logical error rate (p_L): {l_error_rate:e}");
    println!("concatenation level (l): {level}");
    tracing::info!(?factories, "factory model");

    let layout = TileLayout::new(lpfs.simd_k, lpfs.simd_d);
    println!(
        "Topology : SIMD({},{}) : {}x{}",
        layout.simd_k, layout.simd_d, layout.rows, layout.cols
    );

    // Lower every leaf to its physical stream.
    let mut ctx = ExpandContext::default();
    let mut programs: FxHashMap<String, LeafProgram> = FxHashMap::default();
    for leaf in &lpfs.leaves {
        let program = expand_leaf(&leaf.name, &leaf.tile_insts(), &layout, &mut ctx)?;
        programs.insert(leaf.name.clone(), program);
    }

    // The call graph dictates which leaves execute, capped per leaf.
    let bodies = cg.body_map();
    let mut sequence = aggregate::ordered_leaf_sequence("main", &bodies);
    sequence.retain(|name| {
        let known = programs.contains_key(name);
        if !known {
            tracing::warn!(leaf = name.as_str(), "call graph names a leaf with no schedule");
        }
        known
    });
    if sequence.is_empty() {
        // Degenerate call graph: walk every scheduled leaf once.
        sequence = lpfs.leaves.iter().map(|l| l.name.clone()).collect();
    }
    let capped = aggregate::capped_leaf_sequence(&sequence);
    tracing::info!(occurrences = capped.len(), "simulating leaf sequence");

    let sim = TileSimulator::new(&layout, level, policy);
    let outcome = sim.run(&programs, &capped)?;

    for (leaf, cycles) in &outcome.leaf_cycles {
        println!("{leaf}\t\t{cycles:?}");
    }

    let total_cycles = aggregate::weighted_total_cycles(&outcome.leaf_cycles, &freqs);
    let max_qubits = aggregate::physical_qubits(outcome.peak_live_qubits, level);

    let report = KqReport {
        error_rate_exp: args.p,
        code_distance: None,
        concatenation_level: Some(level),
        total_cycles,
        max_qubits,
        logical_kq: total_logical_gates,
        physical_kq: total_cycles * max_qubits,
    };
    let direction = smoothing_suffix(policy.forward, policy.backward);
    let name = |ext: &str| {
        route_report_name(&benchmark.name, args.p, mov_cap, window_size, direction, ext)
    };
    let path = benchmark.write_report("simd_simulation", &name("kq"), &report.render())?;
    benchmark.write_report("simd_simulation", &name("kq.json"), &report.render_json())?;
    eprintln!("kq report written to:\t{}", path.display());

    if args.usage {
        let usage = render_usage(&outcome.metrics.ancilla_usage());
        let path = benchmark.write_report("simd_simulation", &name("usage"), &usage)?;
        eprintln!("usage report written to:\t{}", path.display());
    }
    if args.ages {
        let ages = render_ages(
            outcome
                .qubit_ages
                .iter()
                .map(|(id, &age)| (id.as_str(), age)),
        );
        let path = benchmark.write_report("simd_simulation", &name("ages"), &ages)?;
        eprintln!("ages report written to:\t{}", path.display());
    }
    if args.storage {
        let storage =
            render_storage(&outcome.metrics.peak_storage(layout.simd_k as usize));
        let path = benchmark.write_report("simd_simulation", &name("storage"), &storage)?;
        eprintln!("storage report written to:\t{}", path.display());
    }
    Ok(())
}
