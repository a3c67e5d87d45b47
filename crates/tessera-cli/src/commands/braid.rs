//! The `braid` subcommand: surface-code braid-space simulation.

use std::collections::BTreeMap;
use std::process::Command;

use anyhow::{Context, Result, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tessera_braid::{BraidScheduler, CodeParams, SchedulerConfig, area_physical_qubits};
use tessera_ir::Gate;
use tessera_trace::{KqReport, braid_report_name, parse_freq, parse_lpfs, parse_tr, write_tr};

use super::common::Benchmark;

#[derive(Args)]
pub struct BraidArgs {
    /// Benchmark path without extension (expects .lpfs and .freq)
    pub benchmark: String,

    /// Device error exponent: physical error rate is 10^-p
    #[arg(long, default_value = "5")]
    pub p: i32,

    /// Failed attempts before a route rotates to YX dimension order
    #[arg(long, default_value = "4")]
    pub yx: u32,

    /// Failed attempts before a gate is dropped and reinjected
    #[arg(long, default_value = "8")]
    pub drop: u32,

    /// Run the external placement optimiser and simulate its layout
    #[arg(long)]
    pub opt: bool,

    /// Command invoked as `<cmd> <tr> <p> <yx> <drop> opt`
    #[arg(long, default_value = "./arrange.py")]
    pub optimizer: String,

    /// Restrict scheduling to CNOT gates
    #[arg(long)]
    pub cnot: bool,
}

pub fn execute(args: &BraidArgs) -> Result<()> {
    let benchmark = Benchmark::from_arg(&args.benchmark);
    let lpfs = parse_lpfs(&benchmark.read_input("lpfs")?)
        .with_context(|| format!("parsing {}.lpfs", benchmark.name))?;
    let freqs = parse_freq(&benchmark.read_input("freq")?)
        .with_context(|| format!("parsing {}.freq", benchmark.name))?;

    // Module name -> (gates, qubit count), iterated in name order.
    let mut modules: BTreeMap<String, (Vec<Gate>, u64)> = BTreeMap::new();
    for leaf in &lpfs.leaves {
        modules.insert(leaf.name.clone(), leaf.braid_gates(args.cnot));
    }

    let total_logical_gates: u64 = modules
        .iter()
        .map(|(name, (gates, _))| gates.len() as u64 * freqs.get(name).copied().unwrap_or(0))
        .sum();
    tracing::info!(total_logical_gates, "sized program");

    let params = CodeParams::derive(args.p, total_logical_gates)?;
    println!("error rate (p): 10^-{}", params.p);
    println!("logical error rate (p_L): {:e}", params.l_error_rate);
    println!("code distance (d): {}", params.distance);

    // Optional placement optimisation round trip.
    let mut cost_base = (0u64, 0u64);
    let mut cost_opt = (0u64, 0u64);
    if args.opt {
        let traced: Vec<(String, Vec<Gate>, u64)> = modules
            .iter()
            .map(|(n, (g, q))| (n.clone(), g.clone(), *q))
            .collect();
        let tr_path = benchmark.base.with_extension("tr");
        std::fs::write(&tr_path, write_tr(&traced))
            .with_context(|| format!("writing {}", tr_path.display()))?;

        let status = Command::new(&args.optimizer)
            .arg(&tr_path)
            .arg(args.p.to_string())
            .arg(args.yx.to_string())
            .arg(args.drop.to_string())
            .arg("opt")
            .status()
            .with_context(|| format!("running placement optimizer '{}'", args.optimizer))?;
        if !status.success() {
            bail!("placement optimizer exited with {status}");
        }

        let opt_path = benchmark.base.with_extension("opt.tr");
        let opt_text = std::fs::read_to_string(&opt_path)
            .with_context(|| format!("reading {}", opt_path.display()))?;
        let optimised = parse_tr(&opt_text)?;

        cost_base = manhattan_cost(&modules);
        for (name, gates) in optimised {
            if let Some(entry) = modules.get_mut(&name) {
                entry.0 = gates;
            }
        }
        cost_opt = manhattan_cost(&modules);
    }

    // Simulate each module.
    let bar = ProgressBar::new(modules.len() as u64).with_style(
        ProgressStyle::with_template("{spinner} {msg} [{bar:30}] {pos}/{len}")
            .expect("static template"),
    );
    let cfg = SchedulerConfig {
        code_distance: params.distance,
        yx_threshold: args.yx,
        drop_threshold: args.drop,
        ..SchedulerConfig::new(params.distance)
    };
    let mut total_cycles = 0u64;
    let mut max_q_count = 0u64;
    for (name, (gates, q_count)) in &modules {
        bar.set_message(name.clone());
        max_q_count = max_q_count.max(*q_count);
        let Some(stats) = BraidScheduler::run(name, gates, *q_count, cfg)? else {
            bar.inc(1);
            continue;
        };
        let freq = freqs.get(name).copied().unwrap_or(1);
        println!("\nModule: {name}");
        println!("SerialCLOCK: {}", stats.serial_cycles * freq);
        println!("ParallelCLOCK: {}", stats.cycles * freq);
        println!("CriticalCLOCK: {}", stats.critical_cycles * freq);
        println!("total_success: {}", stats.success_events.len() as u64 * freq);
        println!("total_conflict: {}", stats.total_conflicts * freq);
        println!("unique_conflict: {}", stats.unique_conflicts * freq);
        println!("total_dropped_gates: {}", stats.total_dropped * freq);
        println!("unique_dropped_gates: {}", stats.unique_dropped * freq);
        for (attempts, count) in &stats.attempts_hist {
            println!("attempt\t{attempts}\t{}", count * freq);
        }
        total_cycles += stats.cycles * freq;
        bar.inc(1);
    }
    bar.finish_and_clear();

    if args.opt {
        println!("mcost: {}", cost_base.0);
        println!("mcost_opt: {}", cost_opt.0);
        println!("event_count: {}", cost_base.1);
        println!("event_count_opt: {}", cost_opt.1);
    }

    let num_physical_qubits = area_physical_qubits(params.distance, max_q_count);
    println!("code_distance(d): {}", params.distance);
    println!("num_logical_qubits: {max_q_count}");
    println!("num_physical_qubits: {num_physical_qubits}");

    let report = KqReport {
        error_rate_exp: args.p,
        code_distance: Some(params.distance),
        concatenation_level: None,
        total_cycles,
        max_qubits: num_physical_qubits,
        logical_kq: total_logical_gates,
        physical_kq: total_cycles * num_physical_qubits,
    };
    let file = braid_report_name(&benchmark.name, args.p, args.yx, args.drop, args.opt);
    let path = benchmark.write_report("braid_simulation", &file, &report.render())?;
    benchmark.write_report(
        "braid_simulation",
        &format!("{file}.json"),
        &report.render_json(),
    )?;
    eprintln!("kq report written to:\t{}", path.display());
    Ok(())
}

/// Total Manhattan cost of all CNOTs and the total mesh-event count,
/// per module lattice.
fn manhattan_cost(modules: &BTreeMap<String, (Vec<Gate>, u64)>) -> (u64, u64) {
    use tessera_braid::Mesh;
    let mut cost = 0u64;
    let mut events = 0u64;
    for (gates, q_count) in modules.values() {
        let (rows, cols) = Mesh::grid_for(*q_count);
        let mesh = Mesh::new(rows, cols);
        for g in gates {
            if g.qubits.len() == 2 {
                cost += mesh.manhattan_cost(g.qubits[0], g.qubits[1]);
                events += 7;
            } else {
                events += 2;
            }
        }
    }
    (cost, events)
}
