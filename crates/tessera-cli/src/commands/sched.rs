//! The `sched` subcommand: SIMD module profiles.

use anyhow::{Context, Result};
use clap::Args;
use tessera_sched::{LeafOp, schedule_program};
use tessera_trace::{parse_cg, parse_lpfs};
use tessera_ir::LogicalInst;

use super::common::Benchmark;

#[derive(Args)]
pub struct SchedArgs {
    /// Benchmark path without extension (expects .lpfs and .cg)
    pub benchmark: String,

    /// SIMD width constraint (defaults to the value in the .lpfs header)
    #[arg(long)]
    pub k: Option<u64>,

    /// Data-parallelism constraint (defaults to the .lpfs header)
    #[arg(long)]
    pub d: Option<u64>,

    /// Write the profiles as JSON next to the inputs
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: &SchedArgs) -> Result<()> {
    let benchmark = Benchmark::from_arg(&args.benchmark);
    let lpfs = parse_lpfs(&benchmark.read_input("lpfs")?)
        .with_context(|| format!("parsing {}.lpfs", benchmark.name))?;
    let cg = parse_cg(&benchmark.read_input("cg")?)
        .with_context(|| format!("parsing {}.cg", benchmark.name))?;

    let k = args.k.unwrap_or(u64::from(lpfs.simd_k).max(1));
    let d = args.d.unwrap_or(u64::from(lpfs.simd_d).max(1));

    let leaf_ops: Vec<(String, Vec<LeafOp>)> = lpfs
        .leaves
        .iter()
        .map(|leaf| {
            let ops = leaf
                .insts
                .iter()
                .filter_map(|inst| match inst {
                    LogicalInst::Op { op, qids, .. } => Some(LeafOp {
                        kind: *op,
                        args: qids.clone(),
                    }),
                    _ => None,
                })
                .collect();
            (leaf.name.clone(), ops)
        })
        .collect();

    let profiles = schedule_program(&leaf_ops, &cg.bodies, k, d)?;

    // Stable output: leaves in schedule order, then non-leaves.
    let mut names: Vec<&String> = leaf_ops.iter().map(|(n, _)| n).collect();
    names.extend(cg.bodies.iter().map(|(n, _)| n));
    for name in names {
        let Some(profile) = profiles.get(name) else {
            continue;
        };
        let Some(summary) = profile.summary() else {
            continue;
        };
        println!(
            "SIMD k={k} d={d} {name} {} {} {} {} {} {} leaf={}",
            summary.width,
            summary.length,
            summary.tgates,
            summary.tgates_ub,
            summary.tgates_par,
            summary.tgates_par_ub,
            u8::from(profile.is_leaf),
        );
        for rect in &profile.rects {
            println!("  (W={},L={})", rect.width, rect.length);
        }
    }

    if args.json {
        let ordered: Vec<_> = profiles.values().collect();
        let path = benchmark
            .base
            .with_extension("profiles.json");
        std::fs::write(&path, serde_json::to_string_pretty(&ordered)?)
            .with_context(|| format!("writing {}", path.display()))?;
        eprintln!("profiles written to:\t{}", path.display());
    }
    Ok(())
}
