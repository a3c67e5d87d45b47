//! Tessera command-line interface.
//!
//! Resource estimation and routing simulation for fault-tolerant quantum
//! programs: `braid` runs the surface-code braid scheduler, `route` runs
//! the tiled-mesh teleportation simulator, `sched` prints the SIMD module
//! profiles the simulators consume.

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{braid, route, sched, version};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Tessera - surface-code resource estimation and routing simulation
#[derive(Parser)]
#[command(name = "tessera")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate braid-space occupancy on the surface-code mesh
    Braid(braid::BraidArgs),

    /// Simulate teleportation routing on the SIMD tile lattice
    Route(route::RouteArgs),

    /// List-schedule the program and print the SIMD module profiles
    Sched(sched::SchedArgs),

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Braid(args) => braid::execute(&args),
        Commands::Route(args) => route::execute(&args),
        Commands::Sched(args) => sched::execute(&args),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {e:#}", style("Error:").red().bold());
        std::process::exit(1);
    }
}
