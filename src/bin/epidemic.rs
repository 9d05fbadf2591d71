//! Command-line entry point: runs one simulation and prints the elapsed milliseconds.

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use epidemic::{
    parse_node_count, Algorithm, ConvergenceMode, SimError, Simulation, SimulationConfig, Topology,
};

const USAGE: &str = "usage: epidemic <num_nodes> <full|3D|line|imp3D> <gossip|push-sum>";

#[derive(Parser)]
#[command(
    name = "epidemic",
    about = "Gossip and Push-Sum convergence timing over simulated topologies",
    version
)]
struct Cli {
    /// Number of nodes
    num_nodes: String,

    /// Topology: full, 3D, line, imp3D
    topology: String,

    /// Algorithm: gossip, push-sum
    algorithm: String,

    /// Offset for every node's selector seed
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Stop as soon as every node reports convergence
    #[arg(long)]
    signal: bool,

    /// Print the full run report as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Result<SimulationConfig, SimError> {
        let num_nodes = parse_node_count(&self.num_nodes)?;
        let topology: Topology = self.topology.parse()?;
        let algorithm: Algorithm = self.algorithm.parse()?;
        let convergence = if self.signal {
            ConvergenceMode::Signal
        } else {
            ConvergenceMode::Heuristic
        };
        Ok(SimulationConfig::new(num_nodes, topology, algorithm)
            .with_seed(self.seed)
            .with_convergence(convergence))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!("{}", USAGE);
            std::process::exit(1);
        }
    };

    let report = Simulation::new(config)?.run().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.elapsed_ms);
    }
    Ok(())
}
