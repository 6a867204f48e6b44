use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use netsim_cli::FileAppHandler;
use netsim_core::app::CollectingApplication;
use netsim_core::Simulation;
use netsim_types::SimulatorConfig;
use tracing::info;

const STAGGER_DELAYS: [f64; 5] = [0.0, 0.1, 0.2, 0.3, 0.4];
const DEFAULT_WINDOW: u64 = 10_000;

#[derive(Parser, Debug)]
#[command(author, version, about = "Reliable file transfer over the simulated network")]
struct Args {
    /// File to send.
    #[arg(long, short = 'f', default_value = "internet-architecture.pdf")]
    filename: PathBuf,

    /// Random loss rate applied to every link (overrides the topology file's own loss attribute).
    #[arg(long, short = 'l')]
    loss: Option<f64>,

    /// Topology file describing the network. Defaults to a built-in one-hop, 1 Mbps link.
    #[arg(long)]
    topology: Option<PathBuf>,

    /// Number of concurrent staggered flows (at most 5 distinct stagger delays are defined).
    #[arg(long, default_value_t = 5)]
    flows: usize,

    /// Directory received files are written to.
    #[arg(long, default_value = "received")]
    received_dir: PathBuf,

    /// Write the wire-format send/drop/ack trace here.
    #[arg(long)]
    trace_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    if args.flows == 0 || args.flows > STAGGER_DELAYS.len() {
        anyhow::bail!("--flows must be between 1 and {}", STAGGER_DELAYS.len());
    }

    let payload = fs::read(&args.filename)
        .with_context(|| format!("reading {}", args.filename.display()))?;
    info!(bytes = payload.len(), "loaded file to send");

    let mut sim = build_simulation(&args)?;

    let (sender_node, receiver_node) = (0u32, 1u32);
    let mut received_paths = Vec::new();

    for (i, delay) in STAGGER_DELAYS.iter().take(args.flows).enumerate() {
        let port = (i + 1) as u16;
        let sender_app = CollectingApplication::new();
        let file_app = FileAppHandler::create(&args.received_dir, "file", i + 1)?;
        received_paths.push(file_app.path().to_path_buf());

        let sender_conn = sim.add_connection(
            netsim_types::NodeId(sender_node),
            2,
            port,
            1,
            port,
            DEFAULT_WINDOW,
            Box::new(sender_app),
        );
        sim.add_connection(
            netsim_types::NodeId(receiver_node),
            1,
            port,
            2,
            port,
            DEFAULT_WINDOW,
            Box::new(file_app),
        );

        sim.schedule_app_send(*delay, sender_conn, payload.clone());
    }

    sim.run_until_complete();
    info!(time = sim.current_time(), "simulation complete");

    report_diffs(&payload, &received_paths)?;
    Ok(())
}

fn build_simulation(args: &Args) -> Result<Simulation> {
    let mut sim = Simulation::new(SimulatorConfig::default());

    if let Some(topology_path) = &args.topology {
        let text = fs::read_to_string(topology_path)
            .with_context(|| format!("reading topology file {}", topology_path.display()))?;
        let mut topo = netsim_topo::parse(&text)?;
        if let Some(loss) = args.loss {
            for link in &mut topo.links {
                link.loss = loss;
            }
        }
        netsim_topo::build(&topo, &mut sim)?;
    } else {
        let a = sim.add_node();
        let b = sim.add_node();
        let loss = args.loss.unwrap_or(0.0);
        sim.add_link(a, b, 2, 1, 1_000_000.0, 0.001, None, loss);
        sim.add_link(b, a, 1, 2, 1_000_000.0, 0.001, None, loss);
    }

    Ok(sim)
}

fn report_diffs(original: &[u8], received_paths: &[PathBuf]) -> Result<()> {
    for path in received_paths {
        let got = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        if got == original {
            println!("# File transfer correct: {}", path.display());
        } else {
            println!(
                "# File transfer failed: {} ({} bytes received, {} expected)",
                path.display(),
                got.len(),
                original.len()
            );
        }
    }
    Ok(())
}
