use std::net::SocketAddr;
use std::sync::mpsc;

use chord::{ChordNode, Id};

use clap::Parser;

use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address of a node already on the ring, omit to start a new ring.
    #[arg(short, long)]
    bootstrap: Option<SocketAddr>,
    /// Port to listen on, assigned by the OS if omitted.
    #[arg(short, long)]
    port: Option<u16>,
    /// Hex encoded node id, hash of the listening address if omitted.
    #[arg(long)]
    id: Option<Id>,
    /// Print the full finger table once joined.
    #[arg(long)]
    fingers: bool,
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    let mut builder = ChordNode::builder();
    if let Some(bootstrap) = cli.bootstrap {
        builder.bootstrap(bootstrap);
    }
    if let Some(port) = cli.port {
        builder.port(port);
    }
    if let Some(id) = cli.id {
        builder.id(id);
    }

    let node = builder.build().expect("Failed to start chord node");

    let info = node.info();
    println!("\nNode {} listening on {}", info.id(), info.local_addr());
    println!("Predecessor: {}", info.predecessor());
    println!("Successor:   {}", info.successor());
    println!("Keys:        {}", info.keys());

    if cli.fingers {
        println!("\n=== FINGER TABLE ===");
        for (k, entry) in info.fingers().iter().enumerate() {
            println!("{:>3} [{}, {}) -> {}", k + 1, entry.start(), entry.end(), entry.node());
        }
    }

    let (tx_interrupted, rx_interrupted) = mpsc::channel();

    ctrlc::set_handler(move || {
        let _ = tx_interrupted.send(());
    })
    .expect("Error setting Ctrl-C handler");

    println!("\nPress CTRL+C to stop");

    let _ = rx_interrupted.recv();

    node.shutdown();
}
