use std::net::SocketAddr;
use std::time::Instant;

use chord::client::Client;

use clap::Parser;

use tracing::Level;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
/// Query any node of a ring for a previously populated key.
struct Cli {
    /// Address of any node on the ring.
    #[arg(short, long)]
    node: SocketAddr,
    /// First part of the key, e.g. a player id.
    first: String,
    /// Second part of the key, e.g. a year.
    second: String,
}

fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let key = format!("{}{}", cli.first, cli.second);

    println!("Querying {} for key: {}", cli.node, key);

    let start = Instant::now();

    match Client::default().query_key(cli.node, &key) {
        Ok(value) => {
            println!(
                "Received value in {:?} seconds:\n{}",
                start.elapsed().as_secs_f32(),
                String::from_utf8_lossy(&value)
            );
        }
        Err(error) => println!("Query failed: {}", error),
    }
}
