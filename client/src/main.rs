use clap::Parser;
use client::network::{Client, ClientConfig, Role};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Session board to join; omit for a session-less connection
    #[arg(short, long)]
    board: Option<String>,

    /// Role to play: "walker" drives the session, "observer" follows it
    #[arg(short, long, default_value = "observer")]
    role: String,

    /// Seconds the walker keeps walking before ending the session
    #[arg(short, long, default_value = "30")]
    walk_seconds: u64,

    /// Milliseconds between raw position samples
    #[arg(long, default_value = "1000")]
    sample_interval: u64,

    /// One-shot message to broadcast after connecting
    #[arg(short, long)]
    announce: Option<String>,

    /// Seed for the simulated walk (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let role = match args.role.as_str() {
        "walker" => Role::Walker,
        "observer" => Role::Observer,
        other => {
            return Err(format!("Unknown role '{}', expected 'walker' or 'observer'", other).into())
        }
    };

    info!("Starting {} client...", args.role);
    info!("Connecting to: {}", args.server);
    match &args.board {
        Some(board) => info!("Joining board: {}", board),
        None => info!("No board given, connecting session-less"),
    }
    if role == Role::Walker {
        info!("Walk duration: {}s", args.walk_seconds);
    }

    let config = ClientConfig {
        server_addr: args.server,
        session_id: args.board,
        role,
        walk_duration: Duration::from_secs(args.walk_seconds),
        sample_interval: Duration::from_millis(args.sample_interval),
        announce: args.announce,
        seed: args.seed,
    };

    let mut client = Client::new(config).await?;
    client.run().await?;

    Ok(())
}
