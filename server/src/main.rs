use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use server::config::SimConfig;
use server::network::Server;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "127.0.0.1")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "8080")]
    port: u16,
    /// Simulation ticks per second
    #[clap(short, long, default_value_t = shared::DEFAULT_TICK_RATE)]
    tick_rate: u32,
    /// Snapshots per second
    #[clap(short, long, default_value_t = shared::DEFAULT_SEND_RATE)]
    send_rate: u32,
    /// Seed for every authoritative random roll
    #[clap(long, default_value = "42")]
    seed: u64,
    /// Maximum number of connected players
    #[clap(short, long, default_value = "16")]
    max_clients: usize,
    /// Start with an empty map
    #[clap(long)]
    no_resources: bool,
}

impl Args {
    fn sim_config(&self) -> SimConfig {
        SimConfig {
            tick_rate: self.tick_rate,
            send_rate: self.send_rate,
            seed: self.seed,
            max_players: self.max_clients,
            spawn_resources: !self.no_resources,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.sim_config();
    config.validate()?;

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::new(&address, config).await?;

    let handle = server.scheduler_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                handle.stop();
            }
            Err(e) => warn!("Unable to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await?;
    drop(server);
    info!("Server stopped");
    Ok(())
}
