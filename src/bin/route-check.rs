use std::path::PathBuf;

use clap::{Parser, Subcommand};

use prefix_gateway::config::{load_config, GatewayConfig, MatchKind};
use prefix_gateway::routing::{Destination, RouteTable};

#[derive(Parser)]
#[command(name = "route-check")]
#[command(about = "Route table diagnostics for the prefix gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults to built-in wiring).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gateway base URL for live probes.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the resolved route table in evaluation order
    Routes,
    /// Resolve a request path against the table without sending traffic
    Match { path: String },
    /// Send a GET through a running gateway and print the response
    Probe { path: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    let table = RouteTable::from_config(&config)?;

    match cli.command {
        Commands::Routes => {
            for route in table.routes() {
                let kind = match route.kind {
                    MatchKind::Exact => "exact",
                    MatchKind::Prefix => "prefix",
                };
                let upgrade = match &route.destination {
                    Destination::Upstream(target) if target.supports_upgrade => " (upgrade)",
                    _ => "",
                };
                println!(
                    "{:<10} {:<6} {:<14} -> {}{}",
                    route.name, kind, route.pattern, route.destination, upgrade
                );
            }
        }
        Commands::Match { path } => match table.lookup(&path) {
            Some(route) => {
                println!("route:   {}", route.name);
                println!("pattern: {}", route.pattern);
                match &route.destination {
                    Destination::Landing => println!("serves:  landing page"),
                    Destination::Upstream(target) => {
                        println!("backend: {}", target.authority());
                        println!("target:  {}", target.rewrite_target(&path));
                        if target.supports_upgrade {
                            println!("upgrade: supported");
                        }
                    }
                }
            }
            None => {
                println!("no route matches '{}'", path);
                std::process::exit(1);
            }
        },
        Commands::Probe { path } => {
            let client = reqwest::Client::new();
            let response = client.get(format!("{}{}", cli.url, path)).send().await?;
            print_response(response).await?;
        }
    }

    Ok(())
}

async fn print_response(response: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    println!("status: {}", response.status());
    let text = response.text().await?;
    if !text.is_empty() {
        println!("{}", text);
    }
    Ok(())
}
