use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use fire_projection::api::{Cli, Command, build_params, run_http_server};
use fire_projection::core::run_simulation;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                error!(error = %e, "server error");
                std::process::exit(1);
            }
        }
        Command::Run(args) => {
            let params = match build_params(args) {
                Ok(params) => params,
                Err(e) => {
                    error!(error = %e, "invalid parameters");
                    std::process::exit(2);
                }
            };
            info!(simulations = params.simulations, seed = params.seed, "running projection");

            let result = match tokio::task::spawn_blocking(move || run_simulation(&params)).await {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    error!(error = %e, "invalid parameters");
                    std::process::exit(2);
                }
                Err(e) => {
                    error!(error = %e, "simulation worker failed");
                    std::process::exit(1);
                }
            };

            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    error!(error = %e, "failed to serialize result");
                    std::process::exit(1);
                }
            }
        }
    }
}
