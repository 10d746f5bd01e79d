use std::env;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use talent_roi::api::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries results; logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talent_roi=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(8080);
        let engine = match api::load_engine(None) {
            Ok(engine) => engine,
            Err(e) => {
                eprintln!("Configuration error: {e}");
                return ExitCode::from(1);
            }
        };
        if let Err(e) = api::run_http_server(engine, port).await {
            eprintln!("Server error: {e}");
            return ExitCode::from(1);
        }
        return ExitCode::SUCCESS;
    }

    api::run_cli(Cli::parse())
}
