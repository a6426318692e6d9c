use clap::Parser;
use std::process;

use hsdump::{cli, services};

#[tokio::main]
async fn main() {
    // a missing .env is fine, credentials may come from elsewhere
    let _ = dotenvy::dotenv();

    let args = cli::Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(args.log_level.into())
        .format_timestamp_secs()
        .init();

    if let Err(e) = services::run(args).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}
