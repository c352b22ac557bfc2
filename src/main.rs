use std::process::ExitCode;

use clap::Parser;

use elis_english_core::cli::{self, Cli};
use elis_english_core::config::{self, Config};
use elis_english_core::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let _log_guard = logging::init_tracing(&config::log_level_from_env());
    let config = Config::from_env();

    let cli = Cli::parse();
    match cli::run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
