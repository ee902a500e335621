mod cli;
mod commands;
mod error;
mod logging;
mod settings;
mod switch_lock;

use clap::Parser;
use std::process::ExitCode;

use phpswap_platform::AppPaths;

use crate::cli::Cli;
use crate::settings::AppSettings;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let paths = match AppPaths::new() {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let (settings, settings_warning) = AppSettings::load(&paths);
    logging::init_logging(
        &paths,
        cli.debug,
        settings.debug_logging,
        settings.max_log_size_bytes,
    );
    if let Some(warning) = settings_warning {
        log::warn!("{warning}");
        eprintln!("warning: {warning}");
    }
    log::debug!("phpswap {} starting: {cli:?}", env!("CARGO_PKG_VERSION"));

    match commands::execute(cli, settings, paths).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
