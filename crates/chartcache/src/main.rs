//! chartcache CLI application

// CLI binary reports failures on stderr
#![allow(clippy::print_stderr)]

use chartcache::cli::{Cli, EXIT_OK, exit_code_for, render_error};
use clap::Parser;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = cli.log_level();
        EnvFilter::new(format!(
            "chartcache={level},chartcache_cache={level},chartcache_render={level}"
        ))
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let result = {
        let mut stdout = std::io::stdout().lock();
        chartcache::run(&cli, &mut stdout)
    };
    let code = match result {
        Ok(()) => EXIT_OK,
        Err(err) => {
            tracing::debug!(error = ?err, "Command failed");
            render_error(&err, cli.json, std::io::stderr());
            exit_code_for(&err)
        }
    };
    std::process::exit(code);
}
