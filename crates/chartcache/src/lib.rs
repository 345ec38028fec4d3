//! Command-line front end for the chart render cache
//!
//! [`run`] executes a parsed [`Cli`] against a cache built from its
//! configuration and writes command output to the given writer.

pub mod cli;

use chartcache_cache::{ArtifactRef, KeyDeriver, RenderRequest};
use chartcache_render::{ChartRenderer, FINGERPRINT};
use cli::{Cli, CliError, Commands, RequestArgs};
use serde::Serialize;
use std::io::Write;
use std::path::Path;

#[derive(Serialize)]
struct RenderOutput<'a> {
    key: &'a str,
    path: &'a Path,
    rendered: bool,
}

#[derive(Serialize)]
struct ListEntry<'a> {
    key: &'a str,
    path: &'a Path,
}

impl RequestArgs {
    /// Validate the arguments into a request, with `today` as the default date
    pub fn to_request(&self, today: chrono::NaiveDate) -> Result<RenderRequest, CliError> {
        Ok(RenderRequest::from_form(
            self.count.as_deref(),
            self.label.as_deref(),
            self.date.as_deref(),
            today,
        )?)
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn to_json<T: Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::other(format!("Failed to serialize output: {e}")))
}

/// Execute the selected command
pub fn run(cli: &Cli, out: &mut dyn Write) -> Result<(), CliError> {
    let config = cli.cache_config()?;
    tracing::debug!(?config, "Resolved cache configuration");

    match &cli.command {
        Commands::Key { request, explain } => {
            let request = request.to_request(today())?;
            let deriver = KeyDeriver::new(config.salt.as_deref().unwrap_or(FINGERPRINT));
            writeln!(out, "{}", deriver.derive(&request))?;
            if *explain {
                writeln!(out, "{}", to_json(&deriver.envelope(&request))?)?;
            }
        }
        Commands::Render { request } => {
            let request = request.to_request(today())?;
            let cache = config.build(ChartRenderer::default())?;
            let artifact = cache.get(&request)?;
            let rendered = cache.stats().renders > 0;
            tracing::info!(%request, key = %artifact.key, rendered, "Chart ready");
            if cli.json {
                let output = RenderOutput {
                    key: artifact.key.as_str(),
                    path: &artifact.path,
                    rendered,
                };
                writeln!(out, "{}", to_json(&output)?)?;
            } else {
                writeln!(out, "{}", artifact.path.display())?;
            }
        }
        Commands::List => {
            let store = config.open_store()?;
            write_listing(&store.list()?, cli.json, out)?;
        }
    }
    Ok(())
}

fn write_listing(
    artifacts: &[ArtifactRef],
    json: bool,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    if json {
        let entries: Vec<_> = artifacts
            .iter()
            .map(|a| ListEntry {
                key: a.key.as_str(),
                path: &a.path,
            })
            .collect();
        writeln!(out, "{}", to_json(&entries)?)?;
    } else {
        for artifact in artifacts {
            writeln!(out, "{}\t{}", artifact.key, artifact.path.display())?;
        }
    }
    Ok(())
}
