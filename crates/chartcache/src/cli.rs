use chartcache_cache::CacheConfig;
use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{Diagnostic, Report};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Invalid input or configuration exit code
pub const EXIT_CLI: i32 = 2;
/// Storage or render failure exit code
pub const EXIT_FAILURE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Invalid input or configuration (exit code 2)
    #[error("Input/configuration error: {message}")]
    #[diagnostic(code(chartcache::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Storage or rendering failed (exit code 3)
    #[error("Render cache error: {message}")]
    #[diagnostic(code(chartcache::cli::cache))]
    Cache {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Other unexpected error (exit code 3)
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(chartcache::cli::other))]
    Other {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Convert `chartcache_cache::Error` to the matching `CliError` variant.
///
/// - Invalid input and configuration errors -> Config (exit code 2)
/// - Storage and render errors -> Cache (exit code 3)
///
/// The library's diagnostic help text is carried over unchanged.
impl From<chartcache_cache::Error> for CliError {
    fn from(err: chartcache_cache::Error) -> Self {
        use chartcache_cache::Error;

        let help = err.help().map(|h| h.to_string());
        match err {
            // Extract just the message to avoid a doubled prefix
            Error::Configuration { message } => Self::Config { message, help },
            Error::InvalidInput { .. } => Self::Config {
                message: err.to_string(),
                help,
            },
            Error::Storage { .. } | Error::Render { .. } => Self::Cache {
                message: err.to_string(),
                help,
            },
        }
    }
}

impl From<io::Error> for CliError {
    fn from(err: io::Error) -> Self {
        Self::other(format!("Failed to write output: {err}"))
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Cache { .. } | CliError::Other { .. } => EXIT_FAILURE,
    }
}

#[derive(Serialize)]
struct ErrorEnvelope<'a> {
    status: &'static str,
    code: &'static str,
    message: &'a str,
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool, mut stderr: impl Write) {
    let rendered = if json_mode {
        let message = err.to_string();
        let envelope = ErrorEnvelope {
            status: "error",
            code: match err {
                CliError::Config { .. } => "config",
                CliError::Cache { .. } => "cache",
                CliError::Other { .. } => "other",
            },
            message: &message,
        };
        serde_json::to_string(&envelope).unwrap_or(message)
    } else {
        // Use miette for human-friendly error display
        format!("{:?}", Report::new(err.clone()))
    };
    let _ = writeln!(stderr, "{rendered}");
}

/// Render a chart once and keep it: a content-addressed chart cache
#[derive(Parser, Debug)]
#[command(name = "chartcache", version, about)]
pub struct Cli {
    /// Directory rendered charts are stored in
    #[arg(long, global = true, env = chartcache_cache::config::CACHE_DIR_ENV)]
    pub cache_dir: Option<PathBuf>,

    /// Key salt; defaults to the renderer's fingerprint
    #[arg(long, global = true)]
    pub salt: Option<String>,

    /// Lifetime of in-memory memo entries, in seconds
    #[arg(long, global = true)]
    pub ttl_secs: Option<u64>,

    /// TOML file with cache settings
    #[arg(long, global = true, env = "CHARTCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Render a chart (or reuse the cached one) and print its path
    Render {
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Print the cache key for a request without rendering
    Key {
        #[command(flatten)]
        request: RequestArgs,
        /// Also print the canonical envelope the key is hashed from
        #[arg(long)]
        explain: bool,
    },
    /// List charts in the cache directory
    List,
}

/// Request parameters as raw form values
///
/// Kept as strings so malformed values are reported by the same validation
/// a web form would go through.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestArgs {
    /// Number of days to plot [default: 1]
    #[arg(long, allow_hyphen_values = true)]
    pub count: Option<String>,
    /// Chart label [default: empty]
    #[arg(long)]
    pub label: Option<String>,
    /// First plotted day as YYYY-MM-DD [default: today]
    #[arg(long)]
    pub date: Option<String>,
}

impl Cli {
    /// Cache settings with precedence flag > environment > config file > default
    pub fn cache_config(&self) -> Result<CacheConfig, CliError> {
        let mut config = match &self.config {
            Some(path) => CacheConfig::from_toml_file(path)?,
            None => CacheConfig::default(),
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(salt) = &self.salt {
            config.salt = Some(salt.clone());
        }
        if let Some(ttl) = self.ttl_secs {
            config.ttl_secs = ttl;
        }
        Ok(config)
    }

    /// Default log filter for the requested verbosity
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }
}
