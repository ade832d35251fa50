mod admin_cmd;
mod workflow_cmd;

use anyhow::Result;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use extracts_workflow::ClientConfig;
use extracts_workflow::FallbackPolicy;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

pub use admin_cmd::AdminSubcommand;
pub use workflow_cmd::WorkflowSubcommand;

/// Track open-extract approval workflows against the records backend.
#[derive(Debug, Parser)]
#[command(name = "extracts", version)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalOptions,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[command(flatten)]
    Workflow(WorkflowSubcommand),
    #[command(flatten)]
    Admin(AdminSubcommand),
}

#[derive(Debug, Default, Args)]
pub struct GlobalOptions {
    /// Config file (YAML or TOML).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the workflow backend.
    #[arg(long = "backend-url", global = true, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Directory holding the session file and exports.
    #[arg(long = "session-dir", global = true, value_name = "DIR")]
    pub session_dir: Option<PathBuf>,

    /// Fail instead of committing locally when the backend is unreachable.
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl GlobalOptions {
    /// Config file values, overridden by whatever was given on the command
    /// line.
    pub fn resolve_config(&self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::load(path)?,
            None => ClientConfig::default(),
        };
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(dir) = &self.session_dir {
            config.session_dir = dir.clone();
        }
        if self.strict {
            config.fallback = FallbackPolicy::Strict;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub async fn run() -> Result<()> {
    run_with_args(std::env::args_os()).await
}

pub async fn run_with_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_tracing(cli.global.verbose);
    let config = cli.global.resolve_config()?;
    match cli.command {
        Command::Workflow(command) => workflow_cmd::execute(command, &config).await,
        Command::Admin(command) => admin_cmd::execute(command, &config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "extracts",
            "status",
            "--backend-url",
            "http://records:9000",
            "--strict",
            "--session-dir",
            "/tmp/session",
        ]);
        let config = cli.global.resolve_config().expect("config");
        assert_eq!(config.backend_url, "http://records:9000");
        assert_eq!(config.fallback, FallbackPolicy::Strict);
        assert_eq!(config.session_dir, PathBuf::from("/tmp/session"));
    }

    #[test]
    fn defaults_point_at_local_backend() {
        let config = GlobalOptions::default()
            .resolve_config()
            .expect("config");
        assert_eq!(config, ClientConfig::default());
    }
}
