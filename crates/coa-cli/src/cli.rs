//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// COA collector - run consumption analytics SQL against source systems and
/// load the results into a reporting database
#[derive(Parser, Debug)]
#[command(name = "coa")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Log every substitution and echo the run log to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Working directory holding config.yaml and the phase folders
    #[arg(short = 'd', long, global = true, default_value = ".")]
    pub dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override secrets file path
    #[arg(short, long, global = true)]
    pub secrets: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch filesets from the content host and stage the SQL store
    Fetch(FetchArgs),

    /// Prepare SQL templates into the ready-to-run folder
    Prepare(PrepareArgs),

    /// Execute prepared SQL against every source system
    Execute(ExecuteArgs),

    /// Upload saved results into the reporting database
    Upload(UploadArgs),

    /// Fetch, prepare, execute and upload in one go
    Run(RunArgs),

    /// Move the ready-to-run folder into a new output folder
    Archive(ArchiveArgs),
}

/// Arguments for the fetch command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Content host to fetch from (folder or file:// URL), instead of settings.content_host
    #[arg(long)]
    pub host: Option<String>,
}

/// Arguments for the prepare command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Print each prepared file's path
    #[arg(short, long)]
    pub list: bool,
}

/// Arguments for the execute command
#[derive(Args, Debug)]
pub struct ExecuteArgs {
    /// Name appended to the timestamped output folder
    #[arg(short, long)]
    pub name: Option<String>,
}

/// Arguments for the upload command
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Output folder to upload (default: the last run's)
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Name appended to the timestamped output folder
    #[arg(short, long)]
    pub name: Option<String>,

    /// Reuse the existing download folder
    #[arg(long)]
    pub skip_fetch: bool,

    /// Stop after execute
    #[arg(long)]
    pub skip_upload: bool,
}

/// Arguments for the archive command
#[derive(Args, Debug)]
pub struct ArchiveArgs {
    /// Name appended to the timestamped output folder
    #[arg(short, long)]
    pub name: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
