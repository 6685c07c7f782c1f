use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

use commands::{check, config, prune, validate, OutputFormat};

/// twinctl - Operator tool for twin platform policies
#[derive(Parser)]
#[command(name = "twinctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write daily rolling log files to this directory
    #[arg(long, global = true, env = "TWINCTL_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a policy document
    Validate {
        /// Policy document (JSON)
        policy: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Check whether subjects hold a permission on a resource
    Check {
        /// Policy document (JSON)
        policy: PathBuf,

        /// Caller subject, `<issuer>:<subject>`; may be repeated
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,

        /// Resource key, `<type>:<pointer>` (e.g. thing:/features/lamp)
        #[arg(short, long)]
        resource: String,

        /// Permission to check
        #[arg(short, long, default_value = "READ")]
        permission: String,

        /// Also accept the permission anywhere below the resource
        #[arg(long)]
        on_or_below: bool,

        /// Output format (text, json)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Prune a JSON document to what the subjects may see
    Prune {
        /// Policy document (JSON)
        policy: PathBuf,

        /// Document to prune (JSON)
        document: PathBuf,

        /// Caller subject, `<issuer>:<subject>`; may be repeated
        #[arg(short, long = "subject", required = true)]
        subjects: Vec<String>,

        /// Resource type the document belongs to
        #[arg(long, default_value = "thing")]
        resource_type: String,

        /// Pointer at which the document is located
        #[arg(long, default_value = "/")]
        path: String,

        /// Permission the subjects need on each part
        #[arg(short, long, default_value = "READ")]
        permission: String,
    },

    /// Load and validate an enforcement configuration file
    Config {
        /// Configuration definition (YAML)
        path: PathBuf,

        /// Output format (text, json, yaml)
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging; the guard flushes file logs on exit
    let _guard = logging::init_logging(cli.verbose, cli.log_dir.as_deref())?;

    match cli.command {
        Commands::Validate { policy, format } => validate::execute(&policy, format),
        Commands::Check {
            policy,
            subjects,
            resource,
            permission,
            on_or_below,
            format,
        } => check::execute(check::CheckArgs {
            policy,
            subjects,
            resource,
            permission,
            on_or_below,
            format,
        }),
        Commands::Prune {
            policy,
            document,
            subjects,
            resource_type,
            path,
            permission,
        } => prune::execute(prune::PruneArgs {
            policy,
            document,
            subjects,
            resource_type,
            path,
            permission,
        }),
        Commands::Config { path, format } => config::execute(&path, format),
    }
}
