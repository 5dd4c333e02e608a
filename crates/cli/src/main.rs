//! Chaos usage CLI
//!
//! A command-line tool for registering chaos experiments, posting usage
//! samples and viewing the aligned usage reports of the chaos usage server.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{experiments, reports, reports::ReportScope};
use std::path::PathBuf;

/// Chaos usage CLI
#[derive(Parser)]
#[command(name = "chaosctl")]
#[command(author, version, about = "CLI for chaos experiment resource usage", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via CHAOS_API_URL env var)
    #[arg(long, env = "CHAOS_API_URL")]
    pub api_url: Option<String>,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show aligned usage reports for an experiment
    #[command(subcommand)]
    Report(ReportCommands),

    /// Post raw usage samples from a JSON file
    Ingest {
        /// File holding an array of samples or an {"items": [...]} batch
        file: PathBuf,
    },

    /// Register an experiment and its resources from a JSON file
    Register {
        /// File holding {"stressChaos": {...}, "chaosResource": [...]}
        file: PathBuf,
    },

    /// Show registered resources by id
    Resources {
        /// Resource ids
        #[arg(required = true, value_delimiter = ',')]
        ids: Vec<i64>,
    },

    /// Delete an experiment with its resources and samples
    Delete {
        /// Experiment name
        chaos_name: String,

        /// Namespace of the experiment
        #[arg(long, short)]
        namespace: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Usage of the selected pods
    Pods {
        /// Experiment name
        chaos_name: String,
    },

    /// Mean usage per workload
    Workloads {
        /// Experiment name
        chaos_name: String,
    },

    /// Usage of the nodes
    Nodes {
        /// Experiment name
        chaos_name: String,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{:#}", err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::Config::load()?;
    let api_url = config.resolve_api_url(cli.api_url.as_deref());

    if cli.verbose {
        output::print_info(&format!("Using API at {}", api_url));
    }

    // Initialize client
    let client = client::ApiClient::new(&api_url)?;

    // Execute command
    match cli.command {
        Commands::Report(report_cmd) => {
            let (scope, chaos_name) = match report_cmd {
                ReportCommands::Pods { chaos_name } => (ReportScope::Pods, chaos_name),
                ReportCommands::Workloads { chaos_name } => (ReportScope::Workloads, chaos_name),
                ReportCommands::Nodes { chaos_name } => (ReportScope::Nodes, chaos_name),
            };
            reports::show_report(&client, scope, &chaos_name, cli.format).await?;
        }
        Commands::Ingest { file } => {
            experiments::ingest(&client, &file, cli.format).await?;
        }
        Commands::Register { file } => {
            experiments::register(&client, &file, cli.format).await?;
        }
        Commands::Resources { ids } => {
            experiments::show_resources(&client, &ids, cli.format).await?;
        }
        Commands::Delete {
            chaos_name,
            namespace,
        } => {
            let namespace = config.resolve_namespace(namespace);
            experiments::delete(&client, &chaos_name, &namespace, cli.format).await?;
        }
    }

    Ok(())
}
