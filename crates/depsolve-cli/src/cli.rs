//! CLI argument definitions for depsolve.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "depsolve",
    version,
    about = "Resolve npm dependency trees",
    long_about = "depsolve resolves a package and every transitive dependency against an \
                  npm-compatible registry, printing the tree or serving it over HTTP."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a package and print its dependency tree
    Resolve {
        /// Package name, e.g. `express` or `@types/node`
        package: String,
        /// Version or range to resolve
        #[arg(default_value = "latest")]
        constraint: String,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
        /// Maximum depth to print
        #[arg(long)]
        depth: Option<usize>,
        /// Explain why a package is in the tree
        #[arg(long)]
        why: Option<String>,
        /// Show packages resolved at more than one version
        #[arg(long)]
        duplicates: bool,
        #[command(flatten)]
        source: RegistrySource,
    },

    /// Serve dependency trees over HTTP
    Serve {
        /// Address to listen on (defaults to `server.bind` from the config)
        #[arg(long)]
        bind: Option<String>,
        #[command(flatten)]
        source: RegistrySource,
    },
}

impl Command {
    pub fn is_serve(&self) -> bool {
        matches!(self, Command::Serve { .. })
    }
}

/// Where package data comes from.
#[derive(Args, Debug, Clone)]
pub struct RegistrySource {
    /// Registry base URL
    #[arg(long, env = "DEPSOLVE_REGISTRY")]
    pub registry: Option<String>,
    /// Answer from a JSON registry snapshot instead of the network; takes
    /// precedence over `--registry`
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

pub fn parse() -> Cli {
    Cli::parse()
}
