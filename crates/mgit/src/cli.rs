use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mgit", about = "Git with identity-bound commit hashes", version)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress human-readable output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Log filter used when MGIT_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Run as if started in this directory
    #[arg(short = 'C', global = true, value_name = "PATH")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create the identity store (.mgit) in the current repository
    Init,

    /// Commit the staged changes and bind them to your identity key
    Commit {
        /// Commit message
        #[arg(short, long)]
        message: String,

        /// Allow a commit whose tree matches its parent
        #[arg(long)]
        allow_empty: bool,
    },

    /// Show identity history from HEAD
    Log {
        /// Maximum number of commits to show
        #[arg(short = 'n', long = "max-count", default_value_t = 10)]
        max_count: usize,
    },

    /// Show one commit
    Show {
        /// Branch, tag, native hash or identity hash
        #[arg(default_value = "HEAD")]
        revision: String,
    },

    /// Check every identity commit reachable from HEAD
    Verify,

    /// Print the native hash a revision resolves to
    RevParse {
        revision: String,
    },

    /// Rebuild identity objects and refs from the mapping table
    Reconstruct {
        /// Import this mapping payload before rebuilding
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },

    /// Native to identity hash mappings
    Mappings {
        #[command(subcommand)]
        cmd: MappingsCommand,
    },

    /// Get or set identity configuration
    Config {
        /// Use ~/.mgitconfig instead of the repository config
        #[arg(long)]
        global: bool,

        /// List every identity value with its source
        #[arg(long, conflicts_with_all = ["key", "value"])]
        list: bool,

        /// user.name, user.email or user.pubkey
        #[arg(required_unless_present = "list")]
        key: Option<String>,

        value: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum MappingsCommand {
    /// List mappings as a table
    List {
        /// Only entries bound to this identity key
        #[arg(long)]
        key: Option<String>,
    },

    /// Append entries from a mapping payload
    Import {
        file: PathBuf,
    },

    /// Write the mapping table in its wire format
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
