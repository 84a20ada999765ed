use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use till_core::EntityKind;

#[derive(Parser)]
#[command(name = "till")]
#[command(about = "Offline-first point of sale with cloud sync")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local store file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Sync backend base URL (overrides TILL_API_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Name recorded on new sales
    #[arg(long, global = true, value_name = "NAME")]
    pub user: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create or replace a record from JSON (stdin when omitted)
    #[command(alias = "add")]
    Put {
        #[arg(value_enum)]
        entity: EntityArg,
        /// Record JSON; a missing id is generated
        json: Option<String>,
    },
    /// List local records
    List {
        #[arg(value_enum)]
        entity: EntityArg,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a local record and queue the deletion for sync
    #[command(alias = "rm")]
    Delete {
        #[arg(value_enum)]
        entity: EntityArg,
        /// Record ID
        id: String,
    },
    /// Show deletions waiting for the next sync
    Pending {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sync all local collections with the backend
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
    },
    /// Search a remote collection
    Search {
        #[arg(value_enum)]
        entity: EntityArg,
        /// Filters as key=value (e.g. name=rice category=Grains)
        filters: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the owner account
    Owner,
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum EntityArg {
    #[value(alias = "products")]
    Product,
    #[value(alias = "branches")]
    Branch,
    #[value(alias = "cashiers")]
    Cashier,
    #[value(alias = "suppliers")]
    Supplier,
    #[value(alias = "sales")]
    Sale,
    #[value(alias = "customers")]
    Customer,
}

impl From<EntityArg> for EntityKind {
    fn from(value: EntityArg) -> Self {
        match value {
            EntityArg::Product => Self::Product,
            EntityArg::Branch => Self::Branch,
            EntityArg::Cashier => Self::Cashier,
            EntityArg::Supplier => Self::Supplier,
            EntityArg::Sale => Self::Sale,
            EntityArg::Customer => Self::Customer,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell")]
    PowerShell,
    Elvish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// List incoming writes the backend discarded as stale
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
