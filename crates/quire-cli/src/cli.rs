use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use quire_core::strategy::StrategyKind;
use quire_core::{ItemType, SyncDirection};

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Offline-first notebooks synced through any blob store")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to the local workspace file
    #[arg(long, global = true, value_name = "PATH")]
    pub workspace: Option<PathBuf>,

    /// Optional path to the remotes configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a notebook, folder, document, or page
    #[command(alias = "new")]
    Add {
        /// Kind of item to create
        #[arg(value_enum)]
        kind: ItemKind,
        /// Item title (default title of the kind when omitted)
        title: Vec<String>,
        /// Parent item ID or unique ID prefix
        #[arg(short, long, value_name = "ID")]
        parent: Option<String>,
    },
    /// List the collection as a tree
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one item with its content
    Show {
        /// Item ID or unique ID prefix
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit fields of an item; opens $EDITOR on the content when no field is given
    Edit {
        /// Item ID or unique ID prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// New parent item ID or prefix (`home` for the top level)
        #[arg(long, value_name = "ID")]
        parent: Option<String>,
        #[arg(long)]
        order: Option<i64>,
    },
    /// Delete an item and everything below it
    Delete {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Show local changes waiting to be pushed
    Changes {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List conflict copies and relocated items
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage sync remotes
    Remote {
        #[command(subcommand)]
        command: RemoteCommands,
    },
    /// Synchronize with the configured remotes
    Sync {
        /// What the cycle should do
        #[arg(value_enum, default_value_t = SyncMode::Sync)]
        mode: SyncMode,
        /// Limit the cycle to one remote
        #[arg(long, value_name = "NAME")]
        remote: Option<String>,
        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
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

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Register a remote; the first one becomes the primary
    Add {
        /// Remote name
        name: String,
        /// Remote file layout
        #[arg(long, value_enum, default_value_t = StrategyArg::Single)]
        strategy: StrategyArg,
        #[command(subcommand)]
        driver: DriverCommands,
    },
    /// List configured remotes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a remote and forget its sync state
    Remove {
        /// Remote name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum DriverCommands {
    /// A local or mounted directory
    Dir {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },
    /// A WebDAV server
    Webdav {
        #[arg(value_name = "URL")]
        url: String,
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        password: String,
        /// Folder under the server root holding the collection
        #[arg(long, default_value = "quire")]
        folder: String,
    },
    /// A Cloudflare R2 bucket
    R2 {
        /// Read R2_* variables from the environment (and .env)
        #[arg(long)]
        from_env: bool,
        #[arg(long)]
        account_id: Option<String>,
        #[arg(long)]
        bucket: Option<String>,
        #[arg(long)]
        access_key_id: Option<String>,
        #[arg(long)]
        secret_access_key: Option<String>,
        /// Key prefix inside the bucket
        #[arg(long, default_value = "")]
        prefix: String,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ItemKind {
    Notebook,
    Folder,
    Document,
    Page,
}

impl From<ItemKind> for ItemType {
    fn from(kind: ItemKind) -> Self {
        match kind {
            ItemKind::Notebook => Self::Notebook,
            ItemKind::Folder => Self::Folder,
            ItemKind::Document => Self::Document,
            ItemKind::Page => Self::Page,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum SyncMode {
    Sync,
    Push,
    Pull,
    ForcePush,
    ForcePull,
}

impl From<SyncMode> for SyncDirection {
    fn from(mode: SyncMode) -> Self {
        match mode {
            SyncMode::Sync => Self::Sync,
            SyncMode::Push => Self::Push,
            SyncMode::Pull => Self::Pull,
            SyncMode::ForcePush => Self::ForcePush,
            SyncMode::ForcePull => Self::ForcePull,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StrategyArg {
    Single,
    Bucket,
}

impl From<StrategyArg> for StrategyKind {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Single => Self::Single,
            StrategyArg::Bucket => Self::Bucket,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
