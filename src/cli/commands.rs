use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tb", about = concat!("[|>] tablero v", env!("CARGO_PKG_VERSION"), " - stage pipelines for quotes and projects"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different board directory
    #[arg(short = 'C', long = "board-dir", global = true)]
    pub board_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new board in the current directory
    Init(InitArgs),
    /// List a pipeline's stages in display order
    Stages(StagesArgs),
    /// List entities stage by stage
    List(ListArgs),
    /// Show one entity with its ledger
    Show(ShowArgs),
    /// Show an entity's stage history
    History(HistoryArgs),
    /// Create an entity in the pipeline's first stage
    New(NewArgs),
    /// Move an entity to another stage
    Mv(MvArgs),
    /// Rewrite the order of one stage
    Reorder(ReorderArgs),
    /// Revert an entity's most recent stage entry
    Undo(UndoArgs),
    /// Save a project stage's sub-record
    Record(RecordArgs),
    /// Permanently delete an entity (removable stages only)
    Delete(DeleteArgs),
    /// Stage management
    Stage(StageCmd),
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct InitArgs {
    /// Board name (default: inferred from directory name)
    #[arg(long)]
    pub name: Option<String>,
    /// Reinitialize even if tablero/ already exists
    #[arg(long)]
    pub force: bool,
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StagesArgs {
    /// Pipeline (quotes or projects)
    pub pipeline: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Pipeline (quotes or projects)
    pub pipeline: String,
    /// Only this stage (id or display name)
    #[arg(long)]
    pub stage: Option<String>,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Entity ID (e.g. Q-001)
    pub id: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    /// Entity ID
    pub id: String,
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NewArgs {
    /// Pipeline (quotes or projects)
    pub pipeline: String,
    /// Client name
    pub client: String,
    /// Monetary amount
    #[arg(long, default_value_t = 0)]
    pub amount: i64,
    /// Responsible salesperson or technician
    #[arg(long)]
    pub assignee: Option<String>,
    /// Free-text detail
    #[arg(long)]
    pub detail: Option<String>,
}

#[derive(Args)]
pub struct MvArgs {
    /// Entity ID
    pub id: String,
    /// Destination stage (id or display name)
    pub stage: String,
    /// Form value for a required field: --set key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
}

#[derive(Args)]
pub struct ReorderArgs {
    /// Stage (id or display name)
    pub stage: String,
    /// The complete entity id list in the new order
    pub ids: Vec<String>,
}

#[derive(Args)]
pub struct UndoArgs {
    /// Entity ID
    pub id: String,
}

#[derive(Args)]
pub struct RecordArgs {
    /// Project ID
    pub id: String,
    /// Stage whose sub-record to edit (id or display name)
    pub stage: String,
    /// Field value: --set key=value (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,
    /// Add an attachment reference (repeatable)
    #[arg(long = "attach", value_name = "REF")]
    pub attach: Vec<String>,
    /// Assigned technician
    #[arg(long)]
    pub assignee: Option<String>,
    /// Send to next stage: yes, no, or in-review
    #[arg(long)]
    pub advance: Option<String>,
    /// Workshop route: deposit, logistics, on-site-install, customer-pickup
    #[arg(long)]
    pub route: Option<String>,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Entity ID
    pub id: String,
}

// ---------------------------------------------------------------------------
// Stage management
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct StageCmd {
    #[command(subcommand)]
    pub command: StageCommands,
}

#[derive(Subcommand)]
pub enum StageCommands {
    /// Add a stage at the end of a pipeline
    Add {
        /// Pipeline (quotes or projects)
        pipeline: String,
        /// Stage id (e.g. follow-up)
        id: String,
        /// Display name
        name: String,
    },
    /// Rename a stage
    Rename {
        /// Stage id
        id: String,
        /// New display name
        name: String,
    },
    /// Rewrite a pipeline's stage order
    Mv {
        /// Pipeline (quotes or projects)
        pipeline: String,
        /// Stage ids in the new order
        ids: Vec<String>,
    },
    /// Delete a stage (must be empty and unlocked)
    Rm {
        /// Stage id
        id: String,
    },
}
