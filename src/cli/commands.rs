use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "mkl", about = concat!("marklist v", env!("CARGO_PKG_VERSION"), " - a filtered view over a markdown todo list"), version)]
pub struct Cli {
    /// Todo file (default: todo.md in the working directory)
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Never write to the file
    #[arg(long, global = true)]
    pub read_only: bool,

    /// Show section headings
    #[arg(long, global = true)]
    pub show_headings: bool,

    /// Show at most N rows (0 = all)
    #[arg(long, global = true, value_name = "N")]
    pub max_visible: Option<usize>,
}

impl Cli {
    pub fn file_path(&self) -> PathBuf {
        self.file.clone().unwrap_or_else(|| PathBuf::from("todo.md"))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the filtered task tree
    List(ListArgs),
    /// Append a task, or insert it after task N
    Add(AddArgs),
    /// Flip the checkbox of task N
    Toggle(TaskArg),
    /// Replace the text of task N
    Edit(EditArgs),
    /// Delete task N with its subtasks
    Delete(TaskArg),
    /// Move task N one step in the filtered view
    Move(MoveArgs),
    /// Run a palette command (e.g. sort-due, check-all)
    Cmd(CmdArgs),
    /// Feed keys through the interactive handlers, then print the view
    Run(RunArgs),
    /// Show the tags, priorities and due buckets in use
    Tags,
    /// List, clear or open recently used files
    Recent(RecentArgs),
}

// ---------------------------------------------------------------------------
// Read command args
// ---------------------------------------------------------------------------

#[derive(Args, Default)]
pub struct FilterArgs {
    /// Hide checked tasks
    #[arg(long)]
    pub filter_done: bool,
    /// Only tasks with this tag (repeatable)
    #[arg(long)]
    pub tag: Vec<String>,
    /// Only tasks with this priority number (repeatable)
    #[arg(long)]
    pub priority: Vec<u32>,
    /// Only tasks due in this bucket (overdue, today, week, all)
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args)]
pub struct RecentArgs {
    /// `list` (default), `clear`, or an entry number to open
    pub action: Option<String>,
}

// ---------------------------------------------------------------------------
// Write command args
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct TaskArg {
    /// Task number (1-based, counting every task in the file)
    pub number: usize,
}

#[derive(Args)]
pub struct AddArgs {
    /// Task text
    pub text: String,
    /// Insert after this task (and its subtasks) instead of at the end
    #[arg(long, value_name = "N")]
    pub after: Option<usize>,
}

#[derive(Args)]
pub struct EditArgs {
    /// Task number
    pub number: usize,
    /// New text
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

#[derive(Args)]
pub struct MoveArgs {
    /// Task number
    pub number: usize,
    /// Direction to move
    #[arg(value_enum)]
    pub direction: MoveDirection,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args)]
pub struct CmdArgs {
    /// Command id as shown in the palette
    pub name: String,
    /// Argument for commands that take one
    pub arg: Option<String>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Key script: plain characters plus <esc>, <enter>, <tab>, <s-tab>,
    /// <up>, <down>, <bs>, <c-x>
    #[arg(long)]
    pub keys: String,
}
