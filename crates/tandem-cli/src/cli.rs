use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Offline-first todo list that syncs when you tell it to")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Quick add: tandem "buy milk"
    #[arg(trailing_var_arg = true)]
    pub text: Vec<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new item
    #[command(alias = "new")]
    Add {
        /// Item text
        text: Vec<String>,
    },
    /// List items
    List {
        /// Number of items to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Only items not yet completed
        #[arg(short, long)]
        pending: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change an item's text (opens $EDITOR when no text is given)
    Edit {
        /// Item ID or unique ID prefix
        id: String,
        /// New text
        text: Vec<String>,
    },
    /// Mark an item complete
    #[command(alias = "done")]
    Complete {
        /// Item ID or unique ID prefix
        id: String,
        /// Mark the item incomplete instead
        #[arg(long)]
        undo: bool,
    },
    /// Delete an item
    Delete {
        /// Item ID or unique ID prefix
        id: String,
    },
    /// Push queued changes and resolve conflicts
    Push {
        /// How to settle conflicts that need a decision
        #[arg(long, value_enum, default_value_t = ResolveStrategy::Prompt)]
        resolve: ResolveStrategy,
    },
    /// Pull remote changes into the local database
    Pull {
        /// Remote filter expression
        #[arg(long, value_name = "EXPR")]
        filter: Option<String>,
    },
    /// Push, then pull
    #[command(alias = "sync")]
    Refresh {
        /// How to settle conflicts that need a decision
        #[arg(long, value_enum, default_value_t = ResolveStrategy::Prompt)]
        resolve: ResolveStrategy,
        /// Remote filter expression for the pull
        #[arg(long, value_name = "EXPR")]
        filter: Option<String>,
    },
    /// Show operations waiting to be pushed
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List recently resolved sync conflicts
    Conflicts {
        /// Number of conflicts to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
        /// Output as JSON
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

/// Source of conflict decisions during push
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ResolveStrategy {
    /// Ask on the terminal
    #[default]
    Prompt,
    /// Keep the server copy
    Server,
    /// Push the local copy again
    Client,
    /// Leave conflicting changes queued
    Skip,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}
