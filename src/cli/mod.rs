//! CLI definitions and entry point.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Split tickets into other tickets and track the relationships (`SQLite`)
#[derive(Parser, Debug)]
#[command(name = "st", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (auto-discover .splitticket/tickets.db if not set)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// `SQLite` busy timeout in ms
    #[arg(long, global = true)]
    pub lock_timeout: Option<u64>,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a splitticket workspace
    Init {
        /// Overwrite existing DB
        #[arg(long)]
        force: bool,
    },

    /// Create a new ticket
    Create(CreateArgs),

    /// Show ticket details and split history
    Show {
        /// Ticket IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// List tickets
    List(ListArgs),

    /// Set the tickets a ticket is split into
    Split(SplitArgs),

    /// Show where a ticket was split from and to
    History {
        /// Ticket ID
        id: String,
    },

    /// List tickets a ticket may be split to
    Options {
        /// Ticket ID
        id: String,
    },

    /// Manage milestones
    Milestone {
        #[command(subcommand)]
        command: MilestoneCommands,
    },

    /// Manage components
    Component {
        #[command(subcommand)]
        command: ComponentCommands,
    },

    /// Show version information
    Version,
}

#[derive(Args, Debug, Clone, Default)]
pub struct CreateArgs {
    /// One-line summary
    pub summary: String,

    /// Milestone name
    #[arg(long, short = 'm')]
    pub milestone: Option<String>,

    /// Component name
    #[arg(long, short = 'c')]
    pub component: Option<String>,

    /// Longer description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Keywords
    #[arg(long, short = 'k')]
    pub keywords: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<String>,

    /// Filter by milestone
    #[arg(long, short = 'm')]
    pub milestone: Option<String>,

    /// Filter by component
    #[arg(long, short = 'c')]
    pub component: Option<String>,

    /// Maximum number of tickets to show
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct SplitArgs {
    /// Ticket to split
    pub id: String,

    /// Existing tickets to split to; every run of digits is an id (repeatable)
    #[arg(long = "to", short = 't')]
    pub to: Vec<String>,

    /// New ticket to create and split to: summary[|milestone[|component]] (repeatable)
    #[arg(long = "new", short = 'n')]
    pub new: Vec<String>,

    /// Read a JSON split request from a file ('-' for stdin)
    #[arg(long, conflicts_with_all = ["to", "new", "clear"])]
    pub input: Option<PathBuf>,

    /// Remove every split target
    #[arg(long, conflicts_with_all = ["to", "new"])]
    pub clear: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum MilestoneCommands {
    /// Add a milestone
    Add {
        /// Milestone name
        name: String,

        /// Due date (YYYY-MM-DD, RFC3339 or +Nd)
        #[arg(long)]
        due: Option<String>,
    },

    /// List milestones
    List {
        /// Include completed milestones
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Mark a milestone completed
    Complete {
        /// Milestone name
        name: String,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ComponentCommands {
    /// Add a component
    Add {
        /// Component name
        name: String,
    },

    /// List components
    List,
}
