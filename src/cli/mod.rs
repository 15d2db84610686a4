//! CLI argument definitions for TaskFlow.

use clap::{Args, Parser, Subcommand};

use crate::models::{ListParams, ProjectId, SortOrder, TaskId, UserId};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TF_GIT_COMMIT"),
    " ",
    env!("TF_BUILD_TIMESTAMP"),
    ")"
);

/// TaskFlow - manage projects and tasks from the terminal.
///
/// Start with `tf login`, then `tf dashboard` for an overview.
#[derive(Parser, Debug)]
#[command(name = "tf")]
#[command(author, version, long_version = LONG_VERSION, about = "Command-line client for the TaskFlow API", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Base URL of the API.
    /// Falls back to TASKFLOW_API_URL, then `api-url` in config.kdl.
    #[arg(long = "api-url", global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session locally
    Login {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Create an account and sign in
    Register {
        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Recent projects and task statistics
    Dashboard,

    /// Project management commands
    Project {
        #[command(subcommand)]
        command: ProjectCommands,
    },

    /// Task management commands
    Task {
        #[command(subcommand)]
        command: TaskCommands,
    },

    /// User administration commands (admin only)
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CredentialArgs {
    /// Account email
    #[arg(short, long)]
    pub email: String,

    /// Account password (or set TF_PASSWORD)
    #[arg(short, long, env = "TF_PASSWORD", hide_env_values = true)]
    pub password: String,
}

/// Pagination, sorting and search flags shared by list commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long)]
    pub page: Option<u32>,

    /// Items per page
    #[arg(long)]
    pub limit: Option<u32>,

    /// Case-insensitive text search
    #[arg(short, long)]
    pub search: Option<String>,

    /// Field to sort by (e.g., createdAt)
    #[arg(long)]
    pub sort_by: Option<String>,

    /// Sort direction: asc or desc
    #[arg(long, value_parser = parse_sort_order)]
    pub sort_order: Option<SortOrder>,
}

impl ListArgs {
    pub fn to_params(&self) -> ListParams {
        ListParams {
            page: self.page,
            limit: self.limit,
            sort_by: self.sort_by.clone(),
            sort_order: self.sort_order,
            search: self.search.clone(),
        }
    }
}

fn parse_sort_order(s: &str) -> Result<SortOrder, String> {
    SortOrder::parse(s).ok_or_else(|| format!("expected 'asc' or 'desc', got '{}'", s))
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List your projects
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Show a project and its tasks
    Show {
        /// Project ID
        id: ProjectId,
    },

    /// Create a project
    Create {
        /// Project name
        name: String,
    },

    /// Rename a project
    Rename {
        /// Project ID
        id: ProjectId,
        /// New name
        name: String,
    },

    /// Delete a project and its tasks
    Delete {
        /// Project ID
        id: ProjectId,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// List tasks (all tasks for admins), split into active and completed
    List {
        #[command(flatten)]
        list: ListArgs,
    },

    /// Show task details
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Create a task in a project
    Create {
        /// Task title
        title: String,

        /// Owning project ID
        #[arg(short, long)]
        project: ProjectId,

        /// Task description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Update task fields
    Update {
        /// Task ID
        id: TaskId,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// Set completion state explicitly
        #[arg(long)]
        completed: Option<bool>,
    },

    /// Flip a task between active and completed
    Toggle {
        /// Task ID
        id: TaskId,
    },

    /// Assign a task to a user
    Assign {
        /// Task ID
        id: TaskId,
        /// Assignee user ID
        user: UserId,
    },

    /// Remove a task's assignee
    Unassign {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task
    Delete {
        /// Task ID
        id: TaskId,
    },
}

/// User subcommands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List all users
    List,
}

/// Configuration subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved configuration and where each value came from
    Show,

    /// Set a configuration value in config.kdl
    Set {
        /// Configuration key (api-url, output-format, timeout-secs, log-file)
        key: String,
        /// Configuration value
        value: String,
    },
}
