use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use sprintdesk::commands::{
    TreeOptions, cmd_bulk_status, cmd_categories, cmd_config_set, cmd_config_show, cmd_set, cmd_show, cmd_tree,
};
use sprintdesk::tree::RowKey;
use sprintdesk::types::{EntityKind, Id};

#[derive(Parser)]
#[command(name = "sprintdesk")]
#[command(about = "Browse and edit a requirement/task/defect board")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the requirement tree of a project
    Tree {
        /// Board file (YAML)
        #[arg(long)]
        board: PathBuf,

        /// Project ID
        #[arg(long)]
        project: Id,

        /// Restrict to a sprint; nests tasks and defects under requirements
        #[arg(long)]
        sprint: Option<Id>,

        /// Restrict to a category
        #[arg(long)]
        category: Option<Id>,

        /// Free-text search over number, title and description
        #[arg(long)]
        search: Option<String>,

        /// Page number (1-based)
        #[arg(long, default_value = "1")]
        page: u32,

        /// Expand a row (e.g. story-1, task-7); repeatable
        #[arg(long)]
        expand: Vec<RowKey>,

        /// Toggle expansion of every expandable row
        #[arg(long)]
        expand_all: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show one entity with its tabs
    #[command(visible_alias = "s")]
    Show {
        /// Board file (YAML)
        #[arg(long)]
        board: PathBuf,

        /// Entity kind: requirement (story), task, defect (bug), test_case
        kind: EntityKind,

        /// Entity ID
        id: Id,

        /// Tab to open (e.g. tasks, defects, history)
        #[arg(long)]
        tab: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change one field of one entity
    Set {
        /// Board file (YAML)
        #[arg(long)]
        board: PathBuf,

        kind: EntityKind,

        id: Id,

        /// Field name (e.g. status, priority, severity, sprint)
        field: String,

        /// New value; "-" clears optional fields
        value: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Set the status of several requirements at once
    BulkStatus {
        /// Board file (YAML)
        #[arg(long)]
        board: PathBuf,

        /// Project ID
        #[arg(long)]
        project: Id,

        /// Sprint scope used to resolve nested row keys
        #[arg(long)]
        sprint: Option<Id>,

        /// New status
        status: String,

        /// Selected row keys; only story rows are acted on
        #[arg(required = true)]
        keys: Vec<RowKey>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the test-case category tree of a project
    Categories {
        /// Board file (YAML)
        #[arg(long)]
        board: PathBuf,

        /// Project ID
        #[arg(long)]
        project: Id,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a configuration value (e.g. page_size, dismiss.suppression_ms)
    Set { key: String, value: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Tree {
            board,
            project,
            sprint,
            category,
            search,
            page,
            expand,
            expand_all,
            json,
        } => {
            cmd_tree(TreeOptions {
                board,
                project,
                sprint,
                category,
                search,
                page,
                expand,
                expand_all,
                json,
            })
            .await
        }

        Commands::Show {
            board,
            kind,
            id,
            tab,
            json,
        } => cmd_show(&board, kind, id, tab.as_deref(), json).await,

        Commands::Set {
            board,
            kind,
            id,
            field,
            value,
            json,
        } => cmd_set(&board, kind, id, &field, &value, json).await,

        Commands::BulkStatus {
            board,
            project,
            sprint,
            status,
            keys,
            json,
        } => cmd_bulk_status(&board, project, sprint, &status, &keys, json).await,

        Commands::Categories {
            board,
            project,
            json,
        } => cmd_categories(&board, project, json).await,

        Commands::Config { action } => match action {
            ConfigAction::Show { json } => cmd_config_show(json),
            ConfigAction::Set { key, value } => cmd_config_set(&key, &value),
        },
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
