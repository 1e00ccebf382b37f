pub mod dashboards;
pub mod demo;
pub mod executions;
pub mod export;
pub mod filters;
pub mod init;
pub mod run;
pub mod status;
pub mod templates;
pub mod users;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rusqlite::Connection;

use crate::catalog::Category;
use crate::db::{get_connection, DB_FILE};
use crate::error::{DocketError, Result};
use crate::models::User;
use crate::settings::{load_settings, Settings};
use crate::store::find_user;

#[derive(Parser)]
#[command(name = "docket", about = "Report templates, runs and exports for a legal practice.")]
pub struct Cli {
    /// Act as this user (default: `user_name` from settings)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for docket data (default: ~/Documents/docket)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage users.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Load sample users, clients, cases and financial entries.
    Demo,
    /// Manage report templates.
    Templates {
        #[command(subcommand)]
        command: TemplatesCommands,
    },
    /// Run a template and record the execution.
    Run {
        /// Template ID (shown in `docket templates list`)
        template: i64,
        /// Filter parameters as key=value, e.g. period=this_month
        params: Vec<String>,
        /// Start from a saved filter's parameters
        #[arg(long)]
        filter: Option<i64>,
        /// Rows to print (the execution always covers every row)
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Export a completed execution to PDF, XLSX or CSV.
    Export(ExportArgs),
    /// Show your execution history.
    Executions {
        #[command(subcommand)]
        command: Option<ExecutionsCommands>,
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Manage saved filters.
    Filters {
        #[command(subcommand)]
        command: FiltersCommands,
    },
    /// Manage dashboards.
    Dashboards {
        #[command(subcommand)]
        command: DashboardsCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Add a user.
    Add {
        /// Login name
        username: String,
        /// Display name
        #[arg(long)]
        name: Option<String>,
        /// Staff users see every record and template
        #[arg(long)]
        staff: bool,
        /// Make this the acting user when --user is omitted
        #[arg(long)]
        default: bool,
    },
    /// List users.
    List,
}

#[derive(Subcommand)]
pub enum TemplatesCommands {
    /// Create a template.
    Add {
        name: String,
        /// cases, clients or financial
        #[arg(long)]
        category: String,
        /// Comma-separated field ids (see `docket templates fields`)
        #[arg(long, value_delimiter = ',', required = true)]
        fields: Vec<String>,
        /// pdf, spreadsheet or csv
        #[arg(long, default_value = "pdf")]
        format: String,
        #[arg(long)]
        description: Option<String>,
        /// Comma-separated sort keys; prefix with '-' for descending
        #[arg(long, value_delimiter = ',')]
        sort: Vec<String>,
        /// Default filter as key=value (repeatable)
        #[arg(long = "default")]
        defaults: Vec<String>,
        /// Visible to every user
        #[arg(long)]
        public: bool,
    },
    /// List templates visible to you.
    List,
    /// Show one template with its usage.
    Show { id: i64 },
    /// List the fields a category can select.
    Fields { category: String },
    /// Deactivate a template.
    Delete { id: i64 },
}

#[derive(Args)]
pub struct ExportArgs {
    /// Execution ID (shown in `docket executions`)
    pub execution: i64,
    /// pdf, xlsx or csv (default: the template's output format)
    #[arg(long)]
    pub format: Option<String>,
    /// Output file path (default: <data_dir>/exports/relatorio_<id>.<ext>)
    #[arg(long)]
    pub output: Option<String>,
    /// Replace the default "Report: <template>" title
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub landscape: bool,
    /// Omit the metadata preamble
    #[arg(long = "no-header")]
    pub no_header: bool,
    /// Omit the PDF generated-at line and notes
    #[arg(long = "no-footer")]
    pub no_footer: bool,
    /// Omit the PDF statistics summary
    #[arg(long = "no-charts")]
    pub no_charts: bool,
    /// Free text printed in the PDF footer and stored on the execution
    #[arg(long)]
    pub notes: Option<String>,
}

#[derive(Subcommand)]
pub enum ExecutionsCommands {
    /// Cancel one of your pending executions.
    Cancel { id: i64 },
}

#[derive(Subcommand)]
pub enum FiltersCommands {
    /// Save a named set of filter parameters.
    Save {
        name: String,
        #[arg(long)]
        category: String,
        /// Parameters as key=value
        params: Vec<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        public: bool,
        #[arg(long)]
        favorite: bool,
    },
    /// List saved filters visible to you.
    List {
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum DashboardsCommands {
    /// Save a dashboard of template widgets.
    Add {
        name: String,
        /// Template ID to show as a widget (repeatable)
        #[arg(long = "widget")]
        widgets: Vec<i64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        public: bool,
        /// Open this dashboard first
        #[arg(long)]
        default: bool,
    },
    /// List dashboards visible to you.
    List,
}

/// Open connection plus the acting user, shared by every data command.
pub(crate) struct Session {
    pub conn: Connection,
    pub settings: Settings,
    pub user: User,
}

pub(crate) fn db_path(settings: &Settings) -> PathBuf {
    PathBuf::from(&settings.data_dir).join(DB_FILE)
}

pub(crate) fn open_db(settings: &Settings) -> Result<Connection> {
    let path = db_path(settings);
    if !path.exists() {
        return Err(DocketError::Other(
            "No database found. Run `docket init` first.".to_string(),
        ));
    }
    get_connection(&path)
}

pub(crate) fn session(user: Option<&str>) -> Result<Session> {
    let settings = load_settings();
    let conn = open_db(&settings)?;
    let username = match user.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => u.to_string(),
        None if !settings.user_name.is_empty() => settings.user_name.clone(),
        None => {
            return Err(DocketError::Validation(
                "No acting user. Pass --user or run `docket users add <name> --default`.".to_string(),
            ))
        }
    };
    let user = find_user(&conn, &username)?;
    tracing::debug!(user = %user.username, staff = user.is_staff, "session opened");
    Ok(Session { conn, settings, user })
}

pub(crate) fn parse_category(raw: &str) -> Result<Category> {
    Category::parse(raw.trim())
        .ok_or_else(|| DocketError::Validation(format!("Unknown category: '{raw}'")))
}
