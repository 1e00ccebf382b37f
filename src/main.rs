mod catalog;
mod cli;
mod db;
mod engine;
mod error;
mod execution;
mod export;
mod filters;
mod fmt;
mod models;
mod period;
mod presets;
mod rowset;
mod settings;
mod store;
mod templates;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, DashboardsCommands, ExecutionsCommands, FiltersCommands, TemplatesCommands, UsersCommands};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let user = cli.user.as_deref();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Users { command } => match command {
            UsersCommands::Add {
                username,
                name,
                staff,
                default,
            } => cli::users::add(&username, name.as_deref(), staff, default),
            UsersCommands::List => cli::users::list(),
        },
        Commands::Demo => cli::demo::run(),
        Commands::Templates { command } => match command {
            TemplatesCommands::Add {
                name,
                category,
                fields,
                format,
                description,
                sort,
                defaults,
                public,
            } => cli::templates::add(
                user,
                cli::templates::AddArgs {
                    name: &name,
                    category: &category,
                    fields,
                    format: &format,
                    description,
                    sort,
                    defaults: &defaults,
                    public,
                },
            ),
            TemplatesCommands::List => cli::templates::list(user),
            TemplatesCommands::Show { id } => cli::templates::show(user, id),
            TemplatesCommands::Fields { category } => cli::templates::fields(&category),
            TemplatesCommands::Delete { id } => cli::templates::delete(user, id),
        },
        Commands::Run {
            template,
            params,
            filter,
            limit,
        } => cli::run::run(user, template, &params, filter, limit),
        Commands::Export(args) => cli::export::run(user, args),
        Commands::Executions { command, limit } => match command {
            Some(ExecutionsCommands::Cancel { id }) => cli::executions::cancel(user, id),
            None => cli::executions::list(user, limit),
        },
        Commands::Filters { command } => match command {
            FiltersCommands::Save {
                name,
                category,
                params,
                description,
                public,
                favorite,
            } => cli::filters::save(
                user,
                cli::filters::SaveArgs {
                    name: &name,
                    category: &category,
                    params: &params,
                    description,
                    public,
                    favorite,
                },
            ),
            FiltersCommands::List { category } => cli::filters::list(user, category.as_deref()),
        },
        Commands::Dashboards { command } => match command {
            DashboardsCommands::Add {
                name,
                widgets,
                description,
                public,
                default,
            } => cli::dashboards::add(user, &name, &widgets, description, public, default),
            DashboardsCommands::List => cli::dashboards::list(user),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
