//! TaskFlow CLI - manage projects and tasks from the terminal.

use clap::Parser;
use std::path::Path;
use std::process;
use std::sync::Arc;

use taskflow::cli::{
    Cli, Commands, ConfigCommands, ProjectCommands, TaskCommands, UserCommands,
};
use taskflow::commands::{self, Output};
use taskflow::config::{self, ConfigOverrides, OutputFormat, ResolvedConfig, TaskflowConfig};
use taskflow::http::ReqwestTransport;
use taskflow::models::TaskPatch;
use taskflow::query::QueryOptions;
use taskflow::session::StateFileStore;
use taskflow::{Error, Result, Taskflow, logging};

fn main() {
    let cli = Cli::parse();

    let stored = match config::read_config() {
        Ok(stored) => stored,
        Err(e) => {
            report_error(&e, cli.human_readable);
            process::exit(1);
        }
    };

    let mut overrides = ConfigOverrides::new();
    if let Some(url) = cli.api_url {
        overrides = overrides.with_api_url(url);
    }
    if cli.human_readable {
        overrides = overrides.with_output_format(OutputFormat::Human);
    }
    let resolved = config::resolve_config(&stored, &overrides, |name| std::env::var(name).ok());
    let human = resolved.output_format() == OutputFormat::Human;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = match logging::init(resolved.log_file().map(Path::new)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Warning: logging disabled: {}", e);
            None
        }
    };

    let result = match cli.command {
        Commands::Config { command } => run_config(command, stored, &resolved, human),
        command => run_remote(command, &resolved, human),
    };

    if let Err(e) = result {
        report_error(&e, human);
        process::exit(1);
    }
}

fn run_config(
    command: ConfigCommands,
    stored: TaskflowConfig,
    resolved: &ResolvedConfig,
    human: bool,
) -> Result<()> {
    match command {
        ConfigCommands::Show => output(&commands::config::show(resolved)?, human),
        ConfigCommands::Set { key, value } => {
            output(&commands::config::set(stored, &key, &value)?, human)
        }
    }
    Ok(())
}

/// Run a command that talks to the API, persisting cookies afterwards.
fn run_remote(command: Commands, resolved: &ResolvedConfig, human: bool) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let store = Arc::new(StateFileStore::open_default()?);
    let saved = store.load_cookies().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Ignoring unreadable saved cookies");
        Vec::new()
    });
    let transport = Arc::new(ReqwestTransport::with_saved_cookies(
        resolved.api_url(),
        resolved.timeout(),
        &saved,
    )?);
    tracing::debug!(api_url = %transport.base_url(), "Using API");

    // One command per process: nothing would observe a background refetch.
    let app = Taskflow::with_options(
        transport.clone(),
        store.clone(),
        QueryOptions {
            refetch_on_invalidate: false,
        },
    );

    let forget_cookies = matches!(command, Commands::Logout);
    let result = runtime.block_on(run_command(command, &app, human));

    let cookies = if forget_cookies {
        Vec::new()
    } else {
        transport.cookies().snapshot()
    };
    if let Err(e) = store.save_cookies(cookies) {
        tracing::warn!(error = %e, "Could not persist cookies");
    }
    result
}

async fn run_command(command: Commands, app: &Taskflow, human: bool) -> Result<()> {
    match command {
        Commands::Login { credentials } => {
            let result =
                commands::auth::login(app, &credentials.email, &credentials.password).await?;
            output(&result, human);
        }
        Commands::Register { credentials } => {
            let result =
                commands::auth::register(app, &credentials.email, &credentials.password).await?;
            output(&result, human);
        }
        Commands::Logout => output(&commands::auth::logout(app).await?, human),
        Commands::Whoami => output(&commands::auth::whoami(app).await?, human),
        Commands::Dashboard => output(&commands::dashboard::show(app).await?, human),
        Commands::Project { command } => match command {
            ProjectCommands::List { list } => {
                output(&commands::projects::list(app, list.to_params()).await?, human)
            }
            ProjectCommands::Show { id } => {
                output(&commands::projects::show(app, id).await?, human)
            }
            ProjectCommands::Create { name } => {
                output(&commands::projects::create(app, name).await?, human)
            }
            ProjectCommands::Rename { id, name } => {
                output(&commands::projects::rename(app, id, name).await?, human)
            }
            ProjectCommands::Delete { id } => {
                output(&commands::projects::delete(app, id).await?, human)
            }
        },
        Commands::Task { command } => match command {
            TaskCommands::List { list } => {
                output(&commands::tasks::list(app, list.to_params()).await?, human)
            }
            TaskCommands::Show { id } => output(&commands::tasks::show(app, id).await?, human),
            TaskCommands::Create {
                title,
                project,
                description,
            } => {
                let result = commands::tasks::create(app, project, title, description).await?;
                output(&result, human);
            }
            TaskCommands::Update {
                id,
                title,
                description,
                completed,
            } => {
                let patch = TaskPatch {
                    title,
                    description,
                    completed,
                };
                output(&commands::tasks::update(app, id, patch).await?, human);
            }
            TaskCommands::Toggle { id } => {
                output(&commands::tasks::toggle(app, id).await?, human)
            }
            TaskCommands::Assign { id, user } => {
                output(&commands::tasks::assign(app, id, user).await?, human)
            }
            TaskCommands::Unassign { id } => {
                output(&commands::tasks::unassign(app, id).await?, human)
            }
            TaskCommands::Delete { id } => {
                output(&commands::tasks::delete(app, id).await?, human)
            }
        },
        Commands::User { command } => match command {
            UserCommands::List => output(&commands::users::list(app).await?, human),
        },
        Commands::Config { .. } => {
            return Err(Error::Other(
                "config commands do not contact the API".to_string(),
            ));
        }
    }
    Ok(())
}

fn output<T: Output>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}

fn report_error(error: &Error, human: bool) {
    let needs_login = error.needs_login();
    if human {
        eprintln!("Error: {}", error);
        if needs_login && !matches!(error, Error::NotLoggedIn) {
            eprintln!("Run 'tf login' to sign in again.");
        }
    } else {
        let mut body = serde_json::json!({ "error": error.to_string() });
        if needs_login {
            body["hint"] = serde_json::json!("Run 'tf login'");
        }
        eprintln!("{}", body);
    }
}
