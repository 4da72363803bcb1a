use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use session::api::DEFAULT_PAGE_LIMIT;
use session::config::{backend_url_from_env, env_bool, strip_trailing_slash};
use session::token_store::StoreError;
use session::{
    ApiClient, ApiError, AuthError, FileTokenStore, HttpAuthGateway, SessionManager, SessionPhase, TodoCreate,
    TodoUpdate, TokenStore,
};

const TOKEN_DIR_NAME: &str = "todo-session";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no config directory available; pass --token-dir or set TODO_TOKEN_DIR")]
    MissingTokenDir,
    #[error("token store unavailable: {0}")]
    TokenStore(#[from] StoreError),
    #[error("not logged in; run `todo login <username>` first")]
    NotLoggedIn,
    #[error("session expired, please log in again")]
    SessionExpired,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("failed to read input: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Todo app session and API CLI")]
struct Cli {
    /// Backend (or proxy) base URL. Falls back to `BACKEND_API_URL` and friends.
    #[arg(long, env = "TODO_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "TODO_TOKEN_DIR")]
    token_dir: Option<PathBuf>,

    /// Talk to the same-origin proxy (`/api/auth/*`) instead of the backend.
    #[arg(long, default_value_t = false)]
    via_proxy: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        username: String,
        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    Register {
        username: String,
        email: String,
        #[arg(long, env = "TODO_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        #[arg(long)]
        confirm_password: Option<String>,
    },
    Logout,
    Whoami,
    /// Backend health probe; needs no session.
    Status,
    Todo(TodoCommand),
}

#[derive(Args, Debug)]
struct TodoCommand {
    #[command(subcommand)]
    command: TodoSubcommand,
}

#[derive(Subcommand, Debug)]
enum TodoSubcommand {
    List {
        #[arg(long, default_value_t = DEFAULT_PAGE_LIMIT)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long)]
        completed: Option<bool>,
    },
    Get {
        id: i64,
    },
    Create {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due_date: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        completed: Option<bool>,
        #[arg(long)]
        due_date: Option<String>,
    },
    Complete {
        id: i64,
    },
    Delete {
        id: i64,
    },
}

struct CliContext {
    session: SessionManager,
    api: ApiClient,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(tracing::Level::WARN)
        .init();

    let result = run(Cli::parse()).await;
    finish(result, &mut io::stderr())
}

/// Print a failure as its user-facing message and map it to an exit code.
fn finish(result: Result<(), CliError>, err_out: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = writeln!(err_out, "{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let ctx = build_context(&cli)?;

    // Every command starts from whatever session the token store holds.
    let had_token = ctx.session.token_store().get().is_some();
    let phase = ctx.session.restore_session().await;

    match cli.command {
        Command::Login { username, password } => run_login(&ctx, &username, password).await,
        Command::Register { username, email, password, confirm_password } => {
            run_register(&ctx, &username, &email, password, confirm_password).await
        }
        Command::Logout => {
            ctx.session.logout();
            println!("logged out");
            Ok(())
        }
        Command::Whoami => {
            require_session(phase, had_token)?;
            print_json(&ctx.session.user())
        }
        Command::Status => print_json(&ctx.api.health_check().await?),
        Command::Todo(todo) => {
            require_session(phase, had_token)?;
            run_todo(&ctx, todo).await
        }
    }
}

fn build_context(cli: &Cli) -> Result<CliContext, CliError> {
    let base_url = resolve_base_url(cli.base_url.as_deref());
    let token_dir = resolve_token_dir(cli.token_dir.clone(), dirs::config_dir())?;
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(token_dir, &base_url)?);

    let mut gateway = HttpAuthGateway::new(&base_url);
    if cli.via_proxy || env_bool("TODO_VIA_PROXY").unwrap_or(false) {
        gateway = gateway.via_proxy();
    }

    let session = SessionManager::new(store, Arc::new(gateway));
    let api = ApiClient::new(&base_url, session.clone());
    Ok(CliContext { session, api })
}

fn resolve_base_url(flag: Option<&str>) -> String {
    match flag.map(str::trim).filter(|v| !v.is_empty()) {
        Some(url) => strip_trailing_slash(url).to_owned(),
        None => backend_url_from_env(),
    }
}

fn resolve_token_dir(flag: Option<PathBuf>, config_dir: Option<PathBuf>) -> Result<PathBuf, CliError> {
    flag.or_else(|| config_dir.map(|dir| dir.join(TOKEN_DIR_NAME)))
        .ok_or(CliError::MissingTokenDir)
}

/// A present-but-rejected token reads as expiry; no token at all as logged out.
fn require_session(phase: SessionPhase, had_token: bool) -> Result<(), CliError> {
    match (phase, had_token) {
        (SessionPhase::Authenticated, _) => Ok(()),
        (_, true) => Err(CliError::SessionExpired),
        (_, false) => Err(CliError::NotLoggedIn),
    }
}

// =============================================================================
// AUTH COMMANDS
// =============================================================================

async fn run_login(ctx: &CliContext, username: &str, password: Option<String>) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt("password: ")?,
    };
    ctx.session.login(username, &password).await?;
    report_logged_in(ctx);
    Ok(())
}

async fn run_register(
    ctx: &CliContext,
    username: &str,
    email: &str,
    password: Option<String>,
    confirm_password: Option<String>,
) -> Result<(), CliError> {
    let password = match password {
        Some(password) => password,
        None => prompt("password: ")?,
    };
    let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
    ctx.session.register(username, email, &password, &confirm_password).await?;
    report_logged_in(ctx);
    Ok(())
}

fn report_logged_in(ctx: &CliContext) {
    match ctx.session.user() {
        Some(user) => println!("logged in as {} <{}>", user.username, user.email),
        None => println!("logged in"),
    }
}

fn prompt(label: &str) -> Result<String, CliError> {
    eprint!("{label}");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

// =============================================================================
// TODO COMMANDS
// =============================================================================

async fn run_todo(ctx: &CliContext, todo: TodoCommand) -> Result<(), CliError> {
    let result = match todo.command {
        TodoSubcommand::List { limit, offset, completed } => {
            ctx.api.list_todos(limit, offset, completed).await.map(|todos| print_json(&todos))
        }
        TodoSubcommand::Get { id } => ctx.api.get_todo(id).await.map(|todo| print_json(&todo)),
        TodoSubcommand::Create { title, description, due_date } => {
            let body = TodoCreate { title, description, completed: None, due_date };
            ctx.api.create_todo(&body).await.map(|todo| print_json(&todo))
        }
        TodoSubcommand::Update { id, title, description, completed, due_date } => {
            let body = TodoUpdate { title, description, completed, due_date };
            if body == TodoUpdate::default() {
                return Err(CliError::EmptyUpdate);
            }
            ctx.api.partial_update_todo(id, &body).await.map(|todo| print_json(&todo))
        }
        TodoSubcommand::Complete { id } => {
            let body = TodoUpdate { completed: Some(true), ..TodoUpdate::default() };
            ctx.api.partial_update_todo(id, &body).await.map(|todo| print_json(&todo))
        }
        TodoSubcommand::Delete { id } => ctx.api.delete_todo(id).await.map(|()| {
            println!("deleted {id}");
            Ok(())
        }),
    };

    match result {
        Ok(printed) => printed,
        // The client already forced the logout.
        Err(ApiError::Unauthorized) => Err(CliError::SessionExpired),
        Err(e) => Err(e.into()),
    }
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
