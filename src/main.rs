mod app;
mod cli;
mod config;
mod diagnostics;
mod exercises;
mod models;
mod rest;
mod session;
mod users;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "reps", about = "Keep a personal exercise list in a PostgREST backend")]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<cli::Command>,

    #[arg(long, env = "SUPABASE_URL", help = "Backend base URL")]
    pub url: Option<String>,

    #[arg(long, help = "API key (overrides config and env vars)")]
    pub api_key: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Directory for the session file and REPL history")]
    pub state_dir: Option<PathBuf>,

    #[arg(
        long,
        value_name = "MODE",
        help = "Password check on login: advisory, strict"
    )]
    pub password_check: Option<String>,

    #[arg(long, help = "Filter exercises by owner on the server")]
    pub server_filter: bool,

    #[arg(short, long, help = "Verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Debug output and schema diagnostics")]
    pub debug: bool,
}

fn init_logging(args: &Args) {
    let filter = if args.debug {
        EnvFilter::new("debug,ureq=warn,rustls=warn,rustyline=warn")
    } else if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(&args);

    let mut cfg = if let Some(config_path) = &args.config {
        config::Config::load_from(config_path)?
    } else {
        config::Config::load()?
    };

    // CLI flags override config files
    if let Some(url) = &args.url {
        cfg.backend.url = Some(url.clone());
    }
    if let Some(api_key) = &args.api_key {
        cfg.backend.api_key = Some(api_key.clone());
    }
    if let Some(dir) = &args.state_dir {
        cfg.session.dir = Some(dir.clone());
    }
    if let Some(mode_str) = &args.password_check {
        if let Some(mode) = config::PasswordCheck::from_str(mode_str) {
            cfg.auth.password_check = Some(mode);
        } else {
            return Err(anyhow::anyhow!(
                "Invalid password check: {}. Use: advisory, strict",
                mode_str
            ));
        }
    }
    if args.server_filter {
        cfg.exercises.owner_filter = Some(config::OwnerFilter::Server);
    }

    // logout and whoami only read the session file
    let local_only = args.command.as_ref().is_some_and(cli::Command::is_local);

    if let Err(errors) = cfg.validate() {
        if !local_only {
            for e in &errors {
                eprintln!("Config error {}", e);
            }
            return Err(anyhow::anyhow!("Invalid configuration"));
        }
        tracing::debug!(errors = errors.len(), "backend config ignored for local command");
    }

    tracing::debug!(
        users = cfg.users_table(),
        exercises = cfg.exercises_table(),
        password_check = cfg.password_check().as_str(),
        owner_filter = cfg.owner_filter().as_str(),
        "configuration loaded"
    );

    let state_dir = cfg.state_dir()?;
    let api_key = match cfg.backend.resolve_api_key() {
        Ok(key) => key,
        Err(_) if local_only => String::new(),
        Err(e) => return Err(e),
    };
    let url = cfg.backend.url.clone().unwrap_or_default();
    let client = rest::postgrest::PostgrestClient::new(&url, &api_key, cfg.backend.timeout());

    let debug = args.debug || matches!(args.command, Some(cli::Command::Debug { .. }));
    let ctx = cli::Context {
        app: app::App::new(
            &client,
            &cfg,
            session::SessionStore::open(&state_dir),
            debug,
        ),
        history: Some(state_dir.join("history.txt")),
    };

    match &args.command {
        Some(command) => cli::run_once(&ctx, command),
        None => cli::run_repl(&ctx),
    }
}
