use crate::app::{App, ExerciseForm, SeedKind};
use crate::diagnostics::SchemaCheck;
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Log in and store the session
    Login { email: String, password: String },
    /// Clear the stored session
    Logout,
    /// Show the logged-in user
    Whoami,
    /// List your exercises
    List,
    /// Add an exercise
    Add {
        name: String,
        repetitions: Option<String>,
        sets: Option<String>,
    },
    /// Replace the fields of an exercise
    Edit {
        id: i64,
        name: String,
        repetitions: Option<String>,
        sets: Option<String>,
    },
    /// Delete an exercise
    #[command(alias = "delete")]
    Rm { id: i64 },
    /// Create a seed account (teste@exemplo.com or plain@exemplo.com)
    Seed {
        #[arg(value_enum, default_value_t = SeedKind::Test)]
        kind: SeedKind,
    },
    /// Backend schema diagnostics
    Debug {
        #[command(subcommand)]
        action: Option<DebugAction>,
    },
    /// Interactive session (default)
    Repl,
}

impl Command {
    /// Commands served from the session file alone, without a backend
    pub fn is_local(&self) -> bool {
        matches!(self, Command::Logout | Command::Whoami)
    }
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum DebugAction {
    /// List users with the strict and the tolerant decoder
    Users,
    /// Show the columns and values of the first row of a table
    Schema { table: Option<String> },
    /// Check that the exercises table has the owner column
    Check,
    /// Test the connection to the backend
    Ping,
}

/// One REPL line, parsed with the same grammar as the subcommands
#[derive(Debug, Parser)]
#[command(no_binary_name = true, disable_help_flag = true)]
struct ReplLine {
    #[command(subcommand)]
    command: Command,
}

pub struct Context<'a> {
    pub app: App<'a>,
    pub history: Option<PathBuf>,
}

pub fn run_once(ctx: &Context, command: &Command) -> Result<()> {
    execute(ctx, command)
}

pub fn run_repl(ctx: &Context) -> Result<()> {
    let mut rl = DefaultEditor::new()?;
    if let Some(path) = &ctx.history {
        let _ = rl.load_history(path);
    }

    println!("reps - type help for commands, exit to quit");
    greet(ctx);

    loop {
        match rl.readline("reps> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let action = parse_line(line);
                if records_history(line, &action) {
                    rl.add_history_entry(line)?;
                }

                match action {
                    Ok(LineAction::Exit) => break,
                    Ok(LineAction::Help) => print_help(),
                    Ok(LineAction::Run(command)) => {
                        if let Err(e) = execute(ctx, &command) {
                            eprintln!("Error: {}", e);
                        }
                    }
                    Err(e) => eprintln!("{}", e),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &ctx.history {
        if let Some(dir) = path.parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        if let Err(e) = rl.save_history(path) {
            tracing::debug!(error = %e, "could not save history");
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq)]
enum LineAction {
    Run(Command),
    Help,
    Exit,
}

fn parse_line(line: &str) -> Result<LineAction> {
    let line = line.strip_prefix('/').unwrap_or(line);
    let words = shell_words::split(line).map_err(|e| anyhow!("Could not parse input: {}", e))?;
    match words.first().map(String::as_str) {
        Some("exit" | "quit") => return Ok(LineAction::Exit),
        Some("help" | "?") | None => return Ok(LineAction::Help),
        Some("repl") => return Err(anyhow!("Already in the REPL")),
        _ => {}
    }
    let parsed = ReplLine::try_parse_from(words).map_err(|e| anyhow!("{}", e.render()))?;
    Ok(LineAction::Run(parsed.command))
}

/// Login lines carry a password and never reach the history file
fn records_history(line: &str, action: &Result<LineAction>) -> bool {
    if let Ok(LineAction::Run(Command::Login { .. })) = action {
        return false;
    }
    let line = line.strip_prefix('/').unwrap_or(line);
    line.split_whitespace().next() != Some("login")
}

fn print_help() {
    println!("Commands:");
    println!("  login <email> <password>          - log in");
    println!("  logout                            - end the session");
    println!("  whoami                            - show the logged-in user");
    println!("  list                              - list your exercises");
    println!("  add <name> [reps] [sets]          - add an exercise");
    println!("  edit <id> <name> [reps] [sets]    - update an exercise");
    println!("  rm <id>                           - delete an exercise");
    println!("  seed [test|plain]                 - create a seed account");
    println!("  debug [users|schema <t>|check|ping]");
    println!("  exit                              - quit");
    println!("Quote names with spaces: add \"Supino reto\" 10 3");
}

/// Show who is logged in and warn about a missing owner column
fn greet(ctx: &Context) {
    let Ok(user) = ctx.app.current_user() else {
        println!("Not logged in.");
        return;
    };
    println!("Exercises of {}", user.email);
    let check = ctx.app.check_schema();
    if !check.is_usable() {
        print_check(&check);
    }
}

fn print_check(check: &SchemaCheck) {
    match check {
        SchemaCheck::Ready => println!("Exercises table OK"),
        SchemaCheck::Empty => println!("Exercises table is empty; nothing to check"),
        SchemaCheck::MissingColumn(column) => println!(
            "Warning: the exercises table has no '{}' column. Add it in the backend.",
            column
        ),
        SchemaCheck::Unreachable(e) => println!("Warning: exercises table unreachable: {}", e),
    }
}

fn execute(ctx: &Context, command: &Command) -> Result<()> {
    let app = &ctx.app;
    match command {
        Command::Login { email, password } => {
            let user = app.login(email, password)?;
            println!("Logged in as {}", user.email);
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out");
        }
        Command::Whoami => {
            let user = app.current_user()?;
            println!("{} (id: {})", user.email, user.id);
            if let Some(at) = app.session().load().logged_in_at {
                println!("Logged in at {}", at.to_rfc3339());
            }
        }
        Command::List => print_exercises(app)?,
        Command::Add {
            name,
            repetitions,
            sets,
        } => {
            let saved = app.save_exercise(&form(None, name, repetitions, sets))?;
            println!("Added: {}", saved);
            print_exercises(app)?;
        }
        Command::Edit {
            id,
            name,
            repetitions,
            sets,
        } => {
            let saved = app.save_exercise(&form(Some(*id), name, repetitions, sets))?;
            println!("Updated [{}]: {}", id, saved);
            print_exercises(app)?;
        }
        Command::Rm { id } => {
            app.delete(*id)?;
            println!("Deleted [{}]", id);
            print_exercises(app)?;
        }
        Command::Seed { kind } => {
            let (email, ok) = app.seed(*kind);
            if ok {
                println!("Seed user ready: {} / {}", email, crate::users::SEED_PASSWORD);
            } else {
                println!("Failed to create seed user {}", email);
            }
        }
        Command::Debug { action } => run_debug(ctx, action.as_ref().unwrap_or(&DebugAction::Check))?,
        Command::Repl => run_repl(ctx)?,
    }
    Ok(())
}

fn form(
    editing_id: Option<i64>,
    name: &str,
    repetitions: &Option<String>,
    sets: &Option<String>,
) -> ExerciseForm {
    ExerciseForm {
        editing_id,
        name: name.to_string(),
        repetitions: repetitions.clone().unwrap_or_default(),
        sets: sets.clone().unwrap_or_default(),
    }
}

fn print_exercises(app: &App) -> Result<()> {
    let exercises = app.list()?;
    if exercises.is_empty() {
        println!("No exercises found. Add a new one!");
        return Ok(());
    }
    for ex in &exercises {
        match ex.id {
            Some(id) => println!("  [{}] {}", id, ex),
            None => println!("  [-] {}", ex),
        }
    }
    Ok(())
}

fn run_debug(ctx: &Context, action: &DebugAction) -> Result<()> {
    let diag = ctx
        .app
        .diagnostics()
        .ok_or_else(|| anyhow!("Diagnostics are disabled; run with --debug"))?;

    match action {
        DebugAction::Users => {
            let users = ctx.app.users().list_all_users();
            println!("Users ({}):", users.len());
            for user in &users {
                println!("  {} (id: {})", user.email, user.id.as_deref().unwrap_or("-"));
            }
            let variants = diag.list_user_variants();
            println!("Tolerant decode ({}):", variants.len());
            for v in &variants {
                println!(
                    "  id={} email={} username={} name={} credential={}",
                    v.id.as_ref().map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                    v.email.as_deref().unwrap_or("-"),
                    v.username.as_deref().unwrap_or("-"),
                    v.name.as_deref().unwrap_or("-"),
                    v.credential_column().unwrap_or("-"),
                );
            }
        }
        DebugAction::Schema { table } => {
            let table = table.as_deref().unwrap_or(diag.exercises_table());
            let schema = diag.inspect_schema(table);
            if schema.is_empty() {
                println!("{}: no rows (or unreadable)", table);
            } else {
                println!("{}:", table);
                for (column, value) in &schema {
                    println!("  {} = {}", column, value);
                }
            }
        }
        DebugAction::Check => print_check(&diag.check_exercise_table()),
        DebugAction::Ping => {
            if diag.test_connection() {
                println!("Connection OK");
            } else {
                println!("Connection failed");
            }
        }
    }
    Ok(())
}
