use clap::{CommandFactory, Parser};
use smart_todo_cli::cli::{Cli, Command, collect_overrides};
use smart_todo_cli::render;
use smart_todo_core::config::{Config, load_config_with_fallback, merge_overrides};
use smart_todo_core::error::AppError;
use smart_todo_core::export::export_file_name;
use smart_todo_core::history::HistoryFilter;
use smart_todo_core::model::{Priority, TaskId, parse_due_date};
use smart_todo_core::storage::FileKeyValueStore;
use smart_todo_core::task_api::Session;
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const LOG_ENV_VAR: &str = "SMART_TODO_LOG";

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("smart_todo=debug,smart_todo_core=debug,warn")
    } else {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::validation(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(std::mem::take(&mut current));
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::validation("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn confirm(prompt: &str, assume_yes: bool) -> Result<bool, AppError> {
    if assume_yes {
        return Ok(true);
    }

    eprint!("{prompt} [y/N] ");
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}

fn print_cancelled(json: bool) {
    if json {
        println!("{}", serde_json::json!({ "cancelled": true }));
    } else {
        println!("Cancelled");
    }
}

fn open_session() -> Result<Session<FileKeyValueStore>, AppError> {
    let opened = Session::<FileKeyValueStore>::open_default()?;
    if let Some(err) = opened.load_error {
        eprintln!("WARNING: {err}; starting with an empty task list");
    }
    Ok(opened.session)
}

fn run_command(
    cli: Cli,
    base_config: &Config,
    session: &mut Session<FileKeyValueStore>,
) -> Result<(), AppError> {
    let overrides = collect_overrides(&cli.config_override)?;
    let config = merge_overrides(base_config, &overrides);
    debug!(command = ?cli.command, "running command");

    match cli.command {
        Command::Add {
            text,
            due,
            priority,
        } => {
            let text = match text {
                Some(value) if !value.trim().is_empty() => value,
                _ => return Err(AppError::validation("task text is required")),
            };
            let priority = match priority {
                Some(raw) => raw.parse::<Priority>()?,
                None => config.priority(),
            };
            let due_date = match due {
                Some(raw) => Some(parse_due_date(&raw)?),
                None if config.due_today_by_default => Some(session.today()),
                None => None,
            };

            let task = session.add(&text, due_date, priority)?;
            if cli.json {
                println!("{}", render::task_json(&task)?);
            } else {
                println!("Task added: {} ({})", task.text, task.id);
            }
        }
        Command::Done { id } => {
            let task = session.complete(id.parse::<TaskId>()?)?;
            if cli.json {
                println!("{}", render::task_json(&task)?);
            } else {
                println!("Task completed: {} ({})", task.text, task.id);
            }
        }
        Command::DoneAll => {
            let count = session.complete_all()?;
            if cli.json {
                println!("{}", serde_json::json!({ "completed": count }));
            } else if count == 0 {
                println!("No tasks to complete");
            } else {
                println!("All {count} tasks completed");
            }
        }
        Command::Edit { id, text } => {
            let task = session.edit(id.parse::<TaskId>()?, &text)?;
            if cli.json {
                println!("{}", render::task_json(&task)?);
            } else {
                println!("Task updated: {} ({})", task.text, task.id);
            }
        }
        Command::Delete { id, yes } => {
            let id = id.parse::<TaskId>()?;
            if session.store().find_active(id).is_none() {
                return Err(AppError::not_found(format!("task {id} is not active")));
            }
            if !confirm("Are you sure you want to delete this task?", yes)? {
                print_cancelled(cli.json);
                return Ok(());
            }

            let task = session.delete(id)?;
            if cli.json {
                println!("{}", render::task_json(&task)?);
            } else {
                println!("Task deleted: {} ({})", task.text, task.id);
            }
        }
        Command::Restore { id } => {
            let task = session.restore(id.parse::<TaskId>()?)?;
            if cli.json {
                println!("{}", render::task_json(&task)?);
            } else {
                println!("Task restored: {} ({})", task.text, task.id);
            }
        }
        Command::ClearHistory { yes } => {
            if session.store().history().is_empty() {
                if cli.json {
                    println!("{}", serde_json::json!({ "cleared": 0 }));
                } else {
                    println!("No history to clear");
                }
                return Ok(());
            }
            if !confirm(
                "Are you sure you want to clear all history? This action cannot be undone.",
                yes,
            )? {
                print_cancelled(cli.json);
                return Ok(());
            }

            let cleared = session.clear_history()?;
            if cli.json {
                println!("{}", serde_json::json!({ "cleared": cleared }));
            } else {
                println!("History cleared ({cleared} entries)");
            }
        }
        Command::List => {
            let active = session.store().active();
            if cli.json {
                println!("{}", render::tasks_json(active.iter())?);
            } else {
                println!("{}", render::active_table(active)?);
            }
        }
        Command::History { filter, limit } => {
            let filter = match filter {
                Some(raw) => raw.parse::<HistoryFilter>()?,
                None => HistoryFilter::All,
            };
            let limit = limit.unwrap_or_else(|| config.history_limit());
            let entries = session.history(filter).take(limit);
            if cli.json {
                println!("{}", render::tasks_json(entries)?);
            } else {
                println!(
                    "{}",
                    render::history_table(entries, filter, session.offset())?
                );
            }
        }
        Command::Stats => {
            let analytics = session.analytics();
            if cli.json {
                let json = serde_json::to_string(&analytics)
                    .map_err(|err| AppError::invalid_data(err.to_string()))?;
                println!("{json}");
            } else {
                println!("{}", render::stats_text(&analytics));
            }
        }
        Command::Export { output } => {
            let document = session.export_json()?;
            if cli.json && output.is_none() {
                println!("{document}");
            } else {
                let path = match output {
                    Some(path) => path,
                    None => PathBuf::from(export_file_name(session.today())?),
                };
                std::fs::write(&path, document)
                    .map_err(|err| AppError::io(format!("{}: {}", path.display(), err)))?;
                println!("Tasks exported to {}", path.display());
            }
        }
    }

    Ok(())
}

fn run_interactive(config: &Config) -> Result<(), AppError> {
    let mut session = open_session()?;
    let mut input = String::new();
    let stdin = io::stdin();

    loop {
        input.clear();
        // Not holding the stdin lock: confirmations read from it too.
        let bytes = stdin.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("smart_todo".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        // Logging is configured once at startup.
        if cli.verbose {
            eprintln!(
                "ERROR: {}",
                AppError::validation("--verbose is only available for one-shot commands")
            );
            continue;
        }

        if let Err(err) = run_command(cli, config, &mut session) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn load_config() -> Config {
    let loaded = load_config_with_fallback();
    if let Some(err) = loaded.error {
        eprintln!("WARNING: {err}; using default configuration");
    }
    loaded.config
}

fn main() {
    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        init_tracing(false);
        let config = load_config();
        if let Err(err) = run_interactive(&config) {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) =>
        {
            err.exit()
        }
        Err(err) => {
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    init_tracing(cli.verbose);
    let config = load_config();
    let result = open_session().and_then(|mut session| run_command(cli, &config, &mut session));
    if let Err(err) = result {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
