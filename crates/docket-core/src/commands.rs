use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::{debug, info, instrument};

use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime;
use crate::identity::{Identity, SessionFile};
use crate::render::Renderer;
use crate::session::Session;
use crate::store::RecordStore;
use crate::view::{self, SortOrder};

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "add", "list", "done", "undone", "delete", "login", "logout", "whoami", "help", "version",
        "_commands",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(session, session_file, cfg, renderer, inv))]
pub async fn dispatch<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    inv: Invocation,
) -> anyhow::Result<()> {
    let today = datetime::today();
    let command = inv.command.as_str();

    debug!(command, args = ?inv.command_args, "dispatching command");

    match command {
        "add" => cmd_add(session, session_file, &inv.command_args, today).await,
        "list" => cmd_list(session, session_file, cfg, renderer, &inv.command_args, today).await,
        "done" => cmd_set_completed(session, session_file, &inv.command_args, true).await,
        "undone" => cmd_set_completed(session, session_file, &inv.command_args, false).await,
        "delete" => cmd_delete(session, session_file, &inv.command_args).await,
        "login" => cmd_login(session, session_file, &inv.command_args).await,
        "logout" => cmd_logout(session, session_file).await,
        "whoami" => cmd_whoami(session_file, renderer),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "_commands" => {
            for command in known_command_names() {
                println!("{command}");
            }
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

async fn hydrate<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
) -> anyhow::Result<()> {
    let stored = session_file.load()?;
    session.set_identity(stored).await
}

#[instrument(skip(session, session_file, args, today))]
async fn cmd_add<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command add");
    hydrate(session, session_file).await?;

    let (text, date) = parse_text_and_due(args, today)?;
    let created = session.add(&text, date).await?;

    println!(
        "Created task {}.",
        created.id.unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

#[instrument(skip(session, session_file, cfg, renderer, args, today))]
async fn cmd_list<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    cfg: &Config,
    renderer: &mut Renderer,
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<()> {
    info!("command list");
    hydrate(session, session_file).await?;

    if session.identity().is_none() {
        renderer.print_identity(None)?;
        return Ok(());
    }

    let order = resolve_sort_order(cfg, args)?;
    let rows = view::sorted(session.tasks(), order);
    renderer.print_task_table(&rows, today)?;
    Ok(())
}

#[instrument(skip(session, session_file, args))]
async fn cmd_set_completed<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    args: &[String],
    completed: bool,
) -> anyhow::Result<()> {
    info!(completed, "command done/undone");
    hydrate(session, session_file).await?;

    let id = require_id_arg(args)?;
    session.set_completed(id, completed).await?;

    if completed {
        println!("Marked task {id} as done.");
    } else {
        println!("Marked task {id} as not done.");
    }
    Ok(())
}

#[instrument(skip(session, session_file, args))]
async fn cmd_delete<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command delete");
    hydrate(session, session_file).await?;

    let id = require_id_arg(args)?;
    session.delete(id).await?;

    println!("Deleted task {id}.");
    Ok(())
}

#[instrument(skip(session, session_file, args))]
async fn cmd_login<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command login");

    let Some((uid, name_parts)) = args.split_first() else {
        return Err(anyhow!("login requires a user id"));
    };
    if uid.trim().is_empty() {
        return Err(anyhow!("login requires a non-empty user id"));
    }

    let display_name = if name_parts.is_empty() {
        uid.clone()
    } else {
        name_parts.join(" ")
    };

    let identity = Identity {
        uid: uid.clone(),
        display_name,
    };
    session_file.save(&identity)?;
    session.set_identity(Some(identity.clone())).await?;

    println!(
        "Signed in as {} ({}); {} task(s) loaded.",
        identity.display_name,
        identity.uid,
        session.tasks().len()
    );
    Ok(())
}

#[instrument(skip(session, session_file))]
async fn cmd_logout<S: RecordStore>(
    session: &mut Session<S>,
    session_file: &SessionFile,
) -> anyhow::Result<()> {
    info!("command logout");

    session_file.clear()?;
    session.set_identity(None).await?;

    println!("Signed out.");
    Ok(())
}

#[instrument(skip(session_file, renderer))]
fn cmd_whoami(session_file: &SessionFile, renderer: &mut Renderer) -> anyhow::Result<()> {
    info!("command whoami");
    let stored = session_file.load()?;
    renderer.print_identity(stored.as_ref())
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "Implemented commands: add <text...> due:<date>, list [sort:added|date+|date-], done <id>, undone <id>, delete <id>, login <uid> [name...], logout, whoami, version"
    );
    Ok(())
}

fn require_id_arg(args: &[String]) -> anyhow::Result<&str> {
    match args {
        [id] => Ok(id.as_str()),
        [] => Err(anyhow!("a task id is required")),
        _ => Err(anyhow!("expected exactly one task id")),
    }
}

// `due:` carries the date; every other token is description text. An empty
// `due:` value means the date field was left blank, which the session
// rejects on its own path.
fn parse_text_and_due(
    args: &[String],
    today: NaiveDate,
) -> anyhow::Result<(String, Option<NaiveDate>)> {
    let mut text_parts = Vec::new();
    let mut date = None;

    for arg in args {
        if let Some(raw) = arg.strip_prefix("due:") {
            if raw.trim().is_empty() {
                continue;
            }
            date = Some(datetime::parse_due_date(raw, today)?);
            continue;
        }
        text_parts.push(arg.as_str());
    }

    Ok((text_parts.join(" "), date))
}

fn resolve_sort_order(cfg: &Config, args: &[String]) -> anyhow::Result<SortOrder> {
    let mut token = cfg.get("sort").unwrap_or_else(|| "added".to_string());
    for arg in args {
        if let Some(raw) = arg.strip_prefix("sort:") {
            token = raw.to_string();
        }
    }

    SortOrder::parse(&token).ok_or_else(|| anyhow!("unknown sort order: {token}"))
}
