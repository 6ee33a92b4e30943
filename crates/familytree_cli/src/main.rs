//! Terminal host for the family tree core.
//!
//! # Responsibility
//! - Map each subcommand onto one session operation.
//! - Print notices to stderr and payloads to stdout.

mod cli;

use cli::Commands;
use familytree_core::db::open_db;
use familytree_core::render::html::to_html;
use familytree_core::render::text::to_outline;
use familytree_core::{
    init_logging, AppConfig, EditForm, Mutation, NoticeLevel, Panel, PersonDirectory, Session,
    SnapshotRepository, SqliteSnapshotRepository,
};
use log::info;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|err| err.to_string())?;
    println!("{json}");
    Ok(())
}

fn run() -> Result<(), String> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    let config = cli.config().map_err(|err| err.to_string())?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(config.log_level, log_dir)?;
    }

    let conn = open_db(&config.db_path).map_err(|err| err.to_string())?;
    let repo = SqliteSnapshotRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let mut session = Session::new(repo);
    session
        .load(|| config.read_source())
        .map_err(|err| err.to_string())?;
    info!(
        "event=cli_command module=cli status=start db={}",
        config.db_path.display()
    );

    let result = execute(&mut session, cli.command, &config);
    finish(&mut session, result)
}

/// Runs one subcommand against a loaded session.
///
/// Errors may return early; [`finish`] still drains the notices they queued.
fn execute<R: SnapshotRepository>(
    session: &mut Session<R>,
    command: Commands,
    config: &AppConfig,
) -> Result<(), String> {
    match command {
        Commands::Branches => {
            for tab in session.tabs() {
                println!("{}\t{}", tab.branch_id, tab.label);
            }
            Ok(())
        }
        Commands::Render(args) => {
            if let Some(branch) = args.branch.as_deref() {
                if !session.select_branch(branch) {
                    return Err(format!("unknown branch `{branch}`"));
                }
            }
            if args.all {
                session.set_all_open(true);
            }
            session.set_query(args.query.as_deref().unwrap_or_default());
            let view = session.view().ok_or("tree has no branches")?;
            if args.json {
                print_json(view)
            } else if args.html {
                println!("{}", to_html(view));
                Ok(())
            } else {
                print!("{}", to_outline(view));
                Ok(())
            }
        }
        Commands::People(args) => {
            let directory = PersonDirectory::build(session.tree());
            let cards = directory.filter(args.query.as_deref().unwrap_or_default());
            if args.json {
                print_json(&cards)
            } else {
                for card in cards {
                    println!("{}\t{}\t{}", card.node_id, card.name, card.branch_title);
                }
                Ok(())
            }
        }
        Commands::Show(args) => {
            if !session.show_card_by_node_id(&args.id) {
                return Err(format!("node `{}` not found", args.id));
            }
            print_panel(session.panel());
            Ok(())
        }
        Commands::Find(args) => {
            let directory = PersonDirectory::build(session.tree());
            let current = args.query.as_deref().unwrap_or_default();
            let located = directory
                .locate(&args.name, current)
                .ok_or_else(|| format!("no card for `{}`", args.name))?;
            if let Some(requery) = &located.requery {
                eprintln!("note: filter switched to `{requery}`");
            }
            print_json(located.card)
        }
        Commands::AddChild(args) => match session.add_child(&args.parent) {
            Ok(Mutation::Applied(child_id)) => {
                println!("{child_id}");
                Ok(())
            }
            Ok(Mutation::NoOp) => Err(format!("node `{}` not found", args.parent)),
            Err(err) => Err(err.to_string()),
        },
        Commands::AddSpouse(args) => session
            .add_spouse(&args.id, Some(&args.name))
            .map_err(|err| err.to_string())
            .and_then(|outcome| report_mutation(outcome, &args.id)),
        Commands::Edit(args) => {
            session.toggle_mode();
            if !session.show_card_by_node_id(&args.id) {
                return Err(format!("node `{}` not found", args.id));
            }
            let Panel::Edit(current) = session.panel().clone() else {
                return Err("edit form unavailable".to_string());
            };
            let form = EditForm {
                label: args.label.unwrap_or(current.label),
                notes: args.notes.unwrap_or(current.notes),
                people: args.people.unwrap_or(current.people),
                ..current
            };
            session
                .submit_edit(&form)
                .map_err(|err| err.to_string())
                .and_then(|outcome| report_mutation(outcome, &args.id))
        }
        Commands::Delete(args) => {
            let outcome = session
                .delete_node(&args.id)
                .map_err(|err| err.to_string())?;
            if outcome.removed > 0 {
                println!("deleted {} subtree(s) for {}", outcome.removed, args.id);
            } else if !outcome.rejected_root {
                println!("nothing changed");
            }
            Ok(())
        }
        Commands::Export(args) => {
            let json = session.export_json().map_err(|err| err.to_string())?;
            match args.out {
                Some(path) => std::fs::write(&path, json)
                    .map_err(|err| format!("failed to write `{}`: {err}", path.display())),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }
        Commands::Import(args) => {
            let text = std::fs::read_to_string(&args.path)
                .map_err(|err| format!("failed to read `{}`: {err}", args.path.display()))?;
            // Failure is reported through the notice queue below.
            let _ = session.import_json(&text);
            Ok(())
        }
        Commands::Reset => {
            let summary = session
                .reset(|| config.read_source())
                .map_err(|err| err.to_string())?;
            println!(
                "reset to {} branch(es) with {} node(s)",
                summary.branches, summary.nodes
            );
            Ok(())
        }
        Commands::Follow(args) => {
            let target = session
                .follow_link(&args.href)
                .ok_or_else(|| format!("no anchor for `{}`", args.href))?;
            println!("{}\t{}", target.branch_id, target.node_id);
            Ok(())
        }
    }
}

/// Prints queued notices, then reports the command error or an error notice.
fn finish<R: SnapshotRepository>(
    session: &mut Session<R>,
    result: Result<(), String>,
) -> Result<(), String> {
    let failed = flush_notices(session);
    result?;
    if failed {
        return Err("command failed".to_string());
    }
    Ok(())
}

fn report_mutation(outcome: Mutation, node_id: &str) -> Result<(), String> {
    match outcome {
        Mutation::Applied(()) => {
            println!("updated {node_id}");
            Ok(())
        }
        Mutation::NoOp => {
            println!("nothing changed");
            Ok(())
        }
    }
}

fn print_panel(panel: &Panel) {
    match panel {
        Panel::Card(card) => {
            println!("{} ({})", card.title, card.node_id);
            println!("people: {}", card.people.join(", "));
            for spouse in &card.spouses {
                match &spouse.notes {
                    Some(notes) => println!("spouse: {} ({notes})", spouse.name),
                    None => println!("spouse: {}", spouse.name),
                }
            }
            if let Some(notes) = &card.notes {
                println!("notes: {notes}");
            }
            if !card.children.is_empty() {
                println!("children: {}", card.children.join(", "));
            }
            if let Some(link) = &card.link {
                println!("link: {link}");
            }
        }
        Panel::Edit(form) => println!("{form:?}"),
        Panel::Empty => {}
    }
}

/// Prints queued notices; returns whether any of them was an error.
fn flush_notices<R: SnapshotRepository>(session: &mut Session<R>) -> bool {
    let mut failed = false;
    for notice in session.take_notices() {
        let tag = match notice.level {
            NoticeLevel::Info => "info",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => {
                failed = true;
                "error"
            }
        };
        eprintln!("{tag}: {}", notice.message);
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::{execute, finish};
    use crate::cli::{Commands, RenderArgs, ShowArgs};
    use familytree_core::{AppConfig, MemorySnapshotRepository, Session, SAMPLE_DOCUMENT};

    fn session() -> Session<MemorySnapshotRepository> {
        let mut session = Session::new(MemorySnapshotRepository::new());
        session.load(|| Ok(SAMPLE_DOCUMENT.to_string())).expect("load");
        session
    }

    fn config() -> AppConfig {
        AppConfig::from_lookup(|_| None).expect("default config")
    }

    #[test]
    fn early_command_error_still_drains_notices() {
        let mut session = session();
        assert!(session.import_json("{ nope").is_err());

        let render = Commands::Render(RenderArgs {
            branch: Some("nowhere".to_string()),
            query: None,
            all: false,
            html: false,
            json: false,
        });
        let result = execute(&mut session, render, &config());
        let err = finish(&mut session, result).unwrap_err();
        assert_eq!(err, "unknown branch `nowhere`");
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn error_notice_fails_an_otherwise_successful_command() {
        let mut session = session();
        assert!(session.import_json("[1, 2").is_err());

        let show = Commands::Show(ShowArgs {
            id: "n1".to_string(),
        });
        let result = execute(&mut session, show, &config());
        assert!(result.is_ok());
        assert_eq!(finish(&mut session, result).unwrap_err(), "command failed");
    }
}
