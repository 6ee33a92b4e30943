use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};
use familytree_core::config::{ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL, ENV_SOURCE_PATH};
use familytree_core::{AppConfig, ConfigError};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "familytree")]
#[command(bin_name = "familytree")]
#[command(version)]
#[command(about = "Browse and edit a family tree stored as JSON")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 's',
        long,
        env = ENV_SOURCE_PATH,
        help = "Source tree document. Defaults to the bundled sample."
    )]
    pub source: Option<String>,

    #[arg(
        short = 'd',
        long,
        env = ENV_DB_PATH,
        help = "Path to the SQLite snapshot store."
    )]
    pub db: Option<String>,

    #[arg(long, env = ENV_LOG_LEVEL, help = "trace|debug|info|warn|error")]
    pub log_level: Option<String>,

    #[arg(
        long,
        env = ENV_LOG_DIR,
        help = "Absolute directory for rolling log files. Logging is off when unset."
    )]
    pub log_dir: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolves flags (or their environment fallbacks) through the shared
    /// config defaults and validation.
    pub fn config(&self) -> Result<AppConfig, ConfigError> {
        AppConfig::from_lookup(|key| match key {
            ENV_SOURCE_PATH => self.source.clone(),
            ENV_DB_PATH => self.db.clone(),
            ENV_LOG_LEVEL => self.log_level.clone(),
            ENV_LOG_DIR => self.log_dir.clone(),
            _ => None,
        })
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "List branch tabs.")]
    Branches,
    #[command(about = "Render one branch as an outline, HTML or JSON.")]
    Render(RenderArgs),
    #[command(about = "List people, optionally filtered.")]
    People(PeopleArgs),
    #[command(about = "Show the details of one node.")]
    Show(ShowArgs),
    #[command(about = "Find a person's card by name.")]
    Find(FindArgs),
    #[command(about = "Add a placeholder child under a node.")]
    AddChild(AddChildArgs),
    #[command(about = "Add a spouse to a node.")]
    AddSpouse(AddSpouseArgs),
    #[command(about = "Edit label, notes or people of a node.")]
    Edit(EditArgs),
    #[command(about = "Delete a node and its descendants.", alias = "rm")]
    Delete(DeleteArgs),
    #[command(about = "Write the tree as indented JSON.")]
    Export(ExportArgs),
    #[command(about = "Replace the tree with a JSON document.")]
    Import(ImportArgs),
    #[command(about = "Discard local edits and reload the source document.")]
    Reset,
    #[command(about = "Resolve an in-page link to its target node.")]
    Follow(FollowArgs),
}

#[derive(Debug, Args)]
pub struct RenderArgs {
    #[arg(short = 'b', long, help = "Branch id. Defaults to the first branch.")]
    pub branch: Option<String>,

    #[arg(short = 'q', long, help = "Highlight names containing this text.")]
    pub query: Option<String>,

    #[arg(short = 'a', long, help = "Expand every node.")]
    pub all: bool,

    #[arg(long, conflicts_with = "json", help = "Render HTML markup.")]
    pub html: bool,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct PeopleArgs {
    #[arg(short = 'q', long, help = "Case-insensitive name or notes filter.")]
    pub query: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[arg(help = "Node id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct FindArgs {
    #[arg(help = "Person name as listed on a node.")]
    pub name: String,

    #[arg(short = 'q', long, help = "Active people filter, if any.")]
    pub query: Option<String>,
}

#[derive(Debug, Args)]
pub struct AddChildArgs {
    #[arg(help = "Parent node id.")]
    pub parent: String,
}

#[derive(Debug, Args)]
pub struct AddSpouseArgs {
    #[arg(help = "Node id.")]
    pub id: String,

    #[arg(help = "Spouse name.")]
    pub name: String,
}

#[derive(Debug, Args)]
pub struct EditArgs {
    #[arg(help = "Node id.")]
    pub id: String,

    #[arg(short = 'l', long, help = "New label. Empty falls back to people.")]
    pub label: Option<String>,

    #[arg(short = 'n', long, help = "New notes. Empty clears them.")]
    pub notes: Option<String>,

    #[arg(short = 'p', long, help = "Comma-separated people.")]
    pub people: Option<String>,
}

#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[arg(help = "Node id.")]
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[arg(short = 'o', long, help = "Output file. Prints to stdout when omitted.")]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ImportArgs {
    #[arg(help = "JSON document to import.")]
    pub path: PathBuf,
}

#[derive(Debug, Args)]
pub struct FollowArgs {
    #[arg(help = "Link such as `#doyle-root`.")]
    pub href: String,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Commands};
    use clap::Parser;

    #[test]
    fn flags_feed_shared_config() {
        let cli = Cli::try_parse_from([
            "familytree",
            "--db",
            "/tmp/tree.sqlite3",
            "--log-level",
            "WARNING",
            "branches",
        ])
        .expect("parse");
        let config = cli.config().expect("config");
        assert_eq!(config.db_path, std::path::PathBuf::from("/tmp/tree.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert!(matches!(cli.command, Commands::Branches));
    }

    #[test]
    fn edit_fields_are_optional() {
        let cli = Cli::try_parse_from(["familytree", "edit", "n2", "--notes", ""]).expect("parse");
        match cli.command {
            Commands::Edit(args) => {
                assert_eq!(args.id, "n2");
                assert_eq!(args.notes.as_deref(), Some(""));
                assert!(args.label.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn html_and_json_conflict() {
        assert!(Cli::try_parse_from(["familytree", "render", "--html", "--json"]).is_err());
    }
}
