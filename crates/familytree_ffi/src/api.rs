//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose stable, use-case-level tree functions to Dart via FRB.
//! - Keep error semantics simple: every call returns an envelope.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Each call loads the latest snapshot, applies one operation and persists
//!   before returning; calls are serialized by one process-wide lock.
//! - Returned JSON strings use the core serialization shapes unchanged.

use familytree_core::db::open_db;
use familytree_core::render::html::to_html;
use familytree_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, AppConfig,
    EditForm, Mutation, PersonDirectory, Session, SqliteSnapshotRepository,
};
use log::warn;
use std::path::Path;
use std::sync::{Mutex, OnceLock};

static FFI_CONFIG: OnceLock<Result<AppConfig, String>> = OnceLock::new();
static SESSION_LOCK: Mutex<()> = Mutex::new(());

type FfiSession<'conn> = Session<SqliteSnapshotRepository<'conn>>;

/// Expose core crate version through FFI.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir` (idempotent).
/// - Reconfiguration attempts with different level or directory return error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    if log_dir.trim().is_empty() {
        return "log_dir must not be empty".to_string();
    }
    match init_logging_inner(level.as_str(), Path::new(log_dir.trim())) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Generic action response envelope for tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeActionResponse {
    /// Whether operation succeeded. A no-op still counts as success.
    pub ok: bool,
    /// Node the operation created or targeted, when one resolved.
    pub node_id: Option<String>,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl TreeActionResponse {
    fn success(message: impl Into<String>, node_id: Option<String>) -> Self {
        Self {
            ok: true,
            node_id,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            node_id: None,
            message: message.into(),
        }
    }
}

/// Payload envelope for read calls returning a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreePayloadResponse {
    pub ok: bool,
    /// JSON (or HTML) payload; empty on failure.
    pub payload: String,
    /// Number of highlighted name tokens, for render calls.
    pub highlighted: u32,
    pub message: String,
}

impl TreePayloadResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            payload: String::new(),
            highlighted: 0,
            message: message.into(),
        }
    }
}

/// Branch tab descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeTab {
    pub branch_id: String,
    pub label: String,
}

/// People directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonItem {
    pub name: String,
    /// Stable element id (`card-<slug>`).
    pub card_id: String,
    pub branch_title: String,
    pub node_id: String,
}

/// Lists branch tabs in document order.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics; returns an empty list when the tree cannot be loaded.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_tabs() -> Vec<TreeTab> {
    with_session(|session| {
        Ok(session
            .tabs()
            .into_iter()
            .map(|tab| TreeTab {
                branch_id: tab.branch_id,
                label: tab.label,
            })
            .collect())
    })
    .unwrap_or_else(|err| {
        warn!("event=ffi_call module=ffi status=error call=tree_tabs error={err}");
        Vec::new()
    })
}

/// Renders one branch as a JSON view tree with the query highlighted.
///
/// Input semantics:
/// - `branch_id`: `None` renders the first branch.
/// - `query`: case-insensitive substring; blank clears highlights.
/// - `as_html`: return escaped HTML markup instead of JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_render(
    branch_id: Option<String>,
    query: Option<String>,
    as_html: bool,
) -> TreePayloadResponse {
    let result = with_session(|session| {
        if let Some(branch_id) = branch_id.as_deref() {
            if !session.select_branch(branch_id) {
                return Err(format!("unknown branch `{branch_id}`"));
            }
        }
        let highlighted = session.set_query(query.as_deref().unwrap_or_default());
        let view = session.view().ok_or("tree has no branches")?;
        let payload = if as_html {
            to_html(view)
        } else {
            serde_json::to_string(view).map_err(|err| err.to_string())?
        };
        Ok((payload, highlighted))
    });

    match result {
        Ok((payload, highlighted)) => TreePayloadResponse {
            ok: true,
            payload,
            highlighted: u32::try_from(highlighted).unwrap_or(u32::MAX),
            message: format!("{highlighted} match(es)."),
        },
        Err(err) => TreePayloadResponse::failure(format!("tree_render failed: {err}")),
    }
}

/// Appends a placeholder child under `parent_id`.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_add_child(parent_id: String) -> TreeActionResponse {
    match with_session(|session| session.add_child(&parent_id).map_err(|err| err.to_string())) {
        Ok(Mutation::Applied(child_id)) => {
            TreeActionResponse::success("Child added.", Some(child_id))
        }
        Ok(Mutation::NoOp) => TreeActionResponse::success("Node not found.", None),
        Err(err) => TreeActionResponse::failure(format!("tree_add_child failed: {err}")),
    }
}

/// Appends a spouse to `node_id`. Blank names are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_add_spouse(node_id: String, name: String) -> TreeActionResponse {
    let result = with_session(|session| {
        session
            .add_spouse(&node_id, Some(&name))
            .map_err(|err| err.to_string())
    });
    action_response("tree_add_spouse", "Spouse added.", &node_id, result)
}

/// Replaces label, notes and people of `node_id`.
///
/// `people` is comma-separated free text.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_edit_node(
    node_id: String,
    label: String,
    notes: String,
    people: String,
) -> TreeActionResponse {
    let form = EditForm {
        node_id: node_id.clone(),
        label,
        notes,
        people,
    };
    let result =
        with_session(|session| session.submit_edit(&form).map_err(|err| err.to_string()));
    action_response("tree_edit_node", "Node updated.", &node_id, result)
}

/// Deletes every non-root node with `node_id` together with its subtree.
///
/// # FFI contract
/// - Branch roots are kept; the response is `ok = false` with a warning.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_delete_node(node_id: String) -> TreeActionResponse {
    match with_session(|session| session.delete_node(&node_id).map_err(|err| err.to_string())) {
        Ok(outcome) if outcome.rejected_root => {
            let mut message = familytree_core::session::ROOT_DELETE_WARNING.to_string();
            // Nested nodes sharing the root's id are still removed.
            if outcome.removed > 0 {
                message.push_str(&format!(
                    " Removed {} other node(s) with this id.",
                    outcome.removed
                ));
            }
            TreeActionResponse {
                ok: false,
                node_id: Some(node_id),
                message,
            }
        }
        Ok(outcome) if outcome.removed == 0 => {
            TreeActionResponse::success("Node not found.", None)
        }
        Ok(_) => TreeActionResponse::success("Node deleted.", Some(node_id)),
        Err(err) => TreeActionResponse::failure(format!("tree_delete_node failed: {err}")),
    }
}

/// Returns the whole tree as indented JSON.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_export() -> TreePayloadResponse {
    match with_session(|session| session.export_json().map_err(|err| err.to_string())) {
        Ok(payload) => TreePayloadResponse {
            ok: true,
            payload,
            highlighted: 0,
            message: "Tree exported.".to_string(),
        },
        Err(err) => TreePayloadResponse::failure(format!("tree_export failed: {err}")),
    }
}

/// Replaces the tree with an imported JSON document.
///
/// Malformed input leaves the stored tree untouched.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_import(json: String) -> TreeActionResponse {
    match with_session(|session| session.import_json(&json).map_err(|err| err.to_string())) {
        Ok(summary) => TreeActionResponse::success(
            format!(
                "Imported {} branch(es) with {} node(s).",
                summary.branches, summary.nodes
            ),
            None,
        ),
        Err(err) => TreeActionResponse::failure(format!("tree_import failed: {err}")),
    }
}

/// Discards the stored snapshot and reloads the source document.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_reset() -> TreeActionResponse {
    let result = with_session(|session| {
        let config = resolve_config()?;
        session
            .reset(|| config.read_source())
            .map_err(|err| err.to_string())
    });
    match result {
        Ok(summary) => TreeActionResponse::success(
            format!("Tree reset to {} node(s).", summary.nodes),
            None,
        ),
        Err(err) => TreeActionResponse::failure(format!("tree_reset failed: {err}")),
    }
}

/// Resolves an in-page link to the node carrying its anchor.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_follow_link(href: String) -> TreeActionResponse {
    match with_session(|session| Ok(session.follow_link(&href))) {
        Ok(Some(target)) => TreeActionResponse::success(target.branch_id, Some(target.node_id)),
        Ok(None) => TreeActionResponse::failure(format!("no anchor for `{href}`")),
        Err(err) => TreeActionResponse::failure(format!("tree_follow_link failed: {err}")),
    }
}

/// Lists people cards whose name or notes match `query`.
#[flutter_rust_bridge::frb(sync)]
pub fn tree_people(query: String) -> Vec<PersonItem> {
    with_session(|session| {
        let directory = PersonDirectory::build(session.tree());
        Ok(directory
            .filter(&query)
            .into_iter()
            .map(|card| PersonItem {
                name: card.name.clone(),
                card_id: card.card_id.clone(),
                branch_title: card.branch_title.clone(),
                node_id: card.node_id.clone(),
            })
            .collect())
    })
    .unwrap_or_else(|err| {
        warn!("event=ffi_call module=ffi status=error call=tree_people error={err}");
        Vec::new()
    })
}

fn action_response(
    call: &str,
    applied: &str,
    node_id: &str,
    result: Result<Mutation, String>,
) -> TreeActionResponse {
    match result {
        Ok(Mutation::Applied(())) => {
            TreeActionResponse::success(applied, Some(node_id.to_string()))
        }
        Ok(Mutation::NoOp) => TreeActionResponse::success("Nothing changed.", None),
        Err(err) => TreeActionResponse::failure(format!("{call} failed: {err}")),
    }
}

fn resolve_config() -> Result<AppConfig, String> {
    FFI_CONFIG
        .get_or_init(|| {
            #[cfg(test)]
            let config = AppConfig::from_lookup(|_| None).map(|mut config| {
                config.db_path = std::env::temp_dir().join(format!(
                    "familytree_ffi_test_{}.sqlite3",
                    std::process::id()
                ));
                config
            });
            #[cfg(not(test))]
            let config = AppConfig::from_env();
            config.map_err(|err| err.to_string())
        })
        .clone()
}

fn with_session<T>(f: impl FnOnce(&mut FfiSession<'_>) -> Result<T, String>) -> Result<T, String> {
    let _guard = SESSION_LOCK
        .lock()
        .map_err(|_| "session lock poisoned".to_string())?;
    let config = resolve_config()?;
    let conn = open_db(&config.db_path).map_err(|err| format!("tree DB open failed: {err}"))?;
    let repo = SqliteSnapshotRepository::try_new(&conn)
        .map_err(|err| format!("tree repo init failed: {err}"))?;
    let mut session = Session::new(repo);
    session
        .load(|| config.read_source())
        .map_err(|err| format!("tree load failed: {err}"))?;
    f(&mut session)
}
