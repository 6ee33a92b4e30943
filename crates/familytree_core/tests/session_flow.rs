use std::cell::Cell;
use std::rc::Rc;

use familytree_core::{
    EditForm, MemorySnapshotRepository, Mode, Mutation, NoticeLevel, Panel, Session,
    SnapshotRepoError, SnapshotRepository, SAMPLE_DOCUMENT,
};

const DOC: &str = r##"{"branches":[
    {"id":"paternal","title":"Paternal","root":{"id":"n1","people":["Alice"],"anchor":"hale",
        "children":[{"id":"n2","people":["Bob"],"spouses":[{"name":"Alicia"}],"link":"#doyle",
            "children":[{"id":"n3","people":["Cy"]}]}]}},
    {"id":"maternal","title":"Maternal","root":{"id":"m1","people":["Eve"],
        "children":[{"id":"m2","people":["Flo"],"anchor":"doyle",
            "children":[{"id":"m3","people":["Gus"]}]}]}}]}"##;

fn session() -> Session<MemorySnapshotRepository> {
    let mut session = Session::new(MemorySnapshotRepository::new());
    session.load(|| Ok(DOC.to_string())).expect("load");
    session
}

#[test]
fn load_renders_first_branch_with_tabs() {
    let session = session();
    let view = session.view().expect("active view");
    assert_eq!(view.branch_id, "paternal");
    assert!(view.root.open);
    assert!(!view.find_node("n2").unwrap().open);

    let tabs = session.tabs();
    assert_eq!(tabs.len(), 2);
    assert!(tabs[0].active);
    assert!(!tabs[1].active);
    assert_eq!(session.mode(), Mode::View);
    assert_eq!(session.panel(), &Panel::Empty);
}

#[test]
fn toggling_mode_swaps_panel_without_touching_data() {
    let mut session = session();
    let before = session.tree().clone();
    assert!(session.click_person("n2"));
    assert!(matches!(session.panel(), Panel::Card(card) if card.title == "Bob"));

    assert_eq!(session.toggle_mode(), Mode::Edit);
    match session.panel() {
        Panel::Edit(form) => {
            assert_eq!(form.node_id, "n2");
            assert_eq!(form.people, "Bob");
            assert_eq!(form.label, "");
        }
        other => panic!("expected edit form, got {other:?}"),
    }

    assert_eq!(session.toggle_mode(), Mode::View);
    assert!(matches!(session.panel(), Panel::Card(_)));
    assert_eq!(session.tree(), &before);
}

#[test]
fn stale_click_leaves_panel_unchanged() {
    let mut session = session();
    assert!(!session.click_person("ghost"));
    assert_eq!(session.panel(), &Panel::Empty);
}

#[test]
fn query_highlights_people_and_spouses_case_insensitively() {
    let mut session = session();
    session.toggle_node("n2");

    let count = session.set_query("  ALI ");
    assert_eq!(count, 2);
    let view = session.view().unwrap();
    let highlighted: Vec<_> = view
        .tokens()
        .into_iter()
        .filter(|token| token.highlighted)
        .map(|token| token.name.clone())
        .collect();
    assert_eq!(highlighted, vec!["Alice", "Alicia"]);

    session.clear_query();
    assert_eq!(session.view().unwrap().highlighted_count(), 0);
}

#[test]
fn highlights_survive_rerender_after_mutation() {
    let mut session = session();
    session.set_query("bob");
    session.add_spouse("n1", Some("Bobbie")).unwrap();
    assert_eq!(session.view().unwrap().highlighted_count(), 2);
}

#[test]
fn cancelled_spouse_prompt_is_noop() {
    let mut session = session();
    assert_eq!(session.add_spouse("n2", None).unwrap(), Mutation::NoOp);
    assert_eq!(session.tree().find_by_id("n2").unwrap().spouses.len(), 1);
}

#[test]
fn follow_link_switches_tab_and_expands_ancestors() {
    let mut session = session();
    let target = session.follow_link("#doyle").expect("anchor resolves");
    assert_eq!(target.branch_id, "maternal");
    assert_eq!(target.node_id, "m2");

    let view = session.view().unwrap();
    assert_eq!(view.branch_id, "maternal");
    assert!(view.root.open);
    assert!(view.find_node("m2").unwrap().open);
    assert!(session.tabs()[1].active);

    assert!(session.follow_link("#nowhere").is_none());
    assert_eq!(session.view().unwrap().branch_id, "maternal");
}

#[test]
fn add_child_in_edit_mode_opens_form_for_child() {
    let mut session = session();
    session.toggle_mode();

    let child = session.add_child("n2").unwrap().applied().unwrap();
    assert!(session.view().unwrap().find_node("n2").unwrap().open);
    match session.panel() {
        Panel::Edit(form) => {
            assert_eq!(form.node_id, child);
            assert_eq!(form.people, "New Person");
        }
        other => panic!("expected edit form, got {other:?}"),
    }
}

#[test]
fn submitting_form_updates_view_and_panel() {
    let mut session = session();
    session.toggle_mode();
    session.click_person("n3");

    let form = EditForm {
        node_id: "n3".to_string(),
        label: String::new(),
        notes: "b. 1970".to_string(),
        people: "Cy, Cyril".to_string(),
    };
    assert!(session.submit_edit(&form).unwrap().is_applied());

    match session.panel() {
        Panel::Edit(updated) => assert_eq!(updated.people, "Cy, Cyril"),
        other => panic!("expected edit form, got {other:?}"),
    }
    let node = session.tree().find_by_id("n3").unwrap();
    assert_eq!(node.notes.as_deref(), Some("b. 1970"));
}

#[test]
fn deleting_selected_node_closes_panel() {
    let mut session = session();
    session.click_person("n3");
    let outcome = session.delete_node("n2").unwrap();
    assert_eq!(outcome.removed, 1);
    assert_eq!(session.panel(), &Panel::Empty);
    assert!(session.view().unwrap().find_node("n3").is_none());
    assert!(session.take_notices().is_empty());
}

#[test]
fn deleting_root_queues_warning() {
    let mut session = session();
    let outcome = session.delete_node("n1").unwrap();
    assert!(outcome.rejected_root);

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Warning);
    assert!(session.take_notices().is_empty());
    assert!(session.tree().find_by_id("n1").is_some());
}

/// Memory store whose writes can be switched off after loading.
#[derive(Default)]
struct LockableRepo {
    inner: MemorySnapshotRepository,
    locked: Rc<Cell<bool>>,
}

impl SnapshotRepository for LockableRepo {
    fn get(&self, key: &str) -> Result<Option<String>, SnapshotRepoError> {
        self.inner.get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), SnapshotRepoError> {
        if self.locked.get() {
            return Err(SnapshotRepoError::Unavailable("store locked".to_string()));
        }
        self.inner.put(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), SnapshotRepoError> {
        self.inner.remove(key)
    }
}

#[test]
fn root_warning_survives_failed_write() {
    // `r1` is a branch root and also a nested node.
    let doc = r#"{"branches":[{"id":"b","title":"B","root":{"id":"r1","people":["Ann"],
        "children":[{"id":"c1","people":["Ben"],"children":[{"id":"r1","people":["Twin"]}]}]}}]}"#;
    let repo = LockableRepo::default();
    let locked = Rc::clone(&repo.locked);
    let mut session = Session::new(repo);
    session.load(|| Ok(doc.to_string())).unwrap();
    locked.set(true);

    assert!(session.delete_node("r1").is_err());
    let levels: Vec<_> = session
        .take_notices()
        .into_iter()
        .map(|notice| notice.level)
        .collect();
    assert_eq!(levels, vec![NoticeLevel::Warning, NoticeLevel::Error]);
    assert_eq!(session.tree().find_by_id("c1").unwrap().children[0].id, "r1");
}

#[test]
fn failed_import_reports_error_notice() {
    let mut session = session();
    session.select_branch("maternal");
    let before = session.tree().clone();

    assert!(session.import_json("[1, 2").is_err());
    assert_eq!(session.tree(), &before);
    assert_eq!(session.view().unwrap().branch_id, "maternal");

    let notices = session.take_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].level, NoticeLevel::Error);
    assert!(notices[0].message.starts_with("Import failed"));
}

#[test]
fn import_replaces_tree_and_resets_tab() {
    let mut session = session();
    session.select_branch("maternal");

    let summary = session.import_json(SAMPLE_DOCUMENT).unwrap();
    assert!(summary.branches >= 2);
    assert!(session.tabs()[0].active);
    assert!(session.tree().find_by_id("m1").is_none());
    assert_eq!(session.take_notices()[0].level, NoticeLevel::Info);
}

#[test]
fn select_unknown_branch_is_ignored() {
    let mut session = session();
    assert!(!session.select_branch("nope"));
    assert_eq!(session.view().unwrap().branch_id, "paternal");
}

#[test]
fn show_card_by_name_prefers_person_entries() {
    let mut session = session();
    assert!(session.show_card("Flo"));
    assert!(matches!(session.panel(), Panel::Card(card) if card.node_id == "m2"));
    assert!(!session.show_card("Nobody"));
}
