use std::fs;
use std::time::Instant;

use gridq::controller::{Command, Controller};
use gridq::{
    ColumnDescriptor, GridConfig, GridEvent, GridModel, JsonFilePreferenceStore,
    MemoryPreferenceStore, PreferenceStore, QueryRequest,
};
use serde_json::json;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_columns() -> Vec<ColumnDescriptor> {
    let content = fs::read_to_string(format!("{FIXTURES}/columns.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

// Replays scripts on a virtual clock so `wait` lines are instant
struct Script {
    controller: Controller,
    now: Instant,
}

impl Script {
    fn new() -> Self {
        Script {
            controller: Controller::new(),
            now: Instant::now(),
        }
    }

    fn run<P: PreferenceStore>(&mut self, model: &mut GridModel<Vec<GridEvent>, P>, text: &str) {
        for line in text.lines() {
            match self.controller.handle_line(line).unwrap() {
                Some(Command::Update(message)) => model.update_at(message, self.now).unwrap(),
                Some(Command::Wait(duration)) => {
                    self.now += duration;
                    model.tick(self.now);
                }
                None => {}
            }
        }
    }
}

fn queries<P: PreferenceStore>(model: &GridModel<Vec<GridEvent>, P>) -> Vec<&QueryRequest> {
    model
        .sink()
        .iter()
        .filter_map(|e| match e {
            GridEvent::Query(q) => Some(q),
            _ => None,
        })
        .collect()
}

fn model_with<P: PreferenceStore>(store: P) -> GridModel<Vec<GridEvent>, P> {
    let config = GridConfig::default().preference_key("contacts");
    GridModel::init(&config, fixture_columns(), store, Vec::new()).unwrap()
}

#[test]
fn fixture_session_emits_expected_requests() {
    let mut model = model_with(MemoryPreferenceStore::default());
    let script = fs::read_to_string(format!("{FIXTURES}/session.grid")).unwrap();
    Script::new().run(&mut model, &script);

    let queries = queries(&model);
    assert_eq!(queries.len(), 5);
    assert_eq!(queries[0].skip, 20);

    let filtered = serde_json::to_value(queries[1]).unwrap();
    assert_eq!(
        filtered,
        json!({
            "where": {
                "age": { "gte": 30 },
                "organization": { "name": { "contains": "acme", "mode": "insensitive" } },
                "status": { "in": ["active"] }
            },
            "orderBy": {},
            "skip": 0,
            "take": 10
        })
    );

    assert_eq!(serde_json::to_value(queries[2]).unwrap()["orderBy"], json!({ "name": "asc" }));
    assert_eq!(serde_json::to_value(queries[3]).unwrap()["orderBy"], json!({ "name": "desc" }));
    assert_eq!(queries[4].skip, 10);
    assert_eq!(queries[4].filter, queries[1].filter);

    let keys: Vec<&str> = model.columns().iter().map(|c| c.key.as_str()).collect();
    assert_eq!(
        keys,
        ["status", "name", "age", "createdAt", "organization.name", "notes"]
    );
    let visible: Vec<&str> = model
        .registry()
        .visible_columns()
        .map(|c| c.key.as_str())
        .collect();
    assert_eq!(visible, ["status", "name", "age", "createdAt"]);
    assert_eq!(model.registry().store().history().len(), 1);
}

#[test]
fn search_is_debounced_on_the_script_clock() {
    let mut model = model_with(MemoryPreferenceStore::default());
    let mut script = Script::new();
    script.run(
        &mut model,
        "loaded 50\npage 2\nsearch a\nwait 100\nsearch ab\nwait 100\nsearch abc \nwait 299\n",
    );
    // Page change only, the search window is still open
    assert_eq!(model.sink().len(), 1);
    assert!(model.has_pending_search());

    script.run(&mut model, "wait 1\n");
    let events = model.sink();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[1],
        GridEvent::Search {
            search_string: Some("abc".into())
        }
    );
    let GridEvent::Query(request) = &events[2] else {
        panic!("expected a query after the search");
    };
    assert_eq!(request.search_string.as_deref(), Some("abc"));
    assert_eq!(request.skip, 0);
}

#[test]
fn rejected_filters_do_not_block_apply() {
    let mut model = model_with(MemoryPreferenceStore::default());
    Script::new().run(
        &mut model,
        "filter age gt lots\nfilter createdAt lt 2024-01-31\nfilter notes contains x\napply\n",
    );
    assert_eq!(model.rejected().len(), 2);
    assert_eq!(
        queries(&model)[0].filter.to_value(),
        json!({ "createdAt": { "lt": "2024-01-31" } })
    );
}

#[test]
fn saved_layout_survives_a_new_session() {
    let dir = tempfile::tempdir().unwrap();
    let dir_path = dir.path().to_str().unwrap();

    let mut first = model_with(JsonFilePreferenceStore::new(dir_path).unwrap());
    Script::new().run(&mut first, "move 5 0\nshow notes\nhide age\ncommit\n");
    assert!(dir.path().join("contacts.json").exists());

    let mut second = model_with(JsonFilePreferenceStore::new(dir_path).unwrap());
    assert!(second.restore_columns().unwrap());
    assert_eq!(second.columns()[0].key, "notes");
    assert!(second.columns()[0].visible);
    assert!(!second.registry().column("age").unwrap().visible);

    Script::new().run(&mut second, "reset\n");
    assert!(!dir.path().join("contacts.json").exists());
    assert_eq!(second.columns(), fixture_columns().as_slice());
}
