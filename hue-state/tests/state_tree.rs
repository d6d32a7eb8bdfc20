//! Cache, registry and transaction working on one shared tree

use std::sync::Arc;
use std::time::Duration;

use hue_api::mock::MockHttpHandler;
use hue_api::{Clock, CommandDispatcher, HttpHandler, ManualClock, Method, DEFAULT_MIN_DELAY};
use hue_state::{ApiCache, CachedResource, ResourceList, StateTransaction};
use serde_json::{json, Value};

struct Lamp {
    id: i32,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl CachedResource for Lamp {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}

impl Lamp {
    fn transaction(&self) -> StateTransaction {
        let state = self.cache.child("state");
        let baseline = state.get_value().unwrap();
        StateTransaction::new(
            self.commands.clone(),
            format!("/lights/{}/state", self.id),
            baseline,
            Some(state),
        )
    }
}

fn setup() -> (Arc<MockHttpHandler>, Arc<ManualClock>, ApiCache, ResourceList<Lamp, i32>) {
    let mock = Arc::new(MockHttpHandler::new());
    let clock = Arc::new(ManualClock::new());
    let commands = CommandDispatcher::with_clock(
        "192.168.2.116",
        80,
        "user",
        Arc::clone(&mock) as Arc<dyn HttpHandler>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        DEFAULT_MIN_DELAY,
    );
    let root = ApiCache::root("", commands.clone(), Duration::from_secs(10));
    let factory_commands = commands.clone();
    let lights = ResourceList::with_parent(commands, "/lights", &root, "lights", move |id: &i32, _: &Value, cache| {
        Lamp {
            id: *id,
            cache,
            commands: factory_commands.clone(),
        }
    });
    (mock, clock, root, lights)
}

#[test]
fn test_commit_is_visible_to_every_reader_of_the_root() {
    let (mock, _clock, root, mut lights) = setup();
    mock.respond(
        Method::Get,
        "/api/user",
        r#"{"lights":{"1":{"state":{"on":true,"bri":10,"colormode":"hs","hue":100,"sat":200}}}}"#,
    )
    .respond(
        Method::Put,
        "/api/user/lights/1/state",
        r#"[{"success":{"/lights/1/state/ct":250}}]"#,
    );

    let lamp = lights.get(&1).unwrap();
    assert!(lamp.transaction().set_color_temperature(250).commit().unwrap());

    let snapshot = root.peek_value().unwrap();
    assert_eq!(snapshot["lights"]["1"]["state"]["ct"], json!(250));
    assert_eq!(snapshot["lights"]["1"]["state"]["colormode"], json!("ct"));
    assert_eq!(mock.total_calls(), 2);
}

#[test]
fn test_stale_root_refreshes_once_for_all_children() {
    let (mock, clock, root, mut lights) = setup();
    mock.respond_always(
        Method::Get,
        "/api/user",
        r#"{"lights":{"1":{"state":{"on":true}},"2":{"state":{"on":false}}}}"#,
    );

    assert_eq!(lights.get_all().unwrap().len(), 2);
    clock.advance(Duration::from_secs(10));
    for lamp in lights.get_all().unwrap() {
        lamp.state_cache().get_value().unwrap();
    }

    assert_eq!(mock.call_count(Method::Get, "/api/user"), 2);
    assert!(root.last_refresh().unwrap().is_some());
}
