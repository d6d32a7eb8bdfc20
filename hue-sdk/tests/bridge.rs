//! End-to-end behavior of the bridge facade against a scripted transport

use std::sync::Arc;
use std::time::Duration;

use hue_api::mock::MockHttpHandler;
use hue_api::ManualClock;
use hue_sdk::{
    Bridge, BridgeConfig, Clock, CreateScene, CreateSchedule, CreateSensor, HttpHandler, Method, ScheduleStatus,
    SceneType, SdkError, ALL_LIGHTS_GROUP, DAYLIGHT_SENSOR_TYPE,
};
use serde_json::json;

const FULL_STATE_URI: &str = "/api/user";

const FULL_STATE: &str = r#"{
    "lights": {
        "1": {"name": "Hall", "type": "Extended color light", "modelid": "LCT015",
              "state": {"on": true, "bri": 100, "colormode": "ct", "ct": 300, "reachable": true}},
        "2": {"name": "Desk", "type": "Dimmable light", "modelid": "LWB010",
              "state": {"on": false, "bri": 254, "reachable": true}}
    },
    "groups": {
        "1": {"name": "Kitchen", "type": "Room", "class": "Kitchen", "lights": ["1", "2"],
              "state": {"all_on": false, "any_on": true},
              "action": {"on": true, "bri": 100, "colormode": "ct", "ct": 300}}
    },
    "schedules": {
        "1": {"name": "Wake up", "description": "",
              "command": {"address": "/api/user/groups/0/action", "method": "PUT", "body": {"on": true}},
              "localtime": "W124/T07:00:00", "status": "enabled", "autodelete": false}
    },
    "scenes": {
        "AbC123": {"name": "Relax", "type": "GroupScene", "group": "1", "lights": ["1", "2"],
                   "owner": "user", "locked": false, "recycle": false}
    },
    "sensors": {
        "1": {"name": "Daylight", "type": "Daylight", "modelid": "PHDL00", "manufacturername": "Signify",
              "state": {"daylight": true, "lastupdated": "2026-10-16T06:41:00"},
              "config": {"on": true, "configured": true, "sunriseoffset": 30}},
        "2": {"name": "Hall switch", "type": "ZLLSwitch", "modelid": "RWL021",
              "state": {"buttonevent": 1002, "lastupdated": "2026-10-16T08:12:45"},
              "config": {"on": true, "battery": 87, "reachable": true, "alert": "none"}},
        "3": {"name": "Bedroom switch", "type": "ZLLSwitch", "modelid": "RWL021",
              "state": {"buttonevent": 4002, "lastupdated": "none"},
              "config": {"on": true, "battery": 12, "reachable": false, "alert": "none"}}
    },
    "config": {"name": "Philips hue", "apiversion": "1.24.0"}
}"#;

struct Fixture {
    mock: Arc<MockHttpHandler>,
    clock: Arc<ManualClock>,
    bridge: Bridge,
}

fn fixture_with(config: BridgeConfig) -> Fixture {
    let mock = Arc::new(MockHttpHandler::new());
    let clock = Arc::new(ManualClock::new());
    let bridge = Bridge::with_clock(
        config,
        Arc::clone(&mock) as Arc<dyn HttpHandler>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    );
    Fixture { mock, clock, bridge }
}

fn fixture() -> Fixture {
    fixture_with(BridgeConfig::new("192.168.2.116").with_username("user"))
}

#[test]
fn test_one_fetch_serves_every_list() {
    let mut f = fixture();
    f.mock.respond_always(Method::Get, FULL_STATE_URI, FULL_STATE);

    assert_eq!(f.bridge.name().unwrap(), "Philips hue");
    assert_eq!(f.bridge.api_version().unwrap(), "1.24.0");

    let names: Vec<String> = f
        .bridge
        .lights()
        .get_all()
        .unwrap()
        .iter()
        .map(|light| light.name().unwrap())
        .collect();
    assert_eq!(names, ["Hall", "Desk"]);

    let kitchen = f.bridge.groups().get(&1).unwrap();
    assert_eq!(kitchen.name().unwrap(), "Kitchen");
    assert_eq!(kitchen.light_ids().unwrap(), vec![1, 2]);
    assert!(kitchen.any_on().unwrap());

    let schedule = f.bridge.schedules().get(&1).unwrap();
    assert_eq!(schedule.status().unwrap(), ScheduleStatus::Enabled);
    assert_eq!(schedule.command().unwrap().method, Method::Put);

    let scene = f.bridge.scenes().get(&"AbC123".to_string()).unwrap();
    assert_eq!(scene.scene_type().unwrap(), SceneType::GroupScene);
    assert_eq!(scene.group_id().unwrap(), Some(1));

    assert_eq!(f.mock.total_calls(), 1);
}

#[test]
fn test_cached_state_expires_after_refresh_interval() {
    let mut f = fixture();
    let renamed = FULL_STATE.replace("\"Hall\"", "\"Hallway\"");
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(Method::Get, FULL_STATE_URI, renamed);

    let light = f.bridge.lights().get(&1).unwrap();
    assert_eq!(light.name().unwrap(), "Hall");

    f.clock.advance(Duration::from_secs(9));
    assert_eq!(light.name().unwrap(), "Hall");
    assert_eq!(f.mock.total_calls(), 1);

    f.clock.advance(Duration::from_secs(2));
    assert_eq!(light.name().unwrap(), "Hallway");
    assert_eq!(f.mock.total_calls(), 2);
}

#[test]
fn test_light_transaction_sends_only_the_difference() {
    let mut f = fixture();
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(
            Method::Put,
            "/api/user/lights/1/state",
            r#"[{"success":{"/lights/1/state/bri":0}},{"success":{"/lights/1/state/on":false}}]"#,
        );
    let light = f.bridge.lights().get(&1).unwrap();

    assert!(light.transaction().unwrap().set_brightness(100).commit().unwrap());
    assert_eq!(f.mock.call_count(Method::Put, "/api/user/lights/1/state"), 0);

    assert!(light.transaction().unwrap().set_brightness(0).commit().unwrap());
    let calls = f.mock.calls();
    let put = calls.iter().find(|call| call.method == Method::Put).unwrap();
    assert_eq!(put.body, r#"{"bri":0,"on":false}"#);

    assert!(!light.is_on().unwrap());
    assert_eq!(light.brightness().unwrap(), Some(0));
    assert_eq!(f.mock.call_count(Method::Get, FULL_STATE_URI), 1);
}

#[test]
fn test_light_that_is_off_is_switched_on_for_color() {
    let mut f = fixture();
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(
            Method::Put,
            "/api/user/lights/2/state",
            r#"[{"success":{"/lights/2/state/bri":50}},{"success":{"/lights/2/state/on":true}}]"#,
        );
    let desk = f.bridge.lights().get(&2).unwrap();

    assert!(desk.transaction().unwrap().set_brightness(50).commit().unwrap());
    assert!(desk.is_on().unwrap());
}

#[test]
fn test_group_zero_is_fetched_on_its_own() {
    let mut f = fixture();
    f.mock.respond_always(
        Method::Get,
        "/api/user/groups/0",
        r#"{"name":"Group 0","type":"LightGroup","lights":["1","2"],"action":{"on":false,"bri":1}}"#,
    );
    f.mock.respond(
        Method::Put,
        "/api/user/groups/0/action",
        r#"[{"success":{"/groups/0/action/on":true}}]"#,
    );

    assert!(f.bridge.groups().exists(&ALL_LIGHTS_GROUP).unwrap());
    assert!(f.bridge.groups().exists_cached(&ALL_LIGHTS_GROUP).unwrap());
    assert_eq!(f.mock.total_calls(), 0);

    let all = f.bridge.groups().get(&ALL_LIGHTS_GROUP).unwrap();
    assert_eq!(all.light_ids().unwrap(), vec![1, 2]);
    assert!(all.transaction().unwrap().set_on(true).commit().unwrap());
    assert!(all.action_on().unwrap());

    assert_eq!(f.mock.call_count(Method::Get, FULL_STATE_URI), 0);
    assert_eq!(f.mock.call_count(Method::Get, "/api/user/groups/0"), 1);
}

#[test]
fn test_create_returns_normalized_ids() {
    let mut f = fixture();
    f.mock
        .respond_always(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(Method::Post, "/api/user/schedules", r#"[{"success":{"id":"2"}}]"#)
        .respond(Method::Post, "/api/user/scenes", r#"[{"success":{"id":"XyZ789"}}]"#);

    let schedule = CreateSchedule::new().name("Lights out").time("W127/T23:00:00");
    assert_eq!(f.bridge.schedules().create(&schedule).unwrap(), 2);

    let scene = CreateScene::new().name("Focus").group_id(1);
    assert_eq!(f.bridge.scenes().create(&scene).unwrap(), "XyZ789");

    assert_eq!(f.mock.call_count(Method::Get, FULL_STATE_URI), 2);
}

#[test]
fn test_remove_light_updates_cache() {
    let mut f = fixture();
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(Method::Delete, "/api/user/lights/2", r#"[{"success":"/lights/2 deleted"}]"#);

    f.bridge.lights().get(&2).unwrap();
    assert!(f.bridge.lights().remove(&2).unwrap());

    assert!(!f.bridge.lights().exists_cached(&2).unwrap());
    assert!(f.bridge.lights().exists_cached(&1).unwrap());
    assert_eq!(f.mock.total_calls(), 2);
}

#[test]
fn test_schedule_setter_refreshes_cache() {
    let mut f = fixture();
    let renamed = FULL_STATE.replace("\"Wake up\"", "\"Alarm\"");
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(Method::Put, "/api/user/schedules/1", r#"[{"success":{"/schedules/1/name":"Alarm"}}]"#)
        .respond(Method::Get, FULL_STATE_URI, renamed);

    let schedule = f.bridge.schedules().get(&1).unwrap();
    assert!(schedule.set_name("Alarm").unwrap());
    assert_eq!(schedule.name().unwrap(), "Alarm");
    assert_eq!(f.mock.total_calls(), 3);
}

#[test]
fn test_scene_recall_targets_its_group() {
    let mut f = fixture();
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(
            Method::Put,
            "/api/user/groups/1/action",
            r#"[{"success":{"/groups/1/action/scene":"AbC123"}}]"#,
        );

    let scene = f.bridge.scenes().get(&"AbC123".to_string()).unwrap();
    assert!(scene.recall().unwrap());
    assert_eq!(f.mock.calls()[1].body, r#"{"scene":"AbC123"}"#);
}

#[test]
fn test_sensors_are_filtered_by_type() {
    let mut f = fixture();
    f.mock.respond_always(Method::Get, FULL_STATE_URI, FULL_STATE);

    let daylight: Vec<i32> = f
        .bridge
        .sensors()
        .get_all_by_type(DAYLIGHT_SENSOR_TYPE)
        .unwrap()
        .iter()
        .map(|sensor| sensor.id())
        .collect();
    assert_eq!(daylight, [1]);

    let switches = f.bridge.sensors().get_all_by_type("ZLLSwitch").unwrap();
    let summary: Vec<(i32, Option<u8>, i64)> = switches
        .iter()
        .map(|switch| (switch.id(), switch.battery().unwrap(), switch.button_event().unwrap()))
        .collect();
    let expected: Vec<(i32, Option<u8>, i64)> = vec![(2, Some(87), 1002), (3, Some(12), 4002)];
    assert_eq!(summary, expected);

    assert!(f.bridge.sensors().get_all_by_type("CLIPPresence").unwrap().is_empty());
    assert_eq!(f.mock.total_calls(), 1);
}

#[test]
fn test_sensor_config_write_and_create() {
    let mut f = fixture();
    let switched_off = FULL_STATE.replace(
        r#""config": {"on": true, "configured": true"#,
        r#""config": {"on": false, "configured": true"#,
    );
    f.mock
        .respond(Method::Get, FULL_STATE_URI, FULL_STATE)
        .respond(Method::Put, "/api/user/sensors/1/config", r#"[{"success":{"/sensors/1/config/on":false}}]"#)
        .respond(Method::Get, FULL_STATE_URI, switched_off)
        .respond(Method::Post, "/api/user/sensors", r#"[{"success":{"id":"4"}}]"#)
        .respond_always(Method::Get, FULL_STATE_URI, FULL_STATE);

    let daylight = f.bridge.sensors().get(&1).unwrap();
    assert!(daylight.is_on().unwrap());
    assert!(daylight.set_on(false).unwrap());
    assert!(!daylight.is_on().unwrap());
    assert_eq!(f.mock.calls()[1].body, r#"{"on":false}"#);

    let door = CreateSensor::new("Door", "PHDL00", "1.0", "CLIPOpenClose", "door-1", "acme");
    assert_eq!(f.bridge.sensors().create(&door).unwrap(), 4);
}

#[test]
fn test_request_username_waits_for_link_button() {
    let mut f = fixture_with(BridgeConfig::new("192.168.2.116"));
    let not_pressed = r#"[{"error":{"type":101,"address":"","description":"link button not pressed"}}]"#;
    f.mock
        .respond(Method::Post, "/api", not_pressed)
        .respond(Method::Post, "/api", not_pressed)
        .respond(Method::Post, "/api", r#"[{"success":{"username":"paired"}}]"#)
        .respond(Method::Get, "/api/paired", FULL_STATE);

    assert_eq!(f.bridge.request_username().unwrap(), "paired");
    assert_eq!(f.bridge.username(), "paired");
    assert!(f.clock.elapsed() >= Duration::from_secs(2));

    let calls = f.mock.calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].body, json!({"devicetype": "hue-sdk#rust"}).to_string());

    f.bridge.refresh().unwrap();
    assert_eq!(f.mock.call_count(Method::Get, "/api/paired"), 1);
}

#[test]
fn test_request_username_gives_up_after_timeout() {
    let mut config = BridgeConfig::new("192.168.2.116");
    config.pairing_timeout = Duration::from_secs(5);
    let mut f = fixture_with(config);
    f.mock.respond_always(
        Method::Post,
        "/api",
        r#"[{"error":{"type":101,"address":"","description":"link button not pressed"}}]"#,
    );

    let error = f.bridge.request_username().unwrap_err();

    assert!(matches!(error, SdkError::LinkButtonTimeout(timeout) if timeout == Duration::from_secs(5)));
    assert!(f.clock.elapsed() >= Duration::from_secs(5));
    assert_eq!(f.mock.call_count(Method::Post, "/api"), 6);
    assert!(f.bridge.username().is_empty());
}

#[test]
fn test_request_username_raises_other_errors() {
    let mut f = fixture_with(BridgeConfig::new("192.168.2.116"));
    f.mock.respond(
        Method::Post,
        "/api",
        r#"[{"error":{"type":7,"address":"/devicetype","description":"invalid value"}}]"#,
    );

    let error = f.bridge.request_username().unwrap_err();
    assert_eq!(error.api_code(), Some(7));
    assert_eq!(f.mock.total_calls(), 1);
}

#[test]
fn test_new_transport_drops_cached_state() {
    let mut f = fixture();
    f.mock.respond_always(Method::Get, FULL_STATE_URI, FULL_STATE);
    f.bridge.lights().get(&1).unwrap();

    let replacement = Arc::new(MockHttpHandler::new());
    replacement.respond_always(Method::Get, FULL_STATE_URI, FULL_STATE.replace("\"Hall\"", "\"Porch\""));
    f.bridge.set_http_handler(Arc::clone(&replacement) as Arc<dyn HttpHandler>);

    assert!(!f.bridge.lights().is_materialized(&1));
    assert_eq!(f.bridge.lights().get(&1).unwrap().name().unwrap(), "Porch");
    assert_eq!(f.mock.total_calls(), 1);
    assert_eq!(replacement.total_calls(), 1);
}

#[test]
fn test_requests_respect_configured_min_delay() {
    let mut config = BridgeConfig::new("192.168.2.116").with_username("user");
    config.min_delay = Duration::from_millis(250);
    let f = fixture_with(config);
    f.mock.respond_always(Method::Get, FULL_STATE_URI, FULL_STATE);

    for _ in 0..3 {
        f.bridge.refresh().unwrap();
    }

    assert!(f.clock.elapsed() >= Duration::from_millis(500));
}
