//! Sensors: switches, motion and daylight sensors and CLIP virtual sensors
//!
//! Every sensor shares the same layout (`state`, `config` and a bridge
//! reported `type`), so one [`Sensor`] handle covers all kinds. Use
//! [`SensorList::get_all_by_type`] to pick out one kind.

use std::collections::BTreeSet;
use std::fmt;
use std::ops::{Deref, DerefMut};

use hue_api::{ApiError, CommandDispatcher};
use hue_state::{ApiCache, CachedResource, CreateParams, CreateableResourceList};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::attributes::{bool_at, put_and_refresh, single, string_at};
use crate::error::Result;

/// Bridge type string of the built-in daylight sensor
pub const DAYLIGHT_SENSOR_TYPE: &str = "Daylight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    None,
    /// Single flash
    Select,
    /// Flash for 15 seconds
    LSelect,
}

impl Alert {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alert::None => "none",
            Alert::Select => "select",
            Alert::LSelect => "lselect",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "select" => Alert::Select,
            "lselect" => Alert::LSelect,
            _ => Alert::None,
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Sensor {
    id: i32,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl Sensor {
    pub(crate) fn new(id: i32, cache: ApiCache, commands: CommandDispatcher) -> Self {
        Self { id, cache, commands }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn refresh(&self) -> Result<()> {
        Ok(self.cache.refresh()?)
    }

    fn snapshot(&self) -> Result<Value> {
        Ok(self.cache.get_value()?)
    }

    fn path(&self) -> String {
        format!("/sensors/{}", self.id)
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/name"))
    }

    /// Bridge-reported type, e.g. "ZLLSwitch" or "CLIPGenericStatus"
    pub fn sensor_type(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/type"))
    }

    pub fn model_id(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/modelid"))
    }

    pub fn manufacturer(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/manufacturername"))
    }

    pub fn unique_id(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/uniqueid"))
    }

    pub fn config(&self) -> Result<Value> {
        Ok(self.snapshot()?.get("config").cloned().unwrap_or_else(|| json!({})))
    }

    pub fn state(&self) -> Result<Value> {
        Ok(self.snapshot()?.get("state").cloned().unwrap_or_else(|| json!({})))
    }

    pub fn is_on(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/config/on"))
    }

    pub fn is_reachable(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/config/reachable"))
    }

    /// Battery charge in percent; `None` for mains powered sensors
    pub fn battery(&self) -> Result<Option<u8>> {
        Ok(self
            .snapshot()?
            .pointer("/config/battery")
            .and_then(Value::as_u64)
            .and_then(|percent| u8::try_from(percent).ok()))
    }

    pub fn last_alert(&self) -> Result<Alert> {
        Ok(Alert::parse(&string_at(&self.snapshot()?, "/config/alert")))
    }

    /// Bridge timestamp of the last state change; empty when never updated
    pub fn last_updated(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/state/lastupdated"))
    }

    /// Button event code of a switch, 0 when the sensor reports none
    pub fn button_event(&self) -> Result<i64> {
        Ok(self
            .snapshot()?
            .pointer("/state/buttonevent")
            .and_then(Value::as_i64)
            .unwrap_or(0))
    }

    pub fn set_name(&self, name: &str) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("name", json!(name)))
    }

    pub fn set_config_attribute(&self, key: &str, value: Value) -> Result<bool> {
        let path = format!("{}/config", self.path());
        put_and_refresh(&self.commands, &self.cache, &path, single(key, value))
    }

    /// Only CLIP sensors accept state writes
    pub fn set_state_attribute(&self, key: &str, value: Value) -> Result<bool> {
        let path = format!("{}/state", self.path());
        put_and_refresh(&self.commands, &self.cache, &path, single(key, value))
    }

    pub fn set_on(&self, on: bool) -> Result<bool> {
        self.set_config_attribute("on", json!(on))
    }

    pub fn send_alert(&self, alert: Alert) -> Result<bool> {
        self.set_config_attribute("alert", json!(alert.as_str()))
    }
}

impl CachedResource for Sensor {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}

/// Parameters for creating a CLIP sensor
#[derive(Debug, Clone, PartialEq)]
pub struct CreateSensor {
    request: Map<String, Value>,
}

impl CreateSensor {
    pub fn new(
        name: &str,
        model_id: &str,
        sw_version: &str,
        sensor_type: &str,
        unique_id: &str,
        manufacturer: &str,
    ) -> Self {
        let mut request = Map::new();
        request.insert("name".to_string(), json!(name));
        request.insert("modelid".to_string(), json!(model_id));
        request.insert("swversion".to_string(), json!(sw_version));
        request.insert("type".to_string(), json!(sensor_type));
        request.insert("uniqueid".to_string(), json!(unique_id));
        request.insert("manufacturername".to_string(), json!(manufacturer));
        Self { request }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.request.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn state(self, state: Value) -> Self {
        self.with("state", state)
    }

    #[must_use]
    pub fn config(self, config: Value) -> Self {
        self.with("config", config)
    }

    #[must_use]
    pub fn recycle(self, recycle: bool) -> Self {
        self.with("recycle", json!(recycle))
    }
}

impl CreateParams for CreateSensor {
    fn request(&self) -> Value {
        Value::Object(self.request.clone())
    }
}

/// Sensor registry with lookup by bridge type
pub struct SensorList {
    list: CreateableResourceList<Sensor, i32, CreateSensor>,
}

impl SensorList {
    pub(crate) fn new(list: CreateableResourceList<Sensor, i32, CreateSensor>) -> Self {
        Self { list }
    }

    /// Every sensor whose cached `type` equals `sensor_type`, in id order
    pub fn get_all_by_type(&mut self, sensor_type: &str) -> Result<Vec<&mut Sensor>> {
        let state = self.list.cache().get_value()?;
        let entries = state.as_object().ok_or_else(|| {
            ApiError::MalformedReply(format!("{} is not an object", self.list.cache().path()))
        })?;
        let matching: BTreeSet<i32> = entries
            .iter()
            .filter(|(_, sensor)| sensor.get("type").and_then(Value::as_str) == Some(sensor_type))
            .filter_map(|(key, _)| key.parse().ok())
            .collect();
        debug!(%sensor_type, count = matching.len(), "filtered sensors by type");

        Ok(self
            .list
            .get_all()?
            .into_iter()
            .filter(|sensor| matching.contains(&sensor.id()))
            .collect())
    }
}

impl fmt::Debug for SensorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensorList").field("list", &*self.list).finish()
    }
}

impl Deref for SensorList {
    type Target = CreateableResourceList<Sensor, i32, CreateSensor>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl DerefMut for SensorList {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}
