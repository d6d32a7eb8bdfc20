//! Schedules: bridge-side timers that send one API command

use std::fmt;

use hue_api::{ApiError, CommandDispatcher, Method};
use hue_state::{ApiCache, CachedResource, CreateParams};
use serde_json::{json, Map, Value};

use crate::attributes::{bool_at, put_and_refresh, single, string_at};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    Enabled,
    Disabled,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Enabled => "enabled",
            ScheduleStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request a schedule sends when it fires
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleCommand {
    /// Full API address, e.g. `/api/<user>/groups/0/action`
    pub address: String,
    pub method: Method,
    pub body: Value,
}

impl ScheduleCommand {
    pub fn new(address: impl Into<String>, method: Method, body: Value) -> Self {
        Self {
            address: address.into(),
            method,
            body,
        }
    }

    pub fn from_json(value: &Value) -> std::result::Result<Self, ApiError> {
        let method = value
            .get("method")
            .and_then(Value::as_str)
            .and_then(parse_method)
            .ok_or_else(|| ApiError::MalformedReply(format!("schedule command without valid method: {value}")))?;
        Ok(Self {
            address: string_at(value, "/address"),
            method,
            body: value.get("body").cloned().unwrap_or_else(|| json!({})),
        })
    }

    pub fn to_json(&self) -> Value {
        json!({
            "address": self.address,
            "method": self.method.as_str(),
            "body": self.body,
        })
    }
}

fn parse_method(raw: &str) -> Option<Method> {
    match raw.to_ascii_uppercase().as_str() {
        "GET" => Some(Method::Get),
        "PUT" => Some(Method::Put),
        "POST" => Some(Method::Post),
        "DELETE" => Some(Method::Delete),
        _ => None,
    }
}

#[derive(Debug)]
pub struct Schedule {
    id: i32,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl Schedule {
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

    fn set(&self, key: &str, value: Value) -> Result<bool> {
        let path = format!("/schedules/{}", self.id);
        put_and_refresh(&self.commands, &self.cache, &path, single(key, value))
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/name"))
    }

    pub fn description(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/description"))
    }

    pub fn command(&self) -> Result<ScheduleCommand> {
        let snapshot = self.snapshot()?;
        let command = snapshot.get("command").cloned().unwrap_or(Value::Null);
        Ok(ScheduleCommand::from_json(&command)?)
    }

    /// Time pattern in bridge syntax; `localtime` when present, else `time`
    pub fn time(&self) -> Result<String> {
        let snapshot = self.snapshot()?;
        let local = string_at(&snapshot, "/localtime");
        Ok(if local.is_empty() { string_at(&snapshot, "/time") } else { local })
    }

    pub fn status(&self) -> Result<ScheduleStatus> {
        Ok(match string_at(&self.snapshot()?, "/status").as_str() {
            "enabled" => ScheduleStatus::Enabled,
            _ => ScheduleStatus::Disabled,
        })
    }

    pub fn autodelete(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/autodelete"))
    }

    pub fn set_name(&self, name: &str) -> Result<bool> {
        self.set("name", json!(name))
    }

    pub fn set_description(&self, description: &str) -> Result<bool> {
        self.set("description", json!(description))
    }

    pub fn set_command(&self, command: &ScheduleCommand) -> Result<bool> {
        self.set("command", command.to_json())
    }

    pub fn set_time(&self, pattern: &str) -> Result<bool> {
        self.set("localtime", json!(pattern))
    }

    pub fn set_status(&self, status: ScheduleStatus) -> Result<bool> {
        self.set("status", json!(status.as_str()))
    }

    pub fn set_autodelete(&self, autodelete: bool) -> Result<bool> {
        self.set("autodelete", json!(autodelete))
    }
}

impl CachedResource for Schedule {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}

/// Parameters for creating a schedule; unset fields are left to the bridge
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateSchedule {
    request: Map<String, Value>,
}

impl CreateSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.request.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn name(self, name: &str) -> Self {
        self.with("name", json!(name))
    }

    #[must_use]
    pub fn description(self, description: &str) -> Self {
        self.with("description", json!(description))
    }

    #[must_use]
    pub fn command(self, command: &ScheduleCommand) -> Self {
        self.with("command", command.to_json())
    }

    #[must_use]
    pub fn time(self, pattern: &str) -> Self {
        self.with("localtime", json!(pattern))
    }

    #[must_use]
    pub fn status(self, status: ScheduleStatus) -> Self {
        self.with("status", json!(status.as_str()))
    }

    #[must_use]
    pub fn autodelete(self, autodelete: bool) -> Self {
        self.with("autodelete", json!(autodelete))
    }

    /// Let the bridge delete the schedule when nothing references it
    #[must_use]
    pub fn recycle(self, recycle: bool) -> Self {
        self.with("recycle", json!(recycle))
    }
}

impl CreateParams for CreateSchedule {
    fn request(&self) -> Value {
        Value::Object(self.request.clone())
    }
}
