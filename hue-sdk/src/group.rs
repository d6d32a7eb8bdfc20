//! Group handle and creation parameters

use hue_api::CommandDispatcher;
use hue_state::{ApiCache, CachedResource, CreateParams, StateTransaction};
use serde_json::{json, Map, Value};

use crate::attributes::{bool_at, id_strings, ids_at, put_and_refresh, put_fields, single, string_at};
use crate::error::Result;

/// A group of lights; group 0 contains every light of the bridge
#[derive(Debug)]
pub struct Group {
    id: i32,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl Group {
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
        format!("/groups/{}", self.id)
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/name"))
    }

    /// `LightGroup`, `Room`, `Zone`, `Entertainment`, ...
    pub fn group_type(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/type"))
    }

    pub fn light_ids(&self) -> Result<Vec<i32>> {
        Ok(ids_at(&self.snapshot()?, "/lights"))
    }

    /// Room class such as `Living room`; only rooms report one
    pub fn room_class(&self) -> Result<Option<String>> {
        Ok(self
            .snapshot()?
            .get("class")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn all_on(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/state/all_on"))
    }

    pub fn any_on(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/state/any_on"))
    }

    /// `on` of the last action applied to the group
    pub fn action_on(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/action/on"))
    }

    pub fn action_brightness(&self) -> Result<Option<u8>> {
        Ok(self
            .snapshot()?
            .pointer("/action/bri")
            .and_then(Value::as_u64)
            .and_then(|bri| u8::try_from(bri).ok()))
    }

    pub fn action_color_mode(&self) -> Result<Option<String>> {
        Ok(self
            .snapshot()?
            .pointer("/action/colormode")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn set_name(&self, name: &str) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("name", json!(name)))
    }

    pub fn set_lights(&self, ids: &[i32]) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("lights", id_strings(ids)))
    }

    pub fn set_room_class(&self, class: &str) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("class", json!(class)))
    }

    /// Recall a scene on this group
    pub fn set_scene(&self, scene: &str) -> Result<bool> {
        put_fields(&self.commands, &format!("{}/action", self.path()), single("scene", json!(scene)))
    }

    /// Start a state change for every light in the group
    pub fn transaction(&self) -> Result<StateTransaction> {
        let action = self.cache.child("action");
        let baseline = action.get_value()?;
        Ok(StateTransaction::new(
            self.commands.clone(),
            format!("{}/action", self.path()),
            baseline,
            Some(action),
        ))
    }
}

impl CachedResource for Group {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}

/// Parameters for creating a group
#[derive(Debug, Clone, PartialEq)]
pub struct CreateGroup {
    lights: Vec<i32>,
    name: String,
    group_type: &'static str,
    class: Option<String>,
}

impl CreateGroup {
    fn new(lights: Vec<i32>, name: impl Into<String>, group_type: &'static str) -> Self {
        Self {
            lights,
            name: name.into(),
            group_type,
            class: None,
        }
    }

    pub fn light_group(lights: Vec<i32>, name: impl Into<String>) -> Self {
        Self::new(lights, name, "LightGroup")
    }

    /// A room; a light can only be in one room
    pub fn room(lights: Vec<i32>, name: impl Into<String>, class: Option<String>) -> Self {
        Self {
            class,
            ..Self::new(lights, name, "Room")
        }
    }

    pub fn zone(lights: Vec<i32>, name: impl Into<String>) -> Self {
        Self::new(lights, name, "Zone")
    }

    pub fn entertainment(lights: Vec<i32>, name: impl Into<String>) -> Self {
        Self::new(lights, name, "Entertainment")
    }
}

impl CreateParams for CreateGroup {
    fn request(&self) -> Value {
        let mut request = Map::new();
        request.insert("lights".to_string(), id_strings(&self.lights));
        request.insert("type".to_string(), json!(self.group_type));
        if !self.name.is_empty() {
            request.insert("name".to_string(), json!(self.name));
        }
        if let Some(class) = &self.class {
            request.insert("class".to_string(), json!(class));
        }
        Value::Object(request)
    }
}
