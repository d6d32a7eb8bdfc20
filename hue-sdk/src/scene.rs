//! Scenes: stored light states that can be recalled on a group

use hue_api::CommandDispatcher;
use hue_state::{ApiCache, CachedResource, CreateParams, ALL_LIGHTS_GROUP};
use serde_json::{json, Map, Value};

use crate::attributes::{bool_at, id_strings, ids_at, put_and_refresh, put_fields, single, string_at};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneType {
    /// Bound to a list of lights
    LightScene,
    /// Bound to a group; its lights follow the group membership
    GroupScene,
}

#[derive(Debug)]
pub struct Scene {
    id: String,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl Scene {
    pub(crate) fn new(id: String, cache: ApiCache, commands: CommandDispatcher) -> Self {
        Self { id, cache, commands }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn refresh(&self) -> Result<()> {
        Ok(self.cache.refresh()?)
    }

    fn snapshot(&self) -> Result<Value> {
        Ok(self.cache.get_value()?)
    }

    fn path(&self) -> String {
        format!("/scenes/{}", self.id)
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/name"))
    }

    pub fn scene_type(&self) -> Result<SceneType> {
        Ok(match string_at(&self.snapshot()?, "/type").as_str() {
            "GroupScene" => SceneType::GroupScene,
            _ => SceneType::LightScene,
        })
    }

    /// Group a `GroupScene` belongs to
    pub fn group_id(&self) -> Result<Option<i32>> {
        Ok(string_at(&self.snapshot()?, "/group").parse().ok())
    }

    pub fn light_ids(&self) -> Result<Vec<i32>> {
        Ok(ids_at(&self.snapshot()?, "/lights"))
    }

    pub fn owner(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/owner"))
    }

    pub fn is_locked(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/locked"))
    }

    pub fn recycle(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/recycle"))
    }

    pub fn set_name(&self, name: &str) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("name", json!(name)))
    }

    pub fn set_light_ids(&self, ids: &[i32]) -> Result<bool> {
        put_and_refresh(&self.commands, &self.cache, &self.path(), single("lights", id_strings(ids)))
    }

    /// Save the lights' current state into the scene
    pub fn store_current_light_state(&self, transition: Option<u16>) -> Result<bool> {
        let mut fields = single("storelightstate", json!(true));
        if let Some(transition) = transition {
            fields.insert("transitiontime".to_string(), json!(transition));
        }
        put_and_refresh(&self.commands, &self.cache, &self.path(), fields)
    }

    /// Apply the scene, on its own group or else on all lights
    pub fn recall(&self) -> Result<bool> {
        let group = match self.scene_type()? {
            SceneType::GroupScene => self.group_id()?.unwrap_or(ALL_LIGHTS_GROUP),
            SceneType::LightScene => ALL_LIGHTS_GROUP,
        };
        let path = format!("/groups/{group}/action");
        put_fields(&self.commands, &path, single("scene", json!(self.id)))
    }
}

impl CachedResource for Scene {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}

/// Parameters for creating a scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateScene {
    request: Map<String, Value>,
}

impl CreateScene {
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

    /// Make this a `GroupScene` for `group`
    #[must_use]
    pub fn group_id(self, group: i32) -> Self {
        self.with("type", json!("GroupScene"))
            .with("group", json!(group.to_string()))
    }

    /// Make this a `LightScene` over `ids`
    #[must_use]
    pub fn light_ids(self, ids: &[i32]) -> Self {
        self.with("type", json!("LightScene"))
            .with("lights", id_strings(ids))
    }

    #[must_use]
    pub fn recycle(self, recycle: bool) -> Self {
        self.with("recycle", json!(recycle))
    }
}

impl CreateParams for CreateScene {
    fn request(&self) -> Value {
        Value::Object(self.request.clone())
    }
}
