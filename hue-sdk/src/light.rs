//! Light handle
//!
//! A [`Light`] reads everything from the bridge cache and writes state through
//! a [`StateTransaction`] targeting `/lights/<id>/state`.

use hue_api::CommandDispatcher;
use hue_state::{ApiCache, CachedResource, StateTransaction};
use serde_json::{json, Value};

use crate::attributes::{bool_at, put_and_refresh, single, string_at};
use crate::error::Result;

/// One light known to the bridge
///
/// # Example
///
/// ```rust,ignore
/// let light = bridge.lights().get(&3)?;
/// if !light.is_on()? {
///     light.transaction()?.set_on(true).set_brightness(120).commit()?;
/// }
/// ```
#[derive(Debug)]
pub struct Light {
    id: i32,
    cache: ApiCache,
    commands: CommandDispatcher,
}

impl Light {
    pub(crate) fn new(id: i32, cache: ApiCache, commands: CommandDispatcher) -> Self {
        Self { id, cache, commands }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    /// Re-fetch the bridge state this light is read from
    pub fn refresh(&self) -> Result<()> {
        Ok(self.cache.refresh()?)
    }

    fn snapshot(&self) -> Result<Value> {
        Ok(self.cache.get_value()?)
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/name"))
    }

    /// Bridge-reported type, e.g. "Extended color light"
    pub fn light_type(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/type"))
    }

    pub fn model_id(&self) -> Result<String> {
        Ok(string_at(&self.snapshot()?, "/modelid"))
    }

    pub fn is_on(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/state/on"))
    }

    pub fn is_reachable(&self) -> Result<bool> {
        Ok(bool_at(&self.snapshot()?, "/state/reachable"))
    }

    /// Current brightness, `None` for lights that cannot dim
    pub fn brightness(&self) -> Result<Option<u8>> {
        Ok(self
            .snapshot()?
            .pointer("/state/bri")
            .and_then(Value::as_u64)
            .and_then(|bri| u8::try_from(bri).ok()))
    }

    /// `hs`, `xy` or `ct`; `None` for lights without color
    pub fn color_mode(&self) -> Result<Option<String>> {
        Ok(self
            .snapshot()?
            .pointer("/state/colormode")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    pub fn set_name(&self, name: &str) -> Result<bool> {
        let path = format!("/lights/{}", self.id);
        put_and_refresh(&self.commands, &self.cache, &path, single("name", json!(name)))
    }

    /// Start a state change against the current cached state
    ///
    /// Committing patches the cache, so reads reflect the change without
    /// another fetch.
    pub fn transaction(&self) -> Result<StateTransaction> {
        let state = self.cache.child("state");
        let baseline = state.get_value()?;
        Ok(StateTransaction::new(
            self.commands.clone(),
            format!("/lights/{}/state", self.id),
            baseline,
            Some(state),
        ))
    }

    pub fn set_on(&self, on: bool, transition: u16) -> Result<bool> {
        Ok(self.transaction()?.set_on(on).set_transition(transition).commit()?)
    }

    /// Flash once
    pub fn alert(&self) -> Result<bool> {
        Ok(self.transaction()?.alert().commit()?)
    }
}

impl CachedResource for Light {
    fn state_cache(&self) -> &ApiCache {
        &self.cache
    }
}
