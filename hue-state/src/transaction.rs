//! Diff-based write transactions for light and group state
//!
//! A [`StateTransaction`] collects attribute changes against one state object
//! (`/lights/<id>/state` or `/groups/<id>/action`), drops those that the last
//! known state already satisfies, and sends everything else in one PUT.
//!
//! ```rust,ignore
//! light
//!     .transaction()?
//!     .set_brightness(200)
//!     .set_color_temperature(370)
//!     .set_transition(10)
//!     .commit()?;
//! ```

use hue_api::reply::{validate_put_reply, values_match};
use hue_api::{ApiError, CommandDispatcher, Result};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cache::ApiCache;

/// Transition time the bridge applies when none is given, in 100ms steps
pub const DEFAULT_TRANSITION: u16 = 4;

const TRANSITION: &str = "transitiontime";

/// Fields whose presence makes a light visibly change, implying it should be on
const VISIBLE_FIELDS: [&str; 5] = ["effect", "hue", "sat", "xy", "ct"];

fn implied_colormode(key: &str) -> Option<&'static str> {
    match key {
        "hue" | "sat" => Some("hs"),
        "xy" => Some("xy"),
        "ct" => Some("ct"),
        _ => None,
    }
}

/// Pending write to one state object of the bridge
#[derive(Debug)]
pub struct StateTransaction {
    commands: CommandDispatcher,
    path: String,
    baseline: Map<String, Value>,
    cache: Option<ApiCache>,
    request: Map<String, Value>,
}

impl StateTransaction {
    /// Start a transaction against `path`
    ///
    /// `baseline` is the last known state used to drop redundant fields.
    /// When `cache` is given it must point at that same state object; it is
    /// patched with the committed values after a fully successful commit.
    pub fn new(
        commands: CommandDispatcher,
        path: impl Into<String>,
        baseline: Value,
        cache: Option<ApiCache>,
    ) -> Self {
        let baseline = match baseline {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            commands,
            path: path.into(),
            baseline,
            cache,
            request: Map::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Fields that would currently be sent, in the order they were set
    pub fn request(&self) -> &Map<String, Value> {
        &self.request
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.request.insert(key.to_string(), value);
        self
    }

    #[must_use]
    pub fn set_on(self, on: bool) -> Self {
        self.with("on", json!(on))
    }

    /// Brightness, clamped to 0..=254; 0 also switches the light off
    #[must_use]
    pub fn set_brightness(self, brightness: u8) -> Self {
        self.with("bri", json!(brightness.min(254)))
    }

    #[must_use]
    pub fn set_color_hue(self, hue: u16) -> Self {
        self.with("hue", json!(hue))
    }

    /// Saturation, clamped to 0..=254
    #[must_use]
    pub fn set_color_saturation(self, saturation: u8) -> Self {
        self.with("sat", json!(saturation.min(254)))
    }

    #[must_use]
    pub fn set_color_hue_saturation(self, hue: u16, saturation: u8) -> Self {
        self.set_color_hue(hue).set_color_saturation(saturation)
    }

    /// CIE xy coordinates, each clamped to 0..=1
    #[must_use]
    pub fn set_color_xy(self, x: f32, y: f32) -> Self {
        let x = f64::from(x.clamp(0.0, 1.0));
        let y = f64::from(y.clamp(0.0, 1.0));
        self.with("xy", json!([x, y]))
    }

    /// Color temperature in mired, clamped to 153..=500
    #[must_use]
    pub fn set_color_temperature(self, mired: u16) -> Self {
        self.with("ct", json!(mired.clamp(153, 500)))
    }

    #[must_use]
    pub fn set_color_loop(self, on: bool) -> Self {
        let effect = if on { "colorloop" } else { "none" };
        self.with("effect", json!(effect))
    }

    #[must_use]
    pub fn increment_brightness(self, increment: i32) -> Self {
        self.with("bri_inc", json!(increment.clamp(-254, 254)))
    }

    #[must_use]
    pub fn increment_saturation(self, increment: i32) -> Self {
        self.with("sat_inc", json!(increment.clamp(-254, 254)))
    }

    #[must_use]
    pub fn increment_hue(self, increment: i32) -> Self {
        self.with("hue_inc", json!(increment.clamp(-65534, 65534)))
    }

    #[must_use]
    pub fn increment_color_temperature(self, increment: i32) -> Self {
        self.with("ct_inc", json!(increment.clamp(-65534, 65534)))
    }

    #[must_use]
    pub fn increment_color_xy(self, x_increment: f32, y_increment: f32) -> Self {
        let x = f64::from(x_increment.clamp(-0.5, 0.5));
        let y = f64::from(y_increment.clamp(-0.5, 0.5));
        self.with("xy_inc", json!([x, y]))
    }

    /// Fade duration in multiples of 100ms
    ///
    /// The bridge default of [`DEFAULT_TRANSITION`] is not sent.
    #[must_use]
    pub fn set_transition(mut self, transition: u16) -> Self {
        if transition == DEFAULT_TRANSITION {
            self.request.remove(TRANSITION);
            self
        } else {
            self.with(TRANSITION, json!(transition))
        }
    }

    /// Flash once
    #[must_use]
    pub fn alert(self) -> Self {
        self.with("alert", json!("select"))
    }

    /// Flash repeatedly for 15 seconds
    #[must_use]
    pub fn long_alert(self) -> Self {
        self.with("alert", json!("lselect"))
    }

    #[must_use]
    pub fn stop_alert(self) -> Self {
        self.with("alert", json!("none"))
    }

    /// Drop fields the baseline state already satisfies
    ///
    /// Color fields only count as satisfied when the baseline is also in the
    /// color mode they imply. `on` is kept while a pending color field would
    /// switch the color mode.
    pub fn trim_request(&mut self) {
        let colormode = self
            .baseline
            .get("colormode")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let baseline = &self.baseline;

        self.request.retain(|key, value| {
            let Some(current) = baseline.get(key) else {
                return true;
            };
            match (key.as_str(), implied_colormode(key)) {
                (_, Some(mode)) => !(values_match(current, value) && colormode == mode),
                ("bri" | "effect", None) => !values_match(current, value),
                _ => true,
            }
        });

        let switches_mode = self
            .request
            .keys()
            .filter_map(|key| implied_colormode(key))
            .any(|mode| mode != colormode);
        let on_unchanged = match (self.request.get("on"), self.baseline.get("on")) {
            (Some(requested), Some(current)) => requested == current,
            _ => false,
        };
        if on_unchanged && !switches_mode {
            self.request.remove("on");
        }
    }

    /// Send the remaining changes in a single request
    ///
    /// Returns `Ok(true)` without contacting the bridge when nothing but
    /// (at most) a transition time is left after trimming. Returns `Ok(false)`
    /// when the bridge did not acknowledge every field.
    pub fn commit(mut self) -> Result<bool> {
        self.trim_request();

        let transition_only = self.request.len() == 1 && self.request.contains_key(TRANSITION);
        if self.request.is_empty() || transition_only {
            debug!(path = %self.path, "nothing to change, skipping request");
            return Ok(true);
        }

        self.infer_power_state();

        let body = Value::Object(self.request.clone());
        let reply = self.commands.put(&self.path, &body)?;
        if !validate_put_reply(&self.path, &self.request, &reply)? {
            return Ok(false);
        }

        self.write_back()?;
        Ok(true)
    }

    fn infer_power_state(&mut self) {
        if self.request.contains_key("on") {
            return;
        }

        let baseline_on = self.baseline.get("on").and_then(Value::as_bool);
        let brightness = self.request.get("bri").and_then(Value::as_u64);

        if brightness == Some(0) && baseline_on.unwrap_or(true) {
            self.request.insert("on".to_string(), json!(false));
        } else if !baseline_on.unwrap_or(false)
            && (brightness.is_some_and(|bri| bri != 0)
                || VISIBLE_FIELDS.iter().any(|key| self.request.contains_key(*key)))
        {
            self.request.insert("on".to_string(), json!(true));
        }
    }

    /// Colormode the bridge reports after applying this request
    fn resulting_colormode(&self) -> Option<&'static str> {
        ["xy", "ct", "hue", "sat"]
            .into_iter()
            .find(|key| self.request.contains_key(*key))
            .and_then(implied_colormode)
    }

    fn write_back(&self) -> Result<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let colormode = self.resulting_colormode();
        let committed = &self.request;

        let patched = cache.update(|state| {
            let Some(state) = state.as_object_mut() else {
                return;
            };
            for (key, value) in committed {
                if key == TRANSITION || key.ends_with("_inc") {
                    continue;
                }
                state.insert(key.clone(), value.clone());
            }
            if let Some(mode) = colormode {
                state.insert("colormode".to_string(), json!(mode));
            }
        });
        match patched {
            Ok(()) | Err(ApiError::CacheEmpty(_)) | Err(ApiError::CacheDetached(_)) => Ok(()),
            Err(error) => Err(error),
        }
    }
}
