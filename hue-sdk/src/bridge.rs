//! The bridge facade
//!
//! A [`Bridge`] owns one dispatcher and one cache of the bridge's full state
//! (`GET /api/<user>`). The lights, groups, schedules, scenes and sensors lists read
//! their sections of that cache, so a single request refreshes all of them.

use std::sync::Arc;

use http_client::UreqHandler;
use hue_api::reply::{check_error, success_value};
use hue_api::{ApiError, Clock, CommandDispatcher, HttpHandler, SystemClock};
use hue_state::{ApiCache, CreateableResourceList, GroupResourceList, ResourceList};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::attributes::string_at;
use crate::config::BridgeConfig;
use crate::error::{Result, SdkError};
use crate::group::{CreateGroup, Group};
use crate::light::Light;
use crate::schedule::{CreateSchedule, Schedule};
use crate::scene::{CreateScene, Scene};
use crate::sensor::{Sensor, SensorList};

/// Bridge error code for "link button not pressed"
pub const LINK_BUTTON_NOT_PRESSED: i64 = 101;

pub type LightList = ResourceList<Light, i32>;
pub type GroupList = GroupResourceList<Group, CreateGroup>;
pub type ScheduleList = CreateableResourceList<Schedule, i32, CreateSchedule>;
pub type SceneList = CreateableResourceList<Scene, String, CreateScene>;

struct Tree {
    commands: CommandDispatcher,
    state: ApiCache,
    lights: LightList,
    groups: GroupList,
    schedules: ScheduleList,
    scenes: SceneList,
    sensors: SensorList,
}

impl Tree {
    fn build(config: &BridgeConfig, handler: Arc<dyn HttpHandler>, clock: Arc<dyn Clock>) -> Self {
        let commands = CommandDispatcher::with_clock(
            config.address.clone(),
            config.port,
            config.username.clone(),
            handler,
            clock,
            config.min_delay,
        );
        let state = ApiCache::root("", commands.clone(), config.refresh_interval);

        let lights = ResourceList::with_parent(
            commands.clone(),
            "/lights",
            &state,
            "lights",
            factory(&commands, |id: &i32, cache, commands| Light::new(*id, cache, commands)),
        );
        let groups = ResourceList::with_parent(
            commands.clone(),
            "/groups",
            &state,
            "groups",
            factory(&commands, |id: &i32, cache, commands| Group::new(*id, cache, commands)),
        );
        let schedules = ResourceList::with_parent(
            commands.clone(),
            "/schedules",
            &state,
            "schedules",
            factory(&commands, |id: &i32, cache, commands| Schedule::new(*id, cache, commands)),
        );
        let scenes = ResourceList::with_parent(
            commands.clone(),
            "/scenes",
            &state,
            "scenes",
            factory(&commands, |id: &String, cache, commands| Scene::new(id.clone(), cache, commands)),
        );
        let sensors = ResourceList::with_parent(
            commands.clone(),
            "/sensors",
            &state,
            "sensors",
            factory(&commands, |id: &i32, cache, commands| Sensor::new(*id, cache, commands)),
        );

        Self {
            commands,
            state,
            lights,
            groups: GroupResourceList::new(groups),
            schedules: CreateableResourceList::new(schedules),
            scenes: CreateableResourceList::new(scenes),
            sensors: SensorList::new(CreateableResourceList::new(sensors)),
        }
    }
}

/// Adapt a resource constructor to the list factory signature
fn factory<Id: 'static, R: 'static>(
    commands: &CommandDispatcher,
    build: fn(&Id, ApiCache, CommandDispatcher) -> R,
) -> impl Fn(&Id, &Value, ApiCache) -> R + Send + Sync + 'static {
    let commands = commands.clone();
    move |id, _, cache| build(id, cache, commands.clone())
}

/// Connection to one Hue bridge
///
/// # Example
///
/// ```rust,no_run
/// use hue_sdk::{Bridge, BridgeConfig};
///
/// let mut bridge = Bridge::new(BridgeConfig::load()?);
/// for light in bridge.lights().get_all()? {
///     println!("{}: {}", light.id(), light.name()?);
/// }
/// # Ok::<(), hue_sdk::SdkError>(())
/// ```
pub struct Bridge {
    config: BridgeConfig,
    handler: Arc<dyn HttpHandler>,
    clock: Arc<dyn Clock>,
    tree: Tree,
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("address", &self.config.address)
            .field("port", &self.config.port)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    /// Connect over HTTP with the system clock
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_handler(config, Arc::new(UreqHandler::new()))
    }

    pub fn with_handler(config: BridgeConfig, handler: Arc<dyn HttpHandler>) -> Self {
        Self::with_clock(config, handler, Arc::new(SystemClock))
    }

    pub fn with_clock(config: BridgeConfig, handler: Arc<dyn HttpHandler>, clock: Arc<dyn Clock>) -> Self {
        let tree = Tree::build(&config, Arc::clone(&handler), Arc::clone(&clock));
        info!(address = %config.address, port = config.port, "bridge handle created");
        Self {
            config,
            handler,
            clock,
            tree,
        }
    }

    fn rebuild(&mut self) {
        self.tree = Tree::build(&self.config, Arc::clone(&self.handler), Arc::clone(&self.clock));
        debug!(address = %self.config.address, "rebuilt bridge state tree");
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn address(&self) -> &str {
        &self.config.address
    }

    pub fn port(&self) -> u16 {
        self.config.port
    }

    pub fn username(&self) -> &str {
        &self.config.username
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.tree.commands
    }

    /// Cache of the bridge's full state
    pub fn state(&self) -> &ApiCache {
        &self.tree.state
    }

    /// Fetch the full bridge state now
    pub fn refresh(&self) -> Result<()> {
        Ok(self.tree.state.refresh()?)
    }

    fn bridge_config(&self) -> Result<Value> {
        Ok(self.tree.state.child("config").get_value()?)
    }

    pub fn name(&self) -> Result<String> {
        Ok(string_at(&self.bridge_config()?, "/name"))
    }

    pub fn api_version(&self) -> Result<String> {
        Ok(string_at(&self.bridge_config()?, "/apiversion"))
    }

    pub fn lights(&mut self) -> &mut LightList {
        &mut self.tree.lights
    }

    pub fn groups(&mut self) -> &mut GroupList {
        &mut self.tree.groups
    }

    pub fn schedules(&mut self) -> &mut ScheduleList {
        &mut self.tree.schedules
    }

    pub fn scenes(&mut self) -> &mut SceneList {
        &mut self.tree.scenes
    }

    pub fn sensors(&mut self) -> &mut SensorList {
        &mut self.tree.sensors
    }

    /// Replace the transport; all cached state and resources are dropped
    pub fn set_http_handler(&mut self, handler: Arc<dyn HttpHandler>) {
        self.handler = handler;
        self.rebuild();
    }

    /// Switch credentials; all cached state and resources are dropped
    pub fn set_username(&mut self, username: impl Into<String>) {
        self.config.username = username.into();
        self.rebuild();
    }

    /// Pair with the bridge and adopt the new username
    ///
    /// The link button on the bridge must be pressed within
    /// `config.pairing_timeout`. Until then the bridge answers with error 101
    /// and the request is repeated every `config.pairing_interval`.
    pub fn request_username(&mut self) -> Result<String> {
        let pairing = self.tree.commands.with_username("");
        let body = json!({"devicetype": self.config.device_type});
        let started = self.clock.now();

        info!(address = %self.config.address, "press the link button on the bridge");
        loop {
            let reply = pairing.post("", &body)?;
            match check_error(&reply) {
                Ok(()) => {
                    let username = success_value(&reply, "username")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .ok_or_else(|| {
                            ApiError::MalformedReply(format!("pairing reply without username: {reply}"))
                        })?;
                    info!(address = %self.config.address, "paired with bridge");
                    self.set_username(username.clone());
                    return Ok(username);
                }
                Err(error) if error.api_code() == Some(LINK_BUTTON_NOT_PRESSED) => {
                    let waited = self.clock.now().saturating_duration_since(started);
                    if waited >= self.config.pairing_timeout {
                        return Err(SdkError::LinkButtonTimeout(self.config.pairing_timeout));
                    }
                    debug!(?waited, "link button not pressed yet");
                    self.clock.sleep_for(self.config.pairing_interval);
                }
                Err(error) => return Err(error.into()),
            }
        }
    }
}
