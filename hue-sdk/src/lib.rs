//! # Hue SDK
//!
//! Blocking client for Philips Hue bridges built around a local mirror of the
//! bridge state.
//!
//! ```rust,no_run
//! use hue_sdk::{Bridge, BridgeConfig};
//!
//! let mut bridge = Bridge::new(BridgeConfig::new("192.168.2.116").with_username("username"));
//!
//! // Reads are served from a cache refreshed at most every `refresh_interval`
//! let light = bridge.lights().get(&3)?;
//! println!("{} is on: {}", light.name()?, light.is_on()?);
//!
//! // Writes only send what differs from the cached state
//! light.transaction()?.set_brightness(200).set_color_temperature(370).commit()?;
//! # Ok::<(), hue_sdk::SdkError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! hue-sdk    (Bridge, Light, Group, Schedule, Scene, Sensor, BridgeConfig)
//!     ↓
//! hue-state  (ApiCache, ResourceList, StateTransaction)
//!     ↓
//! hue-api    (CommandDispatcher: rate limiting, retry, reply checks)
//!     ↓
//! http-client (HttpHandler, UreqHandler)
//! ```
//!
//! Set `HUE_LOG_MODE=development` and call [`init_logging_from_env`] to see
//! what the SDK sends.

pub use bridge::{Bridge, GroupList, LightList, SceneList, ScheduleList, LINK_BUTTON_NOT_PRESSED};
pub use config::BridgeConfig;
pub use error::{Result, SdkError};
pub use group::{CreateGroup, Group};
pub use light::Light;
pub use schedule::{CreateSchedule, Schedule, ScheduleCommand, ScheduleStatus};
pub use scene::{CreateScene, Scene, SceneType};
pub use sensor::{Alert, CreateSensor, Sensor, SensorList, DAYLIGHT_SENSOR_TYPE};

pub use hue_api::{ApiError, Clock, HttpHandler, Method, SystemClock};
pub use hue_state::{
    init_logging, init_logging_from_env, ApiCache, LoggingMode, StateTransaction, ALL_LIGHTS_GROUP,
    REFRESH_NEVER,
};

mod attributes;
mod bridge;
pub mod config;
mod error;
mod group;
mod light;
mod schedule;
mod scene;
mod sensor;
