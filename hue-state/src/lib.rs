//! # Hue State
//!
//! Cached bridge state for the Hue SDK.
//!
//! - [`ApiCache`]: tree of time-to-live caches; only roots fetch from the bridge
//! - [`ResourceList`], [`CreateableResourceList`], [`GroupResourceList`]:
//!   lazily built registries of lights, groups, schedules and scenes
//! - [`StateTransaction`]: diff-based writes to a light or group state
//!
//! Most applications use these through `hue_sdk::Bridge`.

pub mod cache;
pub mod logging;
pub mod resource_list;
pub mod transaction;

pub use cache::{ApiCache, REFRESH_NEVER};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use resource_list::{
    CachedResource, CreateParams, CreateableResourceList, GroupResourceList, ResourceFactory,
    ResourceId, ResourceList, ALL_LIGHTS_GROUP,
};
pub use transaction::{StateTransaction, DEFAULT_TRANSITION};
