//! Hierarchical time-to-live cache of bridge state
//!
//! A root node owns a network fetch for one API path and refreshes it when its
//! refresh interval has elapsed. A child node is a view onto one key of its
//! parent's value; it never talks to the bridge itself and holds only a weak
//! back-pointer to the parent.
//!
//! ```text
//! root ""            GET /api/<user>
//!  ├── child "lights"      (/lights)
//!  │    └── child "3"       (/lights/3)
//!  └── child "groups"      (/groups)
//! ```

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use hue_api::reply::check_error;
use hue_api::{ApiError, CommandDispatcher, Result};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::debug;

/// Refresh interval meaning "only refresh when explicitly asked"
pub const REFRESH_NEVER: Duration = Duration::MAX;

/// Shared handle to one node of the cache tree
///
/// Cloning a handle shares the node; use [`ApiCache::child`] to create a view
/// onto a sub-key.
#[derive(Clone)]
pub struct ApiCache {
    node: Arc<CacheNode>,
}

enum CacheNode {
    Root(RootNode),
    Child(ChildNode),
}

struct RootNode {
    path: String,
    commands: CommandDispatcher,
    refresh_interval: Duration,
    state: Mutex<RootState>,
}

#[derive(Default)]
struct RootState {
    value: Option<Value>,
    last_refresh: Option<Instant>,
}

struct ChildNode {
    parent: Weak<CacheNode>,
    key: String,
    path: String,
}

impl std::fmt::Debug for ApiCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCache")
            .field("path", &self.path())
            .field("root", &self.is_root())
            .finish()
    }
}

impl ApiCache {
    /// Create a root node fetching `path` through `commands`
    pub fn root(path: impl Into<String>, commands: CommandDispatcher, refresh_interval: Duration) -> Self {
        Self {
            node: Arc::new(CacheNode::Root(RootNode {
                path: path.into(),
                commands,
                refresh_interval,
                state: Mutex::new(RootState::default()),
            })),
        }
    }

    /// Create a view onto `key` of this node's value
    pub fn child(&self, key: impl Into<String>) -> Self {
        let key = key.into();
        let path = format!("{}/{}", self.path().trim_end_matches('/'), key);
        Self {
            node: Arc::new(CacheNode::Child(ChildNode {
                parent: Arc::downgrade(&self.node),
                key,
                path,
            })),
        }
    }

    /// API path this node mirrors, relative to the user's API root
    pub fn path(&self) -> &str {
        match &*self.node {
            CacheNode::Root(root) => &root.path,
            CacheNode::Child(child) => &child.path,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(&*self.node, CacheNode::Root(_))
    }

    /// Fetch the root of this node's chain now, regardless of staleness
    pub fn refresh(&self) -> Result<()> {
        match &*self.node {
            CacheNode::Root(root) => root.refresh(),
            CacheNode::Child(child) => child.parent()?.refresh(),
        }
    }

    /// Whether the next [`get_value`](Self::get_value) will fetch
    pub fn needs_refresh(&self) -> Result<bool> {
        match &*self.node {
            CacheNode::Root(root) => Ok(root.needs_refresh()),
            CacheNode::Child(child) => child.parent()?.needs_refresh(),
        }
    }

    /// Current value, refreshing first if it is missing or stale
    pub fn get_value(&self) -> Result<Value> {
        match &*self.node {
            CacheNode::Root(root) => {
                if root.needs_refresh() {
                    root.refresh()?;
                }
                root.snapshot()
            }
            CacheNode::Child(child) => child.extract(child.parent()?.get_value()?),
        }
    }

    /// Last cached value without any network access
    ///
    /// Fails with [`ApiError::CacheEmpty`] when the root has never been fetched.
    pub fn peek_value(&self) -> Result<Value> {
        match &*self.node {
            CacheNode::Root(root) => root.snapshot(),
            CacheNode::Child(child) => child.extract(child.parent()?.peek_value()?),
        }
    }

    pub fn refresh_interval(&self) -> Result<Duration> {
        match &*self.node {
            CacheNode::Root(root) => Ok(root.refresh_interval),
            CacheNode::Child(child) => child.parent()?.refresh_interval(),
        }
    }

    /// Instant of the last successful fetch of this node's root
    pub fn last_refresh(&self) -> Result<Option<Instant>> {
        match &*self.node {
            CacheNode::Root(root) => Ok(root.state.lock().last_refresh),
            CacheNode::Child(child) => child.parent()?.last_refresh(),
        }
    }

    /// Dispatcher of the root this node resolves to
    pub fn commands(&self) -> Result<CommandDispatcher> {
        match &*self.node {
            CacheNode::Root(root) => Ok(root.commands.clone()),
            CacheNode::Child(child) => child.parent()?.commands(),
        }
    }

    /// Patch the cached value in place without contacting the bridge
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut Value),
    {
        let mut f = Some(f);
        self.update_with(&mut |value: &mut Value| {
            if let Some(f) = f.take() {
                f(value);
            }
            Ok(())
        })
    }

    fn update_with(&self, f: &mut dyn FnMut(&mut Value) -> Result<()>) -> Result<()> {
        match &*self.node {
            CacheNode::Root(root) => {
                let mut state = root.state.lock();
                let value = state
                    .value
                    .as_mut()
                    .ok_or_else(|| ApiError::CacheEmpty(root.path.clone()))?;
                f(value)
            }
            CacheNode::Child(child) => child.parent()?.update_with(&mut |value: &mut Value| {
                let slot = value
                    .get_mut(child.key.as_str())
                    .ok_or_else(|| ApiError::NotFound(child.path.clone()))?;
                f(slot)
            }),
        }
    }
}

impl RootNode {
    fn refresh(&self) -> Result<()> {
        debug!(path = %self.path, "refreshing cache");
        let value = self.commands.get(&self.path, &json!({}))?;
        check_error(&value)?;

        let fetched_at = self.commands.clock().now();
        let mut state = self.state.lock();
        state.value = Some(value);
        state.last_refresh = Some(fetched_at);
        Ok(())
    }

    fn needs_refresh(&self) -> bool {
        let state = self.state.lock();
        let last_refresh = match (&state.value, state.last_refresh) {
            (Some(_), Some(last_refresh)) => last_refresh,
            _ => return true,
        };
        if self.refresh_interval.is_zero() {
            return true;
        }
        // Instant + Duration::MAX overflows; an unrepresentable deadline never expires
        match last_refresh.checked_add(self.refresh_interval) {
            Some(deadline) => self.commands.clock().now() >= deadline,
            None => false,
        }
    }

    fn snapshot(&self) -> Result<Value> {
        self.state
            .lock()
            .value
            .clone()
            .ok_or_else(|| ApiError::CacheEmpty(self.path.clone()))
    }
}

impl ChildNode {
    fn parent(&self) -> Result<ApiCache> {
        self.parent
            .upgrade()
            .map(|node| ApiCache { node })
            .ok_or_else(|| ApiError::CacheDetached(self.path.clone()))
    }

    fn extract(&self, mut parent_value: Value) -> Result<Value> {
        parent_value
            .get_mut(self.key.as_str())
            .map(Value::take)
            .ok_or_else(|| ApiError::NotFound(self.path.clone()))
    }
}
