//! Lazily materialized registries of bridge resources
//!
//! A [`ResourceList`] mirrors one bridge collection (`/lights`, `/groups`, ...)
//! through an [`ApiCache`] and builds a domain object for an id the first time
//! it is asked for. Objects are created by an explicit factory supplied at
//! construction.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use hue_api::reply::{self, check_error};
use hue_api::{ApiError, CommandDispatcher, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::cache::ApiCache;

/// Id type of a bridge resource, convertible to and from its JSON key
pub trait ResourceId: Clone + Ord + Default + fmt::Debug {
    fn to_key(&self) -> String;

    fn from_key(key: &str) -> Option<Self>;

    /// Normalize an id token that may arrive as a JSON number or string
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(key) => Self::from_key(key),
            Value::Number(number) => Self::from_key(&number.to_string()),
            _ => None,
        }
    }
}

impl ResourceId for i32 {
    fn to_key(&self) -> String {
        self.to_string()
    }

    fn from_key(key: &str) -> Option<Self> {
        key.parse().ok()
    }
}

impl ResourceId for String {
    fn to_key(&self) -> String {
        self.clone()
    }

    fn from_key(key: &str) -> Option<Self> {
        (!key.is_empty()).then(|| key.to_string())
    }
}

/// A domain object whose state lives in a cache node
pub trait CachedResource {
    fn state_cache(&self) -> &ApiCache;
}

/// Builds a resource from its id, its cached JSON, and its own cache node
pub type ResourceFactory<R, Id> = Box<dyn Fn(&Id, &Value, ApiCache) -> R + Send + Sync>;

/// Request body for creating a resource
pub trait CreateParams {
    fn request(&self) -> Value;
}

/// Map from id to materialized resource, backed by one cache node
pub struct ResourceList<R, Id: ResourceId> {
    commands: CommandDispatcher,
    cache: ApiCache,
    path: String,
    factory: ResourceFactory<R, Id>,
    resources: BTreeMap<Id, R>,
    pinned: BTreeSet<Id>,
}

impl<R, Id: ResourceId> fmt::Debug for ResourceList<R, Id> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceList")
            .field("path", &self.path)
            .field("materialized", &self.resources.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl<R: CachedResource, Id: ResourceId> ResourceList<R, Id> {
    /// Create a list that owns a root cache for `path`
    pub fn new<F>(commands: CommandDispatcher, path: impl Into<String>, refresh_interval: Duration, factory: F) -> Self
    where
        F: Fn(&Id, &Value, ApiCache) -> R + Send + Sync + 'static,
    {
        let path = path.into();
        let cache = ApiCache::root(path.clone(), commands.clone(), refresh_interval);
        Self::from_cache(commands, path, cache, Box::new(factory))
    }

    /// Create a list reading `key` of an existing cache node
    pub fn with_parent<F>(
        commands: CommandDispatcher,
        path: impl Into<String>,
        parent: &ApiCache,
        key: &str,
        factory: F,
    ) -> Self
    where
        F: Fn(&Id, &Value, ApiCache) -> R + Send + Sync + 'static,
    {
        Self::from_cache(commands, path.into(), parent.child(key), Box::new(factory))
    }

    fn from_cache(commands: CommandDispatcher, path: String, cache: ApiCache, factory: ResourceFactory<R, Id>) -> Self {
        Self {
            commands,
            cache,
            path,
            factory,
            resources: BTreeMap::new(),
            pinned: BTreeSet::new(),
        }
    }

    /// Collection path, e.g. `/lights`
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    pub fn commands(&self) -> &CommandDispatcher {
        &self.commands
    }

    /// Force a refresh of the backing cache
    pub fn refresh(&self) -> Result<()> {
        self.cache.refresh()
    }

    /// Whether a resource object has been built for `id`
    pub fn is_materialized(&self, id: &Id) -> bool {
        self.resources.contains_key(id)
    }

    /// All resources the bridge currently reports, in id order
    ///
    /// Missing entries are built; entries the bridge no longer reports are dropped.
    pub fn get_all(&mut self) -> Result<Vec<&mut R>> {
        let state = self.cache.get_value()?;
        let entries = state.as_object().ok_or_else(|| {
            ApiError::MalformedReply(format!("{} is not an object", self.cache.path()))
        })?;

        let pinned = &self.pinned;
        self.resources
            .retain(|id, _| pinned.contains(id) || entries.contains_key(id.to_key().as_str()));

        for (key, slice) in entries {
            let Some(id) = Id::from_key(key) else {
                warn!(path = %self.path, %key, "skipping resource with unparsable id");
                continue;
            };
            if !self.resources.contains_key(&id) {
                let resource = (self.factory)(&id, slice, self.cache.child(key.as_str()));
                self.resources.insert(id, resource);
            }
        }

        Ok(self.resources.values_mut().collect())
    }

    /// The resource with `id`, building it from the cache on first use
    ///
    /// An already built resource re-reads its own state (refreshing when
    /// stale); if the bridge stopped reporting it, it is dropped and
    /// `NotFound` is returned.
    pub fn get(&mut self, id: &Id) -> Result<&mut R> {
        if let Some(resource) = self.resources.get(id) {
            match resource.state_cache().get_value() {
                Ok(_) => {}
                Err(ApiError::NotFound(path)) if !self.pinned.contains(id) => {
                    self.resources.remove(id);
                    return Err(ApiError::NotFound(path));
                }
                Err(error) => return Err(error),
            }
        } else {
            let state = self.cache.get_value()?;
            let key = id.to_key();
            let slice = state
                .get(key.as_str())
                .ok_or_else(|| ApiError::NotFound(self.entry_path(id)))?;
            let resource = (self.factory)(id, slice, self.cache.child(key));
            self.resources.insert(id.clone(), resource);
        }

        self.entry_mut(id)
    }

    /// Whether the bridge reports `id`, refreshing the cache if stale
    pub fn exists(&self, id: &Id) -> Result<bool> {
        if self.pinned.contains(id) {
            return Ok(true);
        }
        Ok(self.cache.get_value()?.get(id.to_key().as_str()).is_some())
    }

    /// Whether `id` is known from the last cached snapshot; never performs I/O
    pub fn exists_cached(&self, id: &Id) -> Result<bool> {
        if self.pinned.contains(id) || self.resources.contains_key(id) {
            return Ok(true);
        }
        Ok(self.cache.peek_value()?.get(id.to_key().as_str()).is_some())
    }

    /// Delete `id` on the bridge
    ///
    /// Returns `false` when the bridge does not confirm the deletion.
    pub fn remove(&mut self, id: &Id) -> Result<bool> {
        let path = self.entry_path(id);
        let reply = self.commands.delete(&path, &json!({}))?;
        if !reply::is_deleted(&reply, &path) {
            debug!(%path, %reply, "bridge did not confirm deletion");
            return Ok(false);
        }

        self.resources.remove(id);
        self.pinned.remove(id);
        let key = id.to_key();
        let evicted = self.cache.update(|entries| {
            if let Some(entries) = entries.as_object_mut() {
                entries.remove(key.as_str());
            }
        });
        match evicted {
            Ok(()) | Err(ApiError::CacheEmpty(_)) | Err(ApiError::NotFound(_)) => Ok(true),
            Err(error) => Err(error),
        }
    }

    pub(crate) fn entry_path(&self, id: &Id) -> String {
        format!("{}/{}", self.path.trim_end_matches('/'), id.to_key())
    }

    pub(crate) fn entry_mut(&mut self, id: &Id) -> Result<&mut R> {
        let path = self.entry_path(id);
        self.resources.get_mut(id).ok_or(ApiError::NotFound(path))
    }

    pub(crate) fn construct(&self, id: &Id, state: &Value, cache: ApiCache) -> R {
        (self.factory)(id, state, cache)
    }

    /// Register a resource the bridge does not enumerate
    pub(crate) fn insert_pinned(&mut self, id: Id, resource: R) {
        self.pinned.insert(id.clone());
        self.resources.insert(id, resource);
    }
}

/// A [`ResourceList`] whose resources can be created on the bridge
pub struct CreateableResourceList<R, Id: ResourceId, P> {
    list: ResourceList<R, Id>,
    _params: PhantomData<fn(&P)>,
}

impl<R: CachedResource, Id: ResourceId, P: CreateParams> CreateableResourceList<R, Id, P> {
    pub fn new(list: ResourceList<R, Id>) -> Self {
        Self {
            list,
            _params: PhantomData,
        }
    }

    /// Create a resource and return its id
    ///
    /// Returns `Id::default()` (0 or an empty string) when the reply carries
    /// no usable id.
    pub fn create(&mut self, params: &P) -> Result<Id> {
        let path = self.list.path.clone();
        let reply = self.list.commands.post(&path, &params.request())?;
        check_error(&reply)?;

        let Some(token) = reply::created_id(&reply) else {
            warn!(%path, %reply, "create reply carried no id");
            return Ok(Id::default());
        };
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let token = match token {
            Value::String(raw) => Value::String(raw.strip_prefix(prefix.as_str()).unwrap_or(raw.as_str()).to_string()),
            other => other.clone(),
        };

        match Id::from_json(&token) {
            Some(id) => {
                self.list.refresh()?;
                debug!(%path, ?id, "created resource");
                Ok(id)
            }
            None => {
                warn!(%path, %token, "create reply carried an unusable id");
                Ok(Id::default())
            }
        }
    }
}

impl<R, Id: ResourceId, P> Deref for CreateableResourceList<R, Id, P> {
    type Target = ResourceList<R, Id>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl<R, Id: ResourceId, P> DerefMut for CreateableResourceList<R, Id, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}

/// Id of the virtual group containing every light
pub const ALL_LIGHTS_GROUP: i32 = 0;

/// Group registry with the virtual group 0 always present
///
/// The bridge never enumerates group 0, so it is served from its own root
/// cache at `<path>/0` instead of the collection snapshot.
pub struct GroupResourceList<R, P> {
    list: CreateableResourceList<R, i32, P>,
}

impl<R: CachedResource, P: CreateParams> GroupResourceList<R, P> {
    pub fn new(list: ResourceList<R, i32>) -> Self {
        Self {
            list: CreateableResourceList::new(list),
        }
    }

    pub fn get(&mut self, id: &i32) -> Result<&mut R> {
        if *id != ALL_LIGHTS_GROUP {
            return self.list.get(id);
        }

        if let Some(resource) = self.list.resources.get(id) {
            resource.state_cache().get_value()?;
        } else {
            let path = self.list.entry_path(id);
            let interval = self.list.cache().refresh_interval()?;
            let cache = ApiCache::root(path, self.list.commands().clone(), interval);
            let state = cache.get_value()?;
            let resource = self.list.construct(id, &state, cache);
            self.list.insert_pinned(*id, resource);
        }
        self.list.entry_mut(id)
    }

    pub fn exists(&self, id: &i32) -> Result<bool> {
        if *id == ALL_LIGHTS_GROUP {
            return Ok(true);
        }
        self.list.exists(id)
    }

    pub fn exists_cached(&self, id: &i32) -> Result<bool> {
        if *id == ALL_LIGHTS_GROUP {
            return Ok(true);
        }
        self.list.exists_cached(id)
    }
}

impl<R, P> Deref for GroupResourceList<R, P> {
    type Target = CreateableResourceList<R, i32, P>;

    fn deref(&self) -> &Self::Target {
        &self.list
    }
}

impl<R, P> DerefMut for GroupResourceList<R, P> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.list
    }
}
