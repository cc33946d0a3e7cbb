//! Per-call context: caller-supplied values carried on a [`Request`](crate::http::Request).
//!
//! The pipeline never inspects the context; it only hands it to hooks
//! unchanged, so a hook can read an auth token or a trace id that the caller
//! attached for this logical unit of work.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    sync::Arc,
};

/// Type-erased map of shared values, keyed by type.
///
/// Values are stored behind [`Arc`] so a request (and every error that
/// captures it) can be cloned cheaply.
///
/// # Examples
///
/// ```
/// use httpsource::context::Extensions;
///
/// #[derive(Debug, PartialEq)]
/// struct TenantId(u32);
///
/// let mut ext = Extensions::new();
/// ext.insert(TenantId(7));
/// assert_eq!(ext.get::<TenantId>(), Some(&TenantId(7)));
/// assert!(ext.get::<String>().is_none());
/// ```
#[derive(Default, Clone)]
pub struct Extensions {
    map: HashMap<TypeId, Arc<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Create a new empty extensions map
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    /// Insert a value, replacing any previous value of the same type
    pub fn insert<T>(&mut self, value: T)
    where
        T: Send + Sync + 'static,
    {
        self.map.insert(TypeId::of::<T>(), Arc::new(value));
    }

    /// Get a value from the extensions map
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|value| value.downcast_ref::<T>())
    }

    /// Remove a value, returning `true` if one was present
    pub fn remove<T>(&mut self) -> bool
    where
        T: Send + Sync + 'static,
    {
        self.map.remove(&TypeId::of::<T>()).is_some()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.map.len())
            .finish()
    }
}
