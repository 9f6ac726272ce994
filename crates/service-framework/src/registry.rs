//! # Type Registry
//!
//! Process-wide table resolving canonical type identifiers to constructible
//! service types. A canonical identifier is a `"<namespace>.<TypeName>"`
//! string, stable and unique per concrete type, e.g. `"sample.SqliteStore"`.
//!
//! Registration is an explicit bootstrap step: each concrete service type is
//! registered at process startup, typically right before the root service is
//! built. Registering under an existing key is an idempotent no-op that
//! returns the previously registered entry; first registration wins.
//!
//! The registry holds only [`ServiceType`] descriptors (key, abstractness,
//! implemented extension points, factory). It never owns or keeps alive any
//! runtime service instance; the service tree does that.
//!
//! Abstract entries are pure extension points: they carry no factory and are
//! never returned by concrete-type resolution. A concrete entry names the
//! abstract keys it implements, which is what
//! [`Registry::resolve_concrete`] scans for.

use std::sync::Arc;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::error::{DependencyError, RegistryError, ResolutionError};
use crate::service::ServiceHandle;

/// Factory constructing a New service instance with the given instance name.
pub type Factory = Arc<dyn Fn(&str) -> ServiceHandle + Send + Sync>;

/// Descriptor for a registered service type.
///
/// Cheap to clone; the registry hands copies out rather than references.
#[derive(Clone)]
pub struct ServiceType {
    key: &'static str,
    is_abstract: bool,
    implements: Vec<&'static str>,
    factory: Option<Factory>,
}

impl ServiceType {
    /// Declares a concrete, constructible type.
    pub fn concrete(
        key: &'static str,
        factory: impl Fn(&str) -> ServiceHandle + Send + Sync + 'static,
    ) -> Self {
        Self {
            key,
            is_abstract: false,
            implements: Vec::new(),
            factory: Some(Arc::new(factory)),
        }
    }

    /// Declares an abstract extension point. Abstract types are never
    /// instantiated and never returned by concrete resolution.
    pub fn abstract_type(key: &'static str) -> Self {
        Self {
            key,
            is_abstract: true,
            implements: Vec::new(),
            factory: None,
        }
    }

    /// Marks this type as an implementation of the abstract type `key`.
    pub fn implements(mut self, key: &'static str) -> Self {
        self.implements.push(key);
        self
    }

    /// The canonical `"<namespace>.<TypeName>"` identifier.
    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Whether this type is, or implements, the given key.
    pub fn implements_key(&self, key: &str) -> bool {
        self.key == key || self.implements.iter().any(|k| *k == key)
    }

    /// Constructs a New instance named `name`. Abstract types have nothing
    /// to construct and fail with [`DependencyError::NoImplementation`].
    pub fn construct(&self, name: &str) -> Result<ServiceHandle, DependencyError> {
        match &self.factory {
            Some(factory) => Ok(factory(name)),
            None => Err(DependencyError::NoImplementation(self.key.to_owned())),
        }
    }
}

impl std::fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceType")
            .field("key", &self.key)
            .field("is_abstract", &self.is_abstract)
            .field("implements", &self.implements)
            .finish()
    }
}

/// Resolves a type-name string to a registered type.
///
/// This is the seam between dependency resolution and whatever mechanism
/// actually locates types. The registry itself is the default resolver; a
/// custom resolver can consult extension sets or other registries, and
/// reports load failures with the explicit
/// [`ResolutionError::Dependency`] variant instead of leaving callers to
/// guess where the failure originated.
pub trait TypeResolver: Send + Sync {
    fn resolve(&self, name: &str) -> Result<ServiceType, ResolutionError>;
}

/// Lookup table from canonical type identifier to [`ServiceType`].
#[derive(Default)]
pub struct Registry {
    entries: RwLock<IndexMap<String, ServiceType>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ty` under its key. When the key is already taken this is
    /// a no-op; the returned entry is whichever registration won.
    pub fn register(&self, ty: ServiceType) -> ServiceType {
        let mut entries = self.entries.write();
        entries.entry(ty.key().to_owned()).or_insert(ty).clone()
    }

    /// Removes and returns the entry under `key`.
    pub fn deregister(&self, key: &str) -> Result<ServiceType, RegistryError> {
        self.entries
            .write()
            .shift_remove(key)
            .ok_or_else(|| RegistryError::NotRegistered(key.to_owned()))
    }

    pub fn get(&self, key: &str) -> Option<ServiceType> {
        self.entries.read().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every concrete registered type implementing the abstract type `key`,
    /// in registration order.
    pub fn concrete_types(&self, key: &str) -> Vec<ServiceType> {
        self.entries
            .read()
            .values()
            .filter(|ty| !ty.is_abstract() && ty.implements_key(key))
            .cloned()
            .collect()
    }

    /// Resolves the abstract type `key` to its single concrete
    /// implementation.
    ///
    /// Zero implementations fail with
    /// [`DependencyError::NoImplementation`]; more than one fail with
    /// [`DependencyError::Ambiguous`] rather than silently picking the
    /// first registration.
    pub fn resolve_concrete(&self, key: &str) -> Result<ServiceType, DependencyError> {
        let mut candidates = self.concrete_types(key);
        match candidates.len() {
            0 => Err(DependencyError::NoImplementation(key.to_owned())),
            1 => Ok(candidates.remove(0)),
            _ => Err(DependencyError::Ambiguous {
                key: key.to_owned(),
                candidates: candidates.iter().map(|ty| ty.key().to_owned()).collect(),
            }),
        }
    }
}

impl TypeResolver for Registry {
    fn resolve(&self, name: &str) -> Result<ServiceType, ResolutionError> {
        self.get(name)
            .ok_or_else(|| ResolutionError::NotFound(name.to_owned()))
    }
}

static GLOBAL: Lazy<Arc<Registry>> = Lazy::new(|| Arc::new(Registry::new()));

/// The process-wide registry shared by every service that does not carry
/// its own.
pub fn global() -> Arc<Registry> {
    GLOBAL.clone()
}
