//! # Dependency Resolution
//!
//! Converts a declared dependency into a live attached child, lazily and at
//! most once per service instance.
//!
//! A [`DependencySpec`] names the dependency and carries exactly one usable
//! type reference: an explicit [`ServiceType`], a canonical type-name
//! string, or a config key whose value holds that string. Resolution:
//!
//! 1. A child already attached under the dependency's name is returned
//!    as-is; access is memoized through the tree.
//! 2. The spec is reduced to a type reference (explicit type, type name, or
//!    config value).
//! 3. A string reference goes through the owning service's name resolver.
//! 4. An abstract result is narrowed to its single concrete implementation
//!    through the registry.
//! 5. The concrete type is constructed under the dependency's name,
//!    attached as a child of the requesting service, and returned.
//!
//! Declared dependencies are materialized during the owner's `init`
//! transition; the `dependency` accessor on a service handle runs the same
//! path for ad-hoc first access afterwards.

use crate::error::{DependencyError, ServiceError};
use crate::registry::ServiceType;
use crate::service::{Service, ServiceHandle};

/// Declaration of one service dependency.
#[derive(Clone)]
pub struct DependencySpec {
    name: String,
    explicit: Option<ServiceType>,
    type_name: Option<String>,
    config_key: Option<String>,
}

impl DependencySpec {
    /// Declares a dependency attached under `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            explicit: None,
            type_name: None,
            config_key: None,
        }
    }

    /// Resolves to this exact type, skipping name resolution.
    pub fn with_type(mut self, ty: ServiceType) -> Self {
        self.explicit = Some(ty);
        self
    }

    /// Resolves the canonical type name through the owner's resolver.
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    /// Reads the type name from the owner's configuration under
    /// `config_key`.
    pub fn with_config_key(mut self, config_key: impl Into<String>) -> Self {
        self.config_key = Some(config_key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl dyn Service {
    /// Returns the child materialized for the declared dependency `name`,
    /// resolving and attaching it on first access.
    pub fn dependency(&self, name: &str) -> Result<ServiceHandle, ServiceError> {
        if let Some(existing) = self.services().by_name(name).first() {
            return Ok(existing);
        }
        let spec = self
            .core()
            .dependency_spec(name)
            .ok_or_else(|| DependencyError::Undeclared(name.to_owned()))?
            .clone();
        materialize(self, &spec)
    }
}

/// Materializes every declared dependency of `service` that is not already
/// attached. Runs inside the `init` transition.
pub(crate) fn materialize_all(service: &dyn Service) -> Result<(), ServiceError> {
    for spec in service.core().dependencies().to_vec() {
        materialize(service, &spec)?;
    }
    Ok(())
}

fn materialize(service: &dyn Service, spec: &DependencySpec) -> Result<ServiceHandle, ServiceError> {
    if let Some(existing) = service.services().by_name(spec.name()).first() {
        return Ok(existing);
    }

    let ty = resolve_type(service, spec)?;
    let ty = if ty.is_abstract() {
        service
            .core()
            .registry()
            .resolve_concrete(ty.key())?
    } else {
        ty
    };

    let child = ty.construct(spec.name())?;
    service.attach(&child)?;
    Ok(child)
}

/// Reduces a spec to a registered type: explicit type wins, then the type
/// name, then the config value.
fn resolve_type(service: &dyn Service, spec: &DependencySpec) -> Result<ServiceType, DependencyError> {
    if let Some(ty) = &spec.explicit {
        return Ok(ty.clone());
    }

    let reference = match &spec.type_name {
        Some(type_name) => Some(type_name.clone()),
        None => spec
            .config_key
            .as_deref()
            .and_then(|key| service.core().config().get_str(key)),
    };
    let reference = reference.ok_or_else(|| DependencyError::Unresolvable(spec.name().to_owned()))?;

    Ok(service.core().resolver().resolve(&reference)?)
}
