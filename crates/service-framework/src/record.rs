//! # Service Records
//!
//! A [`ServiceRecord`] is a serializable snapshot of a service subtree:
//! identity, configuration, attributes, and children in attachment order.
//! Records rebuild through registry factories, so a recorded tree can be
//! reconstructed in a fresh process that registered the same types.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Value;
use crate::error::ServiceError;
use crate::registry::Registry;
use crate::service::{Service, ServiceHandle};

/// Serializable snapshot of one service and its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceRecord {
    pub id: String,
    pub name: String,
    pub fully_qualified_type: String,
    #[serde(default)]
    pub config: IndexMap<String, Value>,
    #[serde(default)]
    pub attributes: IndexMap<String, Value>,
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
}

impl dyn Service {
    /// Snapshots this service and its children, in attachment order.
    pub fn to_record(&self) -> ServiceRecord {
        let core = self.core();
        ServiceRecord {
            id: core.id().to_owned(),
            name: core.name().to_owned(),
            fully_qualified_type: core.fully_qualified_type().to_owned(),
            config: core.config().snapshot(),
            attributes: core.attributes().snapshot(),
            services: self.services().iter().map(|c| c.to_record()).collect(),
        }
    }
}

impl ServiceRecord {
    /// Rebuilds the recorded subtree through `registry` factories. The
    /// rebuilt services are New; recorded config and attributes are applied
    /// on top of each type's defaults. Instance ids are freshly assigned.
    pub fn build(&self, registry: &Registry) -> Result<ServiceHandle, ServiceError> {
        let ty = registry
            .get(&self.fully_qualified_type)
            .ok_or_else(|| crate::error::RegistryError::NotRegistered(self.fully_qualified_type.clone()))?;
        let service = ty.construct(&self.name)?;

        for (key, value) in &self.config {
            service.core().config().set(key, value.clone());
        }
        for (key, value) in &self.attributes {
            service.core().attributes().set(key, value.clone());
        }
        for record in &self.services {
            let child = record.build(registry)?;
            service.attach(&child)?;
        }
        Ok(service)
    }
}
