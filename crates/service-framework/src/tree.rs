//! # Service Tree
//!
//! Parent/child bookkeeping and read-only query views over a service's
//! children.
//!
//! Children live in an insertion-ordered map keyed by service id, so
//! iteration order always equals attachment order; lifecycle propagation
//! relies on that. `attach` and `detach` are the only mutators of the
//! parent/child relationship, and both serialize on the parent's child
//! collection, so concurrent structural mutation cannot race a propagation
//! pass taking its snapshot.
//!
//! Detaching a service that is not a child is a reported error, not a
//! silent no-op.

use crate::error::ServiceError;
use crate::lifecycle::ServiceState;
use crate::service::{Service, ServiceHandle};

impl dyn Service {
    /// A point-in-time view of this service's children, in attachment
    /// order.
    pub fn services(&self) -> ServiceView {
        ServiceView {
            items: self.core().children.read().values().cloned().collect(),
        }
    }

    /// Attaches `child` at the end of this service's children.
    ///
    /// An already-attached child is first detached from its prior parent
    /// (including this one, in which case it moves to the end). The child's
    /// `on_attached` callback runs after the structural change.
    pub fn attach(&self, child: &ServiceHandle) -> Result<(), ServiceError> {
        if let Some(prior) = child.parent() {
            prior.detach(child)?;
        }

        {
            let mut children = self.core().children.write();
            children.insert(child.core().id().to_owned(), child.clone());
            *child.core().parent.write() = self.core().self_ref.read().clone();
        }
        child.on_attached(self);
        Ok(())
    }

    /// Detaches `child` from this service, failing with
    /// [`ServiceError::NotAttached`] when it is not a child. The child's
    /// `on_detached` callback runs after the structural change.
    pub fn detach(&self, child: &ServiceHandle) -> Result<(), ServiceError> {
        let removed = self
            .core()
            .children
            .write()
            .shift_remove(child.core().id());
        match removed {
            Some(_) => {
                let cleared: std::sync::Weak<dyn Service> =
                    std::sync::Weak::<crate::service::GenericService>::new();
                *child.core().parent.write() = cleared;
                child.on_detached(self);
                Ok(())
            }
            None => Err(ServiceError::NotAttached {
                service: child.core().name().to_owned(),
                parent: self.core().name().to_owned(),
            }),
        }
    }
}

/// Read-only, order-preserving view over a set of services.
///
/// Filters return new views, so queries chain:
/// `root.services().by_state(ServiceState::Running).first()`.
pub struct ServiceView {
    items: Vec<ServiceHandle>,
}

impl ServiceView {
    /// Every service in the view, in attachment order.
    pub fn all(self) -> Vec<ServiceHandle> {
        self.items
    }

    /// The earliest-attached service in the view, if any.
    pub fn first(&self) -> Option<ServiceHandle> {
        self.items.first().cloned()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ServiceHandle> {
        self.items.iter()
    }

    /// Keeps services currently in `state`.
    pub fn by_state(self, state: ServiceState) -> Self {
        self.by_func(move |s| s.state() == state)
    }

    /// Keeps services of the canonical type `fully_qualified_type`.
    pub fn by_type(self, fully_qualified_type: &str) -> Self {
        self.by_func(|s| s.core().fully_qualified_type() == fully_qualified_type)
    }

    /// Keeps services named `name`, case-insensitively.
    pub fn by_name(self, name: &str) -> Self {
        self.by_func(|s| s.core().name().eq_ignore_ascii_case(name))
    }

    /// Keeps services matching an arbitrary predicate.
    pub fn by_func(self, predicate: impl Fn(&dyn Service) -> bool) -> Self {
        Self {
            items: self
                .items
                .into_iter()
                .filter(|s| predicate(s.as_ref()))
                .collect(),
        }
    }
}

impl IntoIterator for ServiceView {
    type Item = ServiceHandle;
    type IntoIter = std::vec::IntoIter<ServiceHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
