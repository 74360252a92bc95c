//! Process-wide cache of resolved native bindings, keyed by driver type.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::debug;

use crate::bindings::BindingSet;
use crate::driver::DriverConnection;

static GLOBAL_REGISTRY: LazyLock<CapabilityRegistry> = LazyLock::new(CapabilityRegistry::new);

type Resolved = Box<dyn Any + Send + Sync>;

/// Resolves [`DriverConnection::native_bindings`] once per driver type and hands out the cached
/// set afterwards.
#[derive(Default)]
pub struct CapabilityRegistry {
    resolved: RwLock<HashMap<TypeId, Resolved>>,
}

impl CapabilityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by every [`crate::AdaptiveConnection::new`] call.
    #[must_use]
    pub fn global() -> &'static CapabilityRegistry {
        &GLOBAL_REGISTRY
    }

    /// Bindings for driver type `D`, resolving them on first use.
    #[must_use]
    pub fn bindings_for<D: DriverConnection>(&self) -> Arc<BindingSet<D>> {
        let key = TypeId::of::<D>();
        {
            let resolved = self.resolved.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(bindings) = resolved.get(&key).and_then(downcast::<D>) {
                return bindings;
            }
        }

        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have won the race between the two locks.
        if let Some(bindings) = resolved.get(&key).and_then(downcast::<D>) {
            return bindings;
        }
        let bindings = Arc::new(D::native_bindings());
        debug!(
            driver = std::any::type_name::<D>(),
            native = %bindings.capabilities(),
            "resolved driver capabilities"
        );
        resolved.insert(key, Box::new(Arc::clone(&bindings)));
        bindings
    }

    /// Whether driver type `D` has been resolved already.
    #[must_use]
    pub fn contains<D: DriverConnection>(&self) -> bool {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<D>())
    }

    /// Number of driver types resolved so far.
    #[must_use]
    pub fn resolved_types(&self) -> usize {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn downcast<D: DriverConnection>(entry: &Resolved) -> Option<Arc<BindingSet<D>>> {
    entry.downcast_ref::<Arc<BindingSet<D>>>().cloned()
}

impl std::fmt::Debug for CapabilityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityRegistry")
            .field("resolved_types", &self.resolved_types())
            .finish()
    }
}
