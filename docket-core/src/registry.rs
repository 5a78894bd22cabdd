//! The controller registry.
//!
//! Holds one [`ControllerDef`] per controller type. Applications create a
//! registry, declare their controllers into it and pass it to the
//! materializers; nothing is stored in process-wide state.
//!
//! Changing metadata after materialization is not supported: routers and
//! documents already produced keep the definitions they were built from, and
//! only later materializations see a redeclared controller.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::controller::{Controller, ControllerDef};
use crate::meta::RouteDoc;

/// Metadata of every declared controller, keyed by controller type.
#[derive(Default)]
pub struct ControllerRegistry {
    definitions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl ControllerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the definition of `C`, replacing any earlier one.
    pub fn declare<C: Send + Sync + 'static>(&mut self, def: ControllerDef<C>) -> &mut Self {
        let name = def.name();
        let routes = def.methods().count();
        if self.definitions.insert(TypeId::of::<C>(), Box::new(def)).is_some() {
            debug!(controller = name, "controller re-declared, previous definition replaced");
        } else {
            debug!(controller = name, methods = routes, "controller declared");
        }
        self
    }

    /// Declare `C` from its [`Controller::declare`] implementation.
    pub fn register<C: Controller>(&mut self) -> &mut Self {
        self.declare(C::declare())
    }

    pub fn definition<C: Send + Sync + 'static>(&self) -> Option<&ControllerDef<C>> {
        self.definitions
            .get(&TypeId::of::<C>())
            .and_then(|def| def.downcast_ref::<ControllerDef<C>>())
    }

    pub fn contains<C: Send + Sync + 'static>(&self) -> bool {
        self.definitions.contains_key(&TypeId::of::<C>())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Resolved routes of `C` under `mount`, without handlers.
    ///
    /// An undeclared controller describes no routes.
    pub fn describe<C: Send + Sync + 'static>(&self, mount: &str) -> Vec<RouteDoc> {
        match self.definition::<C>() {
            Some(def) => def.describe(mount),
            None => {
                warn!(
                    controller = std::any::type_name::<C>(),
                    "describing a controller that was never declared"
                );
                Vec::new()
            }
        }
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerRegistry")
            .field("controllers", &self.definitions.len())
            .finish()
    }
}
