//! Handler registry - Binds handler catalogs into the resolution service
//!
//! A [`HandlerCatalog`] is an explicit list of handler implementations, the
//! unit a module hands over at startup. [`HandlerRegistry::scan`] walks the
//! catalogs and registers one transient binding per handler capability.

use serde::{Deserialize, Serialize};
use std::any::{type_name, TypeId};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};
use crate::application::errors::{ConfigError, RegistryError};
use crate::application::mediator::Dispatcher;
use crate::domain::{
    Command, CommandHandler, Message, MessageKind, PipelineBehavior, Query, QueryHandler,
    VoidCommand, VoidCommandHandler,
};
use crate::infrastructure::container::{Binding, Capability, ServiceCollection};

/// What to do when a capability already has a different implementation bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Fail with [`RegistryError::DuplicateHandler`]
    #[default]
    Reject,
    /// Drop the earlier binding and keep the new one
    Replace,
}

impl FromStr for ConflictPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reject" => Ok(ConflictPolicy::Reject),
            "replace" => Ok(ConflictPolicy::Replace),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown conflict policy '{}', expected reject or replace",
                other
            ))),
        }
    }
}

type Install = Arc<dyn Fn(&mut ServiceCollection) + Send + Sync>;

struct HandlerEntry {
    message: TypeId,
    message_name: &'static str,
    kind: MessageKind,
    capability: TypeId,
    capability_name: &'static str,
    implementation: TypeId,
    implementation_name: &'static str,
    install: Install,
}

/// An explicit collection of handler implementations
pub struct HandlerCatalog {
    name: &'static str,
    entries: Vec<HandlerEntry>,
}

impl HandlerCatalog {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn command<C, H>(self) -> Self
    where
        C: Command,
        H: CommandHandler<C> + Default + 'static,
    {
        self.command_with::<C, H, _>(H::default)
    }

    pub fn command_with<C, H, F>(self, factory: F) -> Self
    where
        C: Command,
        H: CommandHandler<C> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.push::<C, dyn CommandHandler<C>, H, _>(MessageKind::Command, move || {
            Arc::new(factory()) as Arc<dyn CommandHandler<C>>
        })
    }

    pub fn void_command<C, H>(self) -> Self
    where
        C: VoidCommand,
        H: VoidCommandHandler<C> + Default + 'static,
    {
        self.void_command_with::<C, H, _>(H::default)
    }

    pub fn void_command_with<C, H, F>(self, factory: F) -> Self
    where
        C: VoidCommand,
        H: VoidCommandHandler<C> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.push::<C, dyn VoidCommandHandler<C>, H, _>(MessageKind::VoidCommand, move || {
            Arc::new(factory()) as Arc<dyn VoidCommandHandler<C>>
        })
    }

    pub fn query<Q, H>(self) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + Default + 'static,
    {
        self.query_with::<Q, H, _>(H::default)
    }

    pub fn query_with<Q, H, F>(self, factory: F) -> Self
    where
        Q: Query,
        H: QueryHandler<Q> + 'static,
        F: Fn() -> H + Send + Sync + 'static,
    {
        self.push::<Q, dyn QueryHandler<Q>, H, _>(MessageKind::Query, move || {
            Arc::new(factory()) as Arc<dyn QueryHandler<Q>>
        })
    }

    fn push<M, S, H, F>(mut self, kind: MessageKind, factory: F) -> Self
    where
        M: Message,
        S: ?Sized + Capability,
        H: 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        let factory = Arc::new(factory);
        let install: Install = Arc::new(move |services: &mut ServiceCollection| {
            let factory = Arc::clone(&factory);
            services.add_transient::<S, H, _>(move || (*factory)());
        });

        self.entries.push(HandlerEntry {
            message: TypeId::of::<M>(),
            message_name: M::NAME,
            kind,
            capability: TypeId::of::<S>(),
            capability_name: type_name::<S>(),
            implementation: TypeId::of::<H>(),
            implementation_name: type_name::<H>(),
            install,
        });
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for HandlerCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers: Vec<&str> = self.entries.iter().map(|e| e.implementation_name).collect();
        f.debug_struct("HandlerCatalog")
            .field("name", &self.name)
            .field("handlers", &handlers)
            .finish()
    }
}

/// Registry for handlers and behaviors, built once before dispatching
pub struct HandlerRegistry {
    services: ServiceCollection,
    policy: ConflictPolicy,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::with_services(ServiceCollection::new())
    }

    /// Start from a collection that may already hold other bindings
    pub fn with_services(services: ServiceCollection) -> Self {
        Self {
            services,
            policy: ConflictPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> ConflictPolicy {
        self.policy
    }

    /// Register every handler of every catalog.
    ///
    /// Rescanning a catalog is a no-op for bindings that already exist. Stops
    /// at the first conflict; bindings made before it are kept.
    pub fn scan(&mut self, catalogs: &[HandlerCatalog]) -> Result<&mut Self, RegistryError> {
        for catalog in catalogs {
            debug!("Scanning catalog '{}' ({} handlers)", catalog.name, catalog.len());
            for entry in &catalog.entries {
                self.bind(entry)?;
            }
        }
        Ok(self)
    }

    fn bind(&mut self, entry: &HandlerEntry) -> Result<(), RegistryError> {
        if let Some(existing) = self.services.message_kind(entry.message) {
            if existing != entry.kind {
                return Err(RegistryError::KindConflict {
                    message: entry.message_name,
                    existing,
                    requested: entry.kind,
                });
            }
        }

        if self.services.contains(entry.capability, entry.implementation) {
            return Ok(());
        }

        let existing = self
            .services
            .implementations(entry.capability)
            .next()
            .map(|b| b.implementation_name);

        if let Some(existing) = existing {
            match self.policy {
                ConflictPolicy::Reject => {
                    return Err(RegistryError::DuplicateHandler {
                        capability: entry.capability_name,
                        existing,
                        requested: entry.implementation_name,
                    });
                }
                ConflictPolicy::Replace => {
                    warn!(
                        "Replacing {} with {} for {}",
                        existing, entry.implementation_name, entry.message_name
                    );
                    self.services.remove(entry.capability);
                }
            }
        }

        (entry.install)(&mut self.services);
        info!(
            "Registered {} handler for {}: {}",
            entry.kind, entry.message_name, entry.implementation_name
        );
        Ok(())
    }

    /// Append a behavior around `C`; behaviors run in the order they are added
    pub fn command_behavior<C, B, F>(&mut self, factory: F) -> &mut Self
    where
        C: Command,
        B: PipelineBehavior<C, C::Result> + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.behavior::<C, C::Result, B, F>(factory)
    }

    pub fn void_command_behavior<C, B, F>(&mut self, factory: F) -> &mut Self
    where
        C: VoidCommand,
        B: PipelineBehavior<C> + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.behavior::<C, (), B, F>(factory)
    }

    pub fn query_behavior<Q, B, F>(&mut self, factory: F) -> &mut Self
    where
        Q: Query,
        B: PipelineBehavior<Q, Q::Result> + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        self.behavior::<Q, Q::Result, B, F>(factory)
    }

    fn behavior<M, R, B, F>(&mut self, factory: F) -> &mut Self
    where
        M: Message,
        R: Send + 'static,
        B: PipelineBehavior<M, R> + 'static,
        F: Fn() -> B + Send + Sync + 'static,
    {
        debug!("Adding behavior {} for {}", type_name::<B>(), M::NAME);
        self.services
            .add_transient::<dyn PipelineBehavior<M, R>, B, _>(move || {
                Arc::new(factory()) as Arc<dyn PipelineBehavior<M, R>>
            });
        self
    }

    pub fn services(&self) -> &ServiceCollection {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut ServiceCollection {
        &mut self.services
    }

    /// Snapshot of the binding table
    pub fn bindings(&self) -> Vec<Binding> {
        self.services.bindings()
    }

    pub fn into_services(self) -> ServiceCollection {
        self.services
    }

    /// Freeze the registrations and hand back a dispatcher over them
    pub fn build(self) -> Dispatcher {
        Dispatcher::new(Arc::new(self.services.build()))
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
