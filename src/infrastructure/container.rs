//! Resolution service - TypeId-keyed factories for handlers and behaviors
//!
//! Capabilities are trait objects such as `dyn CommandHandler<C>`. Each
//! registration stores a factory for one concrete implementation behind
//! `Box<dyn Any>`, keyed by the capability's `TypeId`.
//!
//! Registration happens on a [`ServiceCollection`] during setup. Calling
//! [`ServiceCollection::build`] freezes it into a [`ServiceProvider`] that
//! can be shared across tasks without locking.

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use crate::domain::{
    Command, CommandHandler, Message, MessageKind, PipelineBehavior, Query, QueryHandler,
    VoidCommand, VoidCommandHandler,
};

type Factory<S> = Arc<dyn Fn() -> Arc<S> + Send + Sync>;

/// Lookup contract the dispatcher resolves handlers and behaviors through
pub trait Resolver: Send + Sync + 'static {
    /// Most recently registered implementation of capability `S`
    fn resolve<S: ?Sized + 'static>(&self) -> Option<Arc<S>>;

    /// Every implementation of capability `S`, in registration order
    fn resolve_all<S: ?Sized + 'static>(&self) -> Vec<Arc<S>>;
}

/// Something that can be bound in a [`ServiceCollection`].
///
/// Handler capabilities report the message they serve so every binding
/// carries its message kind. Other services keep the default.
pub trait Capability: 'static {
    fn handled_message() -> Option<HandledMessage> {
        None
    }
}

/// Message type and kind a handler binding serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandledMessage {
    pub message: TypeId,
    pub message_name: &'static str,
    pub kind: MessageKind,
}

impl HandledMessage {
    fn of<M: Message>(kind: MessageKind) -> Option<Self> {
        Some(Self {
            message: TypeId::of::<M>(),
            message_name: M::NAME,
            kind,
        })
    }
}

impl<C: Command> Capability for dyn CommandHandler<C> {
    fn handled_message() -> Option<HandledMessage> {
        HandledMessage::of::<C>(MessageKind::Command)
    }
}

impl<C: VoidCommand> Capability for dyn VoidCommandHandler<C> {
    fn handled_message() -> Option<HandledMessage> {
        HandledMessage::of::<C>(MessageKind::VoidCommand)
    }
}

impl<Q: Query> Capability for dyn QueryHandler<Q> {
    fn handled_message() -> Option<HandledMessage> {
        HandledMessage::of::<Q>(MessageKind::Query)
    }
}

impl<M: Message, R: Send + 'static> Capability for dyn PipelineBehavior<M, R> {}

/// How often a registration's factory builds a new instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceLifetime {
    /// New instance per resolution
    Transient,
    /// One shared instance
    Singleton,
}

/// One row of the binding table: capability -> implementation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binding {
    pub capability: TypeId,
    pub capability_name: &'static str,
    pub implementation: TypeId,
    pub implementation_name: &'static str,
    pub lifetime: ServiceLifetime,
    /// Set for handler capabilities only
    pub handles: Option<HandledMessage>,
}

impl Binding {
    fn of<S: ?Sized + Capability, T: ?Sized + 'static>(lifetime: ServiceLifetime) -> Self {
        Self {
            capability: TypeId::of::<S>(),
            capability_name: type_name::<S>(),
            implementation: TypeId::of::<T>(),
            implementation_name: type_name::<T>(),
            lifetime,
            handles: S::handled_message(),
        }
    }
}

struct Registration {
    binding: Binding,
    factory: Box<dyn Any + Send + Sync>,
}

impl Registration {
    fn instantiate<S: ?Sized + 'static>(&self) -> Option<Arc<S>> {
        self.factory
            .downcast_ref::<Factory<S>>()
            .map(|factory| factory())
    }
}

/// Mutable registration table used during setup
#[derive(Default)]
pub struct ServiceCollection {
    registrations: Vec<Registration>,
}

impl ServiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind capability `S` to implementation `T`, building a new instance per resolution
    pub fn add_transient<S, T, F>(&mut self, factory: F) -> &mut Self
    where
        S: ?Sized + Capability,
        T: 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        let factory: Factory<S> = Arc::new(factory);
        self.push::<S, T>(ServiceLifetime::Transient, factory)
    }

    /// Bind capability `S` to a shared instance of implementation `T`
    pub fn add_singleton<S, T>(&mut self, instance: Arc<S>) -> &mut Self
    where
        S: ?Sized + Capability + Send + Sync,
        T: 'static,
    {
        let factory: Factory<S> = Arc::new(move || Arc::clone(&instance));
        self.push::<S, T>(ServiceLifetime::Singleton, factory)
    }

    fn push<S: ?Sized + Capability, T: 'static>(
        &mut self,
        lifetime: ServiceLifetime,
        factory: Factory<S>,
    ) -> &mut Self {
        self.registrations.push(Registration {
            binding: Binding::of::<S, T>(lifetime),
            factory: Box::new(factory),
        });
        self
    }

    /// Check if `implementation` is already bound to `capability`
    pub fn contains(&self, capability: TypeId, implementation: TypeId) -> bool {
        self.registrations.iter().any(|r| {
            r.binding.capability == capability && r.binding.implementation == implementation
        })
    }

    /// Bindings registered for a capability, in registration order
    pub fn implementations(&self, capability: TypeId) -> impl Iterator<Item = &Binding> {
        self.registrations
            .iter()
            .map(|r| &r.binding)
            .filter(move |b| b.capability == capability)
    }

    /// Kind of the first handler binding serving `message`, if any
    pub fn message_kind(&self, message: TypeId) -> Option<MessageKind> {
        self.registrations
            .iter()
            .filter_map(|r| r.binding.handles)
            .find(|h| h.message == message)
            .map(|h| h.kind)
    }

    /// Drop every binding for a capability, returning how many were removed
    pub fn remove(&mut self, capability: TypeId) -> usize {
        let before = self.registrations.len();
        self.registrations
            .retain(|r| r.binding.capability != capability);
        before - self.registrations.len()
    }

    /// Snapshot of the binding table in registration order
    pub fn bindings(&self) -> Vec<Binding> {
        self.registrations.iter().map(|r| r.binding.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Freeze the table into a shareable provider
    pub fn build(self) -> ServiceProvider {
        let mut bindings = Vec::with_capacity(self.registrations.len());
        let mut services: HashMap<TypeId, Vec<Registration>> = HashMap::new();

        for registration in self.registrations {
            bindings.push(registration.binding.clone());
            services
                .entry(registration.binding.capability)
                .or_default()
                .push(registration);
        }

        ServiceProvider { services, bindings }
    }
}

impl fmt::Debug for ServiceCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceCollection")
            .field("bindings", &self.bindings())
            .finish()
    }
}

/// Frozen registration table; the default [`Resolver`]
pub struct ServiceProvider {
    services: HashMap<TypeId, Vec<Registration>>,
    bindings: Vec<Binding>,
}

impl ServiceProvider {
    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }
}

impl Resolver for ServiceProvider {
    fn resolve<S: ?Sized + 'static>(&self) -> Option<Arc<S>> {
        self.services
            .get(&TypeId::of::<S>())?
            .last()
            .and_then(|r| r.instantiate::<S>())
    }

    fn resolve_all<S: ?Sized + 'static>(&self) -> Vec<Arc<S>> {
        self.services
            .get(&TypeId::of::<S>())
            .map(|registrations| {
                registrations
                    .iter()
                    .filter_map(|r| r.instantiate::<S>())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Debug for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceProvider")
            .field("bindings", &self.bindings)
            .finish()
    }
}
