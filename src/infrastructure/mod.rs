//! Infrastructure layer - External concerns
//!
//! This layer contains:
//! - Container: The resolution service handlers and behaviors are looked up in
//! - Config: Configuration loading

pub mod config;
pub mod container;

pub use container::{
    Binding, Capability, HandledMessage, Resolver, ServiceCollection, ServiceLifetime,
    ServiceProvider,
};
