//! Application layer - Dispatching and registration
//!
//! This layer contains:
//! - Mediator: The dispatcher and its pipeline composition
//! - Registry: Handler catalogs and behavior registration
//! - Behaviors: Ready-made pipeline behaviors
//! - Greeting: Sample use cases served by the demo host
//! - Errors: Dispatch, registry and config errors

pub mod behaviors;
pub mod errors;
pub mod greeting;
pub mod mediator;
pub mod registry;
