//! mediator-lite - an in-process CQRS mediator
//!
//! Commands and queries are routed to exactly one registered handler, wrapped
//! in any pipeline behaviors registered for the same message type.
//!
//! ```ignore
//! let mut registry = HandlerRegistry::new();
//! registry
//!     .scan(&[greeting::catalog()])?
//!     .command_behavior::<GreetCommand, _, _>(|| LoggingBehavior);
//! let mediator = registry.build();
//!
//! let reply = mediator
//!     .send_command(GreetCommand::new("Ada"), &CancellationToken::new())
//!     .await?;
//! assert_eq!(reply, "Hello Command, Ada!");
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::behaviors::{CancellationGuard, LoggingBehavior, Validate, ValidationBehavior};
pub use application::errors::{BoxError, ConfigError, DispatchError, DispatchResult, RegistryError};
pub use application::mediator::{Dispatcher, Mediator};
pub use application::registry::{ConflictPolicy, HandlerCatalog, HandlerRegistry};
pub use domain::{
    ensure_active, Command, CommandHandler, Message, MessageKind, Next, PipelineBehavior, Query,
    QueryHandler, VoidCommand, VoidCommandHandler,
};
pub use infrastructure::config::Config;
pub use infrastructure::container::{
    Binding, Capability, HandledMessage, Resolver, ServiceCollection, ServiceLifetime,
    ServiceProvider,
};
pub use tokio_util::sync::CancellationToken;
