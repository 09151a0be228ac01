//! Domain layer - Contracts with no knowledge of how they are wired
//!
//! This layer contains:
//! - Messages: Command, VoidCommand and Query markers
//! - Handlers: One handler capability per message kind
//! - Behaviors: Pipeline interceptors and the `Next` continuation

pub mod behavior;
pub mod handler;
pub mod message;

pub use behavior::{ensure_active, Next, PipelineBehavior};
pub use handler::{CommandHandler, QueryHandler, VoidCommandHandler};
pub use message::{Command, Message, MessageKind, Query, VoidCommand};
