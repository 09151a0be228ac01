//! Message contracts - Commands and queries routed by the mediator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Base trait for everything the mediator can dispatch.
pub trait Message: Send + Sync + 'static {
    /// Stable message name used in logs and errors
    const NAME: &'static str;
}

/// A command that changes state and produces a result.
pub trait Command: Message {
    type Result: Send + 'static;
}

/// A command that changes state and produces no result.
pub trait VoidCommand: Message {}

/// A read-only request that always produces a result.
pub trait Query: Message {
    type Result: Send + 'static;
}

/// Runtime tag for the kind a message type was registered under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Command,
    VoidCommand,
    Query,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Command => write!(f, "command"),
            MessageKind::VoidCommand => write!(f, "void command"),
            MessageKind::Query => write!(f, "query"),
        }
    }
}
