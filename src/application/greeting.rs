//! Greeting use cases - the sample handlers the demo host serves

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use crate::application::behaviors::Validate;
use crate::application::errors::DispatchResult;
use crate::application::registry::HandlerCatalog;
use crate::domain::{
    ensure_active, Command, CommandHandler, Message, Query, QueryHandler, VoidCommand,
    VoidCommandHandler,
};

/// Longest greeting message accepted by validation, in characters
pub const MAX_MESSAGE_LEN: usize = 256;

fn validate_message(message: &str) -> Result<(), String> {
    let len = message.chars().count();
    if len > MAX_MESSAGE_LEN {
        return Err(format!(
            "message is {} characters, limit is {}",
            len, MAX_MESSAGE_LEN
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetCommand {
    pub message: String,
}

impl GreetCommand {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Message for GreetCommand {
    const NAME: &'static str = "GreetCommand";
}

impl Command for GreetCommand {
    type Result = String;
}

impl Validate for GreetCommand {
    fn validate(&self) -> Result<(), String> {
        validate_message(&self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GreetQuery {
    pub message: String,
}

impl GreetQuery {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Message for GreetQuery {
    const NAME: &'static str = "GreetQuery";
}

impl Query for GreetQuery {
    type Result = String;
}

impl Validate for GreetQuery {
    fn validate(&self) -> Result<(), String> {
        validate_message(&self.message)
    }
}

/// Says goodbye through the log; produces no result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FarewellCommand {
    pub message: String,
}

impl FarewellCommand {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Message for FarewellCommand {
    const NAME: &'static str = "FarewellCommand";
}

impl VoidCommand for FarewellCommand {}

impl Validate for FarewellCommand {
    fn validate(&self) -> Result<(), String> {
        validate_message(&self.message)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreetCommandHandler;

#[async_trait]
impl CommandHandler<GreetCommand> for GreetCommandHandler {
    async fn handle(&self, command: &GreetCommand, cancel: &CancellationToken) -> DispatchResult<String> {
        ensure_active(cancel)?;
        Ok(format!("Hello Command, {}!", command.message))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreetQueryHandler;

#[async_trait]
impl QueryHandler<GreetQuery> for GreetQueryHandler {
    async fn handle(&self, query: &GreetQuery, cancel: &CancellationToken) -> DispatchResult<String> {
        ensure_active(cancel)?;
        Ok(format!("Hello Query, {}!", query.message))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FarewellCommandHandler;

#[async_trait]
impl VoidCommandHandler<FarewellCommand> for FarewellCommandHandler {
    async fn handle(&self, command: &FarewellCommand, cancel: &CancellationToken) -> DispatchResult<()> {
        ensure_active(cancel)?;
        tracing::info!("Goodbye, {}!", command.message);
        Ok(())
    }
}

/// Catalog with every greeting handler
pub fn catalog() -> HandlerCatalog {
    HandlerCatalog::new("greeting")
        .command::<GreetCommand, GreetCommandHandler>()
        .query::<GreetQuery, GreetQueryHandler>()
        .void_command::<FarewellCommand, FarewellCommandHandler>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::errors::DispatchError;

    #[tokio::test]
    async fn test_command_handler_formats_greeting() {
        let reply = GreetCommandHandler
            .handle(&GreetCommand::new("Ada"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "Hello Command, Ada!");
    }

    #[tokio::test]
    async fn test_query_handler_formats_greeting() {
        let reply = GreetQueryHandler
            .handle(&GreetQuery::new("Grace"), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reply, "Hello Query, Grace!");
    }

    #[tokio::test]
    async fn test_handlers_observe_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = FarewellCommandHandler
            .handle(&FarewellCommand::new("Ada"), &cancel)
            .await;
        assert!(matches!(result, Err(DispatchError::Cancelled)));
    }

    #[test]
    fn test_message_length_limit() {
        assert!(GreetCommand::new("").validate().is_ok());
        assert!(GreetQuery::new("x".repeat(MAX_MESSAGE_LEN)).validate().is_ok());
        assert!(GreetQuery::new("x".repeat(MAX_MESSAGE_LEN + 1)).validate().is_err());
    }

    #[test]
    fn test_catalog_lists_all_handlers() {
        let catalog = catalog();
        assert_eq!(catalog.name(), "greeting");
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn test_command_deserializes_from_json_body() {
        let command: GreetCommand = serde_json::from_str(r#"{"message":"Ada"}"#).unwrap();
        assert_eq!(command, GreetCommand::new("Ada"));
    }
}
