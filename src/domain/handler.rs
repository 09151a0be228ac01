use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use crate::application::errors::DispatchResult;
use super::message::{Command, Query, VoidCommand};

/// Handles one command type and returns its result
#[async_trait]
pub trait CommandHandler<C: Command>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken) -> DispatchResult<C::Result>;
}

/// Handles one command type that produces no result
#[async_trait]
pub trait VoidCommandHandler<C: VoidCommand>: Send + Sync {
    async fn handle(&self, command: &C, cancel: &CancellationToken) -> DispatchResult<()>;
}

/// Handles one query type and returns its result
#[async_trait]
pub trait QueryHandler<Q: Query>: Send + Sync {
    async fn handle(&self, query: &Q, cancel: &CancellationToken) -> DispatchResult<Q::Result>;
}
