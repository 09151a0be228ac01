//! Built-in pipeline behaviors
//!
//! None of these are installed automatically; register them per message type
//! through [`HandlerRegistry`](crate::application::registry::HandlerRegistry).

use async_trait::async_trait;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use crate::application::errors::{DispatchError, DispatchResult};
use crate::domain::{ensure_active, Message, Next, PipelineBehavior};

/// Messages that can check their own payload before handling
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Logging behavior for debugging
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBehavior;

#[async_trait]
impl<M: Message, R: Send + 'static> PipelineBehavior<M, R> for LoggingBehavior {
    async fn handle(
        &self,
        _message: &M,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<R> {
        tracing::debug!("[{}] handling", M::NAME);
        let started = Instant::now();

        let result = next.run().await;

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &result {
            Ok(_) => {
                tracing::debug!(elapsed_ms, "[{}] handled OK", M::NAME);
            }
            Err(e) => {
                tracing::warn!(elapsed_ms, "[{}] error: {}", M::NAME, e);
            }
        }

        result
    }
}

/// Rejects messages whose [`Validate`] check fails, without calling the handler
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationBehavior;

#[async_trait]
impl<M: Message + Validate, R: Send + 'static> PipelineBehavior<M, R> for ValidationBehavior {
    async fn handle(
        &self,
        message: &M,
        next: Next<'_, R>,
        _cancel: &CancellationToken,
    ) -> DispatchResult<R> {
        message.validate().map_err(DispatchError::Invalid)?;
        next.run().await
    }
}

/// Stops the chain with [`DispatchError::Cancelled`] once the token has fired
#[derive(Debug, Clone, Copy, Default)]
pub struct CancellationGuard;

#[async_trait]
impl<M: Message, R: Send + 'static> PipelineBehavior<M, R> for CancellationGuard {
    async fn handle(
        &self,
        _message: &M,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> DispatchResult<R> {
        ensure_active(cancel)?;
        next.run().await
    }
}
