//! Pipeline behaviors - Interceptors wrapped around a handler invocation

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use crate::application::errors::{DispatchError, DispatchResult};
use super::message::Message;

/// Continuation handed to a behavior.
///
/// Calling [`Next::run`] proceeds to the next behavior in the chain, or to the
/// handler when this is the innermost link. Dropping it without running
/// short-circuits everything inside.
pub struct Next<'a, R> {
    call: Box<dyn FnOnce() -> BoxFuture<'a, DispatchResult<R>> + Send + 'a>,
}

impl<'a, R> Next<'a, R> {
    pub fn new<F>(call: F) -> Self
    where
        F: FnOnce() -> BoxFuture<'a, DispatchResult<R>> + Send + 'a,
    {
        Self {
            call: Box::new(call),
        }
    }

    /// Run the rest of the chain
    pub fn run(self) -> BoxFuture<'a, DispatchResult<R>> {
        (self.call)()
    }
}

/// Behavior trait - wraps handling of message `M` producing `R`.
///
/// Void commands use the default `R = ()`.
#[async_trait]
pub trait PipelineBehavior<M: Message, R: Send + 'static = ()>: Send + Sync {
    async fn handle(
        &self,
        message: &M,
        next: Next<'_, R>,
        cancel: &CancellationToken,
    ) -> DispatchResult<R>;
}

/// Fail with [`DispatchError::Cancelled`] once the token has fired
pub fn ensure_active(cancel: &CancellationToken) -> DispatchResult<()> {
    if cancel.is_cancelled() {
        return Err(DispatchError::Cancelled);
    }
    Ok(())
}
