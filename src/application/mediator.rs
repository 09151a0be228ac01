//! Mediator - Routes commands and queries through behaviors to their handler
//!
//! Every dispatch resolves one handler and the ordered behaviors for the
//! message, then folds the behaviors right-to-left around the handler call:
//!
//! ```text
//! B1.before -> B2.before -> handler -> B2.after -> B1.after
//! ```
//!
//! The chain is rebuilt on each call and nothing is cached between calls.

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use crate::application::errors::{DispatchError, DispatchResult};
use crate::domain::{
    Command, CommandHandler, Message, Next, PipelineBehavior, Query, QueryHandler, VoidCommand,
    VoidCommandHandler,
};
use crate::infrastructure::container::{Resolver, ServiceProvider};

/// Single point of command and query submission
#[async_trait]
pub trait Mediator: Send + Sync {
    /// Send a command and return its result
    async fn send_command<C: Command>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<C::Result>;

    /// Send a command that produces no result
    async fn send_void_command<C: VoidCommand>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<()>;

    /// Send a query and return its result
    async fn send_query<Q: Query>(
        &self,
        query: Q,
        cancel: &CancellationToken,
    ) -> DispatchResult<Q::Result>;
}

/// Default [`Mediator`], resolving through a [`Resolver`]
pub struct Dispatcher<P: Resolver = ServiceProvider> {
    resolver: Arc<P>,
}

impl<P: Resolver> Dispatcher<P> {
    pub fn new(resolver: Arc<P>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &Arc<P> {
        &self.resolver
    }
}

impl<P: Resolver> Clone for Dispatcher<P> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
        }
    }
}

#[async_trait]
impl<P: Resolver> Mediator for Dispatcher<P> {
    async fn send_command<C: Command>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<C::Result> {
        let handler = self
            .resolver
            .resolve::<dyn CommandHandler<C>>()
            .ok_or(DispatchError::HandlerNotFound { message: C::NAME })?;
        let behaviors = self
            .resolver
            .resolve_all::<dyn PipelineBehavior<C, C::Result>>();

        let (handler, command) = (&handler, &command);
        let innermost = Next::new(move || handler.handle(command, cancel));
        compose(command, cancel, &behaviors, innermost).run().await
    }

    async fn send_void_command<C: VoidCommand>(
        &self,
        command: C,
        cancel: &CancellationToken,
    ) -> DispatchResult<()> {
        let handler = self
            .resolver
            .resolve::<dyn VoidCommandHandler<C>>()
            .ok_or(DispatchError::HandlerNotFound { message: C::NAME })?;
        let behaviors = self.resolver.resolve_all::<dyn PipelineBehavior<C>>();

        let (handler, command) = (&handler, &command);
        let innermost = Next::new(move || handler.handle(command, cancel));
        compose(command, cancel, &behaviors, innermost).run().await
    }

    async fn send_query<Q: Query>(
        &self,
        query: Q,
        cancel: &CancellationToken,
    ) -> DispatchResult<Q::Result> {
        let handler = self
            .resolver
            .resolve::<dyn QueryHandler<Q>>()
            .ok_or(DispatchError::HandlerNotFound { message: Q::NAME })?;
        let behaviors = self
            .resolver
            .resolve_all::<dyn PipelineBehavior<Q, Q::Result>>();

        let (handler, query) = (&handler, &query);
        let innermost = Next::new(move || handler.handle(query, cancel));
        compose(query, cancel, &behaviors, innermost).run().await
    }
}

/// Wrap `innermost` in `behaviors`, first-registered outermost
fn compose<'a, M, R>(
    message: &'a M,
    cancel: &'a CancellationToken,
    behaviors: &'a [Arc<dyn PipelineBehavior<M, R>>],
    innermost: Next<'a, R>,
) -> Next<'a, R>
where
    M: Message,
    R: Send + 'static,
{
    behaviors.iter().rev().fold(innermost, |next, behavior| {
        Next::new(move || behavior.handle(message, next, cancel))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::container::ServiceCollection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct Ping(u32);

    impl Message for Ping {
        const NAME: &'static str = "Ping";
    }

    impl Command for Ping {
        type Result = u32;
    }

    #[derive(Debug)]
    struct Touch;

    impl Message for Touch {
        const NAME: &'static str = "Touch";
    }

    impl VoidCommand for Touch {}

    #[derive(Debug)]
    struct Lookup;

    impl Message for Lookup {
        const NAME: &'static str = "Lookup";
    }

    impl Query for Lookup {
        type Result = String;
    }

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Doubler {
        calls: Arc<AtomicUsize>,
        trace: Trace,
    }

    #[async_trait]
    impl CommandHandler<Ping> for Doubler {
        async fn handle(&self, command: &Ping, _cancel: &CancellationToken) -> DispatchResult<u32> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.trace.lock().unwrap().push("handler".to_string());
            Ok(command.0 * 2)
        }
    }

    struct Tracer {
        name: &'static str,
        trace: Trace,
    }

    #[async_trait]
    impl<M: Message, R: Send + 'static> PipelineBehavior<M, R> for Tracer {
        async fn handle(
            &self,
            _message: &M,
            next: Next<'_, R>,
            _cancel: &CancellationToken,
        ) -> DispatchResult<R> {
            self.trace.lock().unwrap().push(format!("{}.before", self.name));
            let result = next.run().await;
            self.trace.lock().unwrap().push(format!("{}.after", self.name));
            result
        }
    }

    struct Fixed(u32);

    #[async_trait]
    impl PipelineBehavior<Ping, u32> for Fixed {
        async fn handle(
            &self,
            _message: &Ping,
            _next: Next<'_, u32>,
            _cancel: &CancellationToken,
        ) -> DispatchResult<u32> {
            Ok(self.0)
        }
    }

    struct Rejecting;

    #[async_trait]
    impl PipelineBehavior<Ping, u32> for Rejecting {
        async fn handle(
            &self,
            _message: &Ping,
            _next: Next<'_, u32>,
            _cancel: &CancellationToken,
        ) -> DispatchResult<u32> {
            Err(DispatchError::execution("audit rejected"))
        }
    }

    struct Failing;

    #[async_trait]
    impl QueryHandler<Lookup> for Failing {
        async fn handle(&self, _query: &Lookup, _cancel: &CancellationToken) -> DispatchResult<String> {
            Err(DispatchError::execution("store unavailable"))
        }
    }

    struct TokenRecorder {
        seen: Arc<Mutex<Vec<usize>>>,
    }

    impl TokenRecorder {
        fn record(&self, cancel: &CancellationToken) {
            self.seen.lock().unwrap().push(cancel as *const CancellationToken as usize);
        }
    }

    #[async_trait]
    impl VoidCommandHandler<Touch> for TokenRecorder {
        async fn handle(&self, _command: &Touch, cancel: &CancellationToken) -> DispatchResult<()> {
            self.record(cancel);
            Ok(())
        }
    }

    #[async_trait]
    impl PipelineBehavior<Touch> for TokenRecorder {
        async fn handle(
            &self,
            _message: &Touch,
            next: Next<'_, ()>,
            cancel: &CancellationToken,
        ) -> DispatchResult<()> {
            self.record(cancel);
            next.run().await
        }
    }

    struct Fixture {
        calls: Arc<AtomicUsize>,
        trace: Trace,
        services: ServiceCollection,
    }

    impl Fixture {
        fn new() -> Self {
            let calls = Arc::new(AtomicUsize::new(0));
            let trace: Trace = Arc::new(Mutex::new(Vec::new()));
            let mut services = ServiceCollection::new();

            let (c, t) = (calls.clone(), trace.clone());
            services.add_transient::<dyn CommandHandler<Ping>, Doubler, _>(move || {
                Arc::new(Doubler {
                    calls: c.clone(),
                    trace: t.clone(),
                }) as Arc<dyn CommandHandler<Ping>>
            });

            Self {
                calls,
                trace,
                services,
            }
        }

        fn tracer(mut self, name: &'static str) -> Self {
            let trace = self.trace.clone();
            self.services
                .add_transient::<dyn PipelineBehavior<Ping, u32>, Tracer, _>(move || {
                    Arc::new(Tracer {
                        name,
                        trace: trace.clone(),
                    }) as Arc<dyn PipelineBehavior<Ping, u32>>
                });
            self
        }

        fn dispatcher(self) -> (Dispatcher, Arc<AtomicUsize>, Trace) {
            let dispatcher = Dispatcher::new(Arc::new(self.services.build()));
            (dispatcher, self.calls, self.trace)
        }
    }

    fn trace_of(trace: &Trace) -> Vec<String> {
        trace.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn test_handler_runs_exactly_once() {
        let (dispatcher, calls, _) = Fixture::new().dispatcher();

        let result = dispatcher
            .send_command(Ping(21), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_handler_fails_before_behaviors() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let mut services = ServiceCollection::new();
        let t = trace.clone();
        services.add_transient::<dyn PipelineBehavior<Ping, u32>, Tracer, _>(move || {
            Arc::new(Tracer {
                name: "orphan",
                trace: t.clone(),
            }) as Arc<dyn PipelineBehavior<Ping, u32>>
        });
        let dispatcher = Dispatcher::new(Arc::new(services.build()));

        let err = dispatcher
            .send_command(Ping(1), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, DispatchError::HandlerNotFound { message: "Ping" }));
        assert!(trace_of(&trace).is_empty());
    }

    #[tokio::test]
    async fn test_missing_handler_for_each_kind() {
        let trace: Trace = Arc::new(Mutex::new(Vec::new()));
        let mut services = ServiceCollection::new();
        let t = trace.clone();
        services.add_transient::<dyn PipelineBehavior<Touch>, Tracer, _>(move || {
            Arc::new(Tracer {
                name: "touch",
                trace: t.clone(),
            }) as Arc<dyn PipelineBehavior<Touch>>
        });
        let t = trace.clone();
        services.add_transient::<dyn PipelineBehavior<Lookup, String>, Tracer, _>(move || {
            Arc::new(Tracer {
                name: "lookup",
                trace: t.clone(),
            }) as Arc<dyn PipelineBehavior<Lookup, String>>
        });
        let dispatcher = Dispatcher::new(Arc::new(services.build()));
        let cancel = CancellationToken::new();

        let err = dispatcher.send_void_command(Touch, &cancel).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerNotFound { message: "Touch" }));

        let err = dispatcher.send_query(Lookup, &cancel).await.unwrap_err();
        assert!(matches!(err, DispatchError::HandlerNotFound { message: "Lookup" }));

        assert!(trace_of(&trace).is_empty());
    }

    #[tokio::test]
    async fn test_behaviors_run_in_registration_order() {
        let (dispatcher, _, trace) = Fixture::new().tracer("B1").tracer("B2").dispatcher();

        let result = dispatcher
            .send_command(Ping(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, 10);
        assert_eq!(
            trace_of(&trace),
            vec!["B1.before", "B2.before", "handler", "B2.after", "B1.after"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_inner_links() {
        let mut fixture = Fixture::new();
        fixture
            .services
            .add_transient::<dyn PipelineBehavior<Ping, u32>, Fixed, _>(|| {
                Arc::new(Fixed(7)) as Arc<dyn PipelineBehavior<Ping, u32>>
            });
        let (dispatcher, calls, trace) = fixture.tracer("inner").dispatcher();

        let result = dispatcher
            .send_command(Ping(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(result, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(trace_of(&trace).is_empty());
    }

    #[tokio::test]
    async fn test_handler_error_propagates_unchanged() {
        let mut services = ServiceCollection::new();
        services.add_transient::<dyn QueryHandler<Lookup>, Failing, _>(|| {
            Arc::new(Failing) as Arc<dyn QueryHandler<Lookup>>
        });
        let dispatcher = Dispatcher::new(Arc::new(services.build()));

        let err = dispatcher
            .send_query(Lookup, &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            DispatchError::Execution(source) => assert_eq!(source.to_string(), "store unavailable"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_behavior_error_propagates_unchanged() {
        let mut fixture = Fixture::new().tracer("outer");
        fixture
            .services
            .add_transient::<dyn PipelineBehavior<Ping, u32>, Rejecting, _>(|| {
                Arc::new(Rejecting) as Arc<dyn PipelineBehavior<Ping, u32>>
            });
        let (dispatcher, calls, trace) = fixture.dispatcher();

        let err = dispatcher
            .send_command(Ping(5), &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            DispatchError::Execution(source) => assert_eq!(source.to_string(), "audit rejected"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(trace_of(&trace), vec!["outer.before", "outer.after"]);
    }

    #[tokio::test]
    async fn test_same_token_reaches_every_link() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut services = ServiceCollection::new();

        let s = seen.clone();
        services.add_transient::<dyn VoidCommandHandler<Touch>, TokenRecorder, _>(move || {
            Arc::new(TokenRecorder { seen: s.clone() }) as Arc<dyn VoidCommandHandler<Touch>>
        });
        for _ in 0..2 {
            let s = seen.clone();
            services.add_transient::<dyn PipelineBehavior<Touch>, TokenRecorder, _>(move || {
                Arc::new(TokenRecorder { seen: s.clone() }) as Arc<dyn PipelineBehavior<Touch>>
            });
        }
        let dispatcher = Dispatcher::new(Arc::new(services.build()));

        let cancel = CancellationToken::new();
        cancel.cancel();
        dispatcher.send_void_command(Touch, &cancel).await.unwrap();

        let expected = &cancel as *const CancellationToken as usize;
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen, vec![expected; 3]);
    }
}
