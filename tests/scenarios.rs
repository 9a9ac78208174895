use std::{
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc, Barrier, Mutex,
    },
    thread,
};

use spritze::{
    context, inject, provider, transient, Constructible, Container, Inject, InstantiateErrorKind, Registry, RegistryErrorKind,
    ResolveErrorKind, Scope, TypeInfo,
};
use tracing_test::traced_test;

#[derive(Debug, Default)]
struct Logger {
    lines: Mutex<Vec<String>>,
}

impl Logger {
    fn log(&self, line: impl Into<String>) {
        self.lines.lock().unwrap().push(line.into());
    }
}

struct Service {
    logger: Arc<Logger>,
}

impl Service {
    fn run(&self) {
        self.logger.log("service ran");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RequestId(u64);

#[derive(Debug)]
struct RequestHandler {
    request_id: Arc<RequestId>,
    logger: Arc<Logger>,
}

impl Constructible for RequestHandler {
    type Dependencies = (Inject<RequestId>, Inject<Logger>);

    fn construct((Inject(request_id), Inject(logger)): Self::Dependencies) -> Result<Self, InstantiateErrorKind> {
        logger.log(format!("handler for {}", request_id.0));
        Ok(Self { request_id, logger })
    }
}

#[test]
#[traced_test]
fn test_logger_service() {
    let mut container = Container::new();
    container
        .singleton(|| Ok(Logger::default()))
        .unwrap()
        .provide(|Inject(logger): Inject<Logger>| Ok(Service { logger }), Scope::Request)
        .unwrap();
    let registry = Registry::build([container]).unwrap();

    let session = registry.session();
    session.resolve::<Service>().unwrap().run();
    registry.session().resolve::<Service>().unwrap().run();

    let logger = session.resolve::<Logger>().unwrap();
    assert_eq!(*logger.lines.lock().unwrap(), ["service ran", "service ran"]);
}

#[test]
#[traced_test]
fn test_request_id_context() {
    const REQUEST_ID: context::ContextField<RequestId> = context::get();

    let mut container = Container::new();
    container
        .singleton(|| Ok(Logger::default()))
        .unwrap()
        .add_context_field(REQUEST_ID)
        .unwrap()
        .register(transient::<RequestHandler>())
        .unwrap();
    let registry = Registry::build([container]).unwrap();

    let first = registry.session();
    REQUEST_ID.bind(&first, RequestId(1)).unwrap();
    let second = registry.session();
    REQUEST_ID.bind(&second, RequestId(2)).unwrap();

    let first_handler = first.resolve::<RequestHandler>().unwrap();
    let second_handler = second.resolve::<RequestHandler>().unwrap();
    assert_eq!(*first_handler.request_id, RequestId(1));
    assert_eq!(*second_handler.request_id, RequestId(2));
    assert!(Arc::ptr_eq(&first_handler.logger, &second_handler.logger));
    assert_eq!(*REQUEST_ID.resolve(&first).unwrap(), RequestId(1));

    let unbound = registry.session();
    let err = unbound.resolve::<RequestHandler>().unwrap_err();
    assert!(matches!(
        err.root_cause(),
        ResolveErrorKind::ContextValueMissing { type_info } if *type_info == TypeInfo::of::<RequestId>()
    ));

    first.close();
    assert!(matches!(REQUEST_ID.resolve(&first), Err(ResolveErrorKind::SessionClosed)));
    assert_eq!(*REQUEST_ID.resolve(&second).unwrap(), RequestId(2));
}

#[test]
#[traced_test]
fn test_concurrent_first_app_access() {
    const THREADS: usize = 8;

    let calls = Arc::new(AtomicU8::new(0));

    let mut container = Container::new();
    container
        .singleton({
            let calls = calls.clone();
            move || {
                calls.fetch_add(1, Ordering::SeqCst);
                thread::sleep(std::time::Duration::from_millis(10));
                Ok(Logger::default())
            }
        })
        .unwrap();
    let registry = Registry::build([container]).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                registry.session().resolve::<Logger>().unwrap()
            })
        })
        .collect();
    let loggers: Vec<_> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(loggers.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
}

#[test]
#[traced_test]
fn test_duplicate_type_across_containers() {
    let mut first = Container::new();
    first.singleton(|| Ok(Logger::default())).unwrap();
    let mut second = Container::new();
    second.provide(|| Ok(Logger::default()), Scope::Request).unwrap();

    match first.merge([second]) {
        Err(RegistryErrorKind::DuplicateProvider { type_info }) => assert_eq!(type_info, TypeInfo::of::<Logger>()),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
#[traced_test]
fn test_cycle_names_both_types() {
    struct A(Arc<B>);
    struct B(Arc<A>);

    let mut container = Container::new();
    container
        .register(provider(|Inject(b): Inject<B>| Ok(A(b))))
        .unwrap()
        .register(provider(|Inject(a): Inject<A>| Ok(B(a))).scope(Scope::Request))
        .unwrap();

    match Registry::build([container]) {
        Err(err @ RegistryErrorKind::CyclicDependency { .. }) => {
            let message = err.to_string();
            assert!(message.contains("A -> B -> A") || message.contains("B -> A -> B"), "{message}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
#[traced_test]
fn test_request_finalizers_on_drop() {
    struct Transaction {
        logger: Arc<Logger>,
    }

    let mut container = Container::new();
    container
        .singleton(|| Ok(Logger::default()))
        .unwrap()
        .register(
            provider(|Inject(logger): Inject<Logger>| Ok(Transaction { logger }))
                .scope(Scope::Request)
                .finalizer(|transaction: Arc<Transaction>| transaction.logger.log("rollback")),
        )
        .unwrap();
    let registry = Registry::build([container]).unwrap();

    let logger = {
        let session = registry.session();
        let transaction = session.resolve::<Transaction>().unwrap();
        transaction.logger.clone()
    };
    assert_eq!(*logger.lines.lock().unwrap(), ["rollback"]);

    // never built, never finalized
    drop(registry.session());
    assert_eq!(logger.lines.lock().unwrap().len(), 1);
}

#[test]
#[traced_test]
fn test_injected_handler() {
    let mut container = Container::new();
    container
        .singleton(|| Ok(Logger::default()))
        .unwrap()
        .context_field::<RequestId>()
        .unwrap();
    let registry = Registry::build([container]).unwrap();

    let handler = inject(|Inject(logger): Inject<Logger>, Inject(request_id): Inject<RequestId>| {
        logger.log(format!("request {}", request_id.0));
        request_id.0
    });

    let session = registry.session();
    session.bind(RequestId(10)).unwrap();
    assert_eq!(handler.call(&session).unwrap(), 10);

    let mut explicit = spritze::Context::new();
    explicit.insert(RequestId(11));
    assert_eq!(handler.call_with(&registry.session(), &explicit).unwrap(), 11);

    let logger = session.resolve::<Logger>().unwrap();
    assert_eq!(*logger.lines.lock().unwrap(), ["request 10", "request 11"]);
}
