use std::sync::{
    atomic::{AtomicU8, Ordering},
    Arc,
};

use spritze::{container, Inject, RegistryErrorKind, ResolveErrorKind, Scope};
use tracing_test::traced_test;

struct Logger;
struct Service(Arc<Logger>);

// The global registry is initialized once per process, so the whole lifecycle lives in one test
#[test]
#[traced_test]
fn test_global_lifecycle() {
    assert!(matches!(spritze::registry(), Err(ResolveErrorKind::NotInitialized)));
    assert!(matches!(spritze::session(), Err(ResolveErrorKind::NotInitialized)));

    assert!(matches!(spritze::init(Vec::new()), Err(RegistryErrorKind::NoContainers)));
    assert!(matches!(spritze::registry(), Err(ResolveErrorKind::NotInitialized)));

    let logger_calls = Arc::new(AtomicU8::new(0));
    let container = container! {
        scope(Scope::App) [
            provide({
                let logger_calls = logger_calls.clone();
                move || {
                    logger_calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Logger)
                }
            }),
        ],
        scope(Scope::Request) [
            provide(|Inject(logger): Inject<Logger>| Ok(Service(logger))),
        ],
    }
    .unwrap();

    let registry = spritze::init([container]).unwrap();
    assert!(registry.contains::<Service>());
    assert!(core::ptr::eq(registry, spritze::registry().unwrap()));

    let again = container! {
        scope(Scope::App) [ provide(|| Ok(0u8)) ],
    }
    .unwrap();
    assert!(matches!(spritze::init([again]), Err(RegistryErrorKind::DoubleInitialization)));
    assert!(!spritze::registry().unwrap().contains::<u8>());

    let service_1 = spritze::session().unwrap().resolve::<Service>().unwrap();
    let service_2 = spritze::session().unwrap().resolve::<Service>().unwrap();
    assert!(!Arc::ptr_eq(&service_1, &service_2));
    assert!(Arc::ptr_eq(&service_1.0, &service_2.0));
    assert_eq!(logger_calls.load(Ordering::SeqCst), 1);
}
