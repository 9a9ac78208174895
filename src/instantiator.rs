use alloc::{boxed::Box, vec::Vec};
use core::any::Any;
use tracing::debug;

use super::{
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    service::{fn_service, BoxCloneService},
};
use crate::{dependency::Dependency, Session};

pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> Result<Self::Provides, Self::Error>;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Dependency> {
        Deps::dependencies()
    }
}

/// A type that knows how to build itself from its dependencies.
///
/// Registered with [`crate::transient`], which uses [`Constructible::construct`] as the factory.
pub trait Constructible: Sized + Send + Sync + 'static {
    type Dependencies: DependencyResolver;

    fn construct(dependencies: Self::Dependencies) -> Result<Self, InstantiateErrorKind>;
}

type InstantiateResult = Result<Box<dyn Any + Send + Sync>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

pub(crate) type BoxedCloneInstantiator =
    BoxCloneService<Session, Box<dyn Any + Send + Sync>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedCloneInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver,
{
    BoxCloneService::new(fn_service({
        move |session: Session| -> InstantiateResult {
            let dependencies = match Deps::resolve(&session) {
                Ok(dependencies) => dependencies,
                Err(err) => return Err(InstantiatorErrorKind::Deps(err.into())),
            };
            let dependency = match instantiator.clone().instantiate(dependencies) {
                Ok(dependency) => dependency,
                Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
            };

            debug!("Instantiated");

            Ok(Box::new(dependency) as _)
        }
    }))
}

#[must_use]
pub(crate) fn boxed_constructor<T: Constructible>() -> BoxedCloneInstantiator {
    BoxCloneService::new(fn_service(|session: Session| -> InstantiateResult {
        let dependencies = match T::Dependencies::resolve(&session) {
            Ok(dependencies) => dependencies,
            Err(err) => return Err(InstantiatorErrorKind::Deps(err.into())),
        };
        let dependency = T::construct(dependencies).map_err(InstantiatorErrorKind::Factory)?;

        debug!("Constructed");

        Ok(Box::new(dependency) as _)
    }))
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Result<Response, Err> + Clone + 'static,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver + Send, )*
        {
            type Provides = Response;
            type Error = Err;

            fn instantiate(&mut self, ($($ty,)*): ($($ty,)*)) -> Result<Self::Provides, Self::Error> {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

/// Wrapper to create an instantiator that just returns passed value.
/// It can be used when the value was created outside the registry.
#[inline]
#[must_use]
pub fn instance<T: Clone + 'static>(val: T) -> impl Instantiator<(), Provides = T, Error = InstantiateErrorKind> {
    move || Ok(val.clone())
}

#[cfg(test)]
mod tests {
    use super::{boxed_constructor, boxed_instantiator, Constructible, DependencyResolver, InstantiateErrorKind, Instantiator};
    use crate::{
        dependency::Dependency,
        errors::{InstantiatorErrorKind, ResolveErrorKind},
        inject::Inject,
        service::Service as _,
        Container, Registry, Scope,
    };

    use alloc::{sync::Arc, vec};
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing::debug;
    use tracing_test::traced_test;

    struct Request(bool);
    struct Response(bool);

    struct Greeting(Arc<Name>);
    struct Name(&'static str);

    impl Constructible for Greeting {
        type Dependencies = (Inject<Name>,);

        fn construct((Inject(name),): Self::Dependencies) -> Result<Self, InstantiateErrorKind> {
            Ok(Self(name))
        }
    }

    #[test]
    #[allow(dead_code)]
    fn test_factory_helper() {
        fn resolver<Deps: DependencyResolver, F: Instantiator<Deps>>(_f: F) {}
        fn resolver_with_dep<Deps: DependencyResolver>() {
            resolver(|| Ok::<_, InstantiateErrorKind>(()));
        }
    }

    #[test]
    fn test_instantiator_dependencies() {
        fn dependencies<Deps: DependencyResolver, F: Instantiator<Deps>>(_f: &F) -> alloc::vec::Vec<Dependency> {
            F::dependencies()
        }

        let factory = |Inject(_): Inject<Request>, Inject(_): Inject<Name>| Ok::<_, InstantiateErrorKind>(Response(true));
        assert_eq!(dependencies(&factory), vec![Dependency::of::<Request>(), Dependency::of::<Name>()]);
    }

    #[test]
    #[traced_test]
    fn test_boxed_instantiator() {
        let instantiator_request_call_count = Arc::new(AtomicU8::new(0));
        let instantiator_response_call_count = Arc::new(AtomicU8::new(0));

        let mut container = Container::new();
        container
            .singleton({
                let instantiator_request_call_count = instantiator_request_call_count.clone();
                move || {
                    instantiator_request_call_count.fetch_add(1, Ordering::SeqCst);

                    debug!("Call instantiator request");
                    Ok::<_, InstantiateErrorKind>(Request(true))
                }
            })
            .unwrap();
        let registry = Registry::build([container]).unwrap();

        let mut instantiator_response = boxed_instantiator({
            let instantiator_response_call_count = instantiator_response_call_count.clone();
            move |val_1: Inject<Request>, val_2: Inject<Request>| {
                assert_eq!(val_1.0 .0, val_2.0 .0);

                instantiator_response_call_count.fetch_add(1, Ordering::SeqCst);

                debug!("Call instantiator response");
                Ok::<_, InstantiateErrorKind>(Response(val_1.0 .0))
            }
        });

        let response_1 = instantiator_response.call(registry.session()).unwrap();
        let response_2 = instantiator_response.call(registry.session()).unwrap();

        assert!(response_1.downcast::<Response>().unwrap().0);
        assert!(response_2.downcast::<Response>().unwrap().0);
        assert_eq!(instantiator_request_call_count.load(Ordering::SeqCst), 1);
        // The erased instantiator doesn't cache its own result, the session does
        assert_eq!(instantiator_response_call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    #[traced_test]
    fn test_boxed_instantiator_missing_dependency() {
        let mut container = Container::new();
        container.provide(|| Ok(Request(false)), Scope::Request).unwrap();
        let registry = Registry::build([container]).unwrap();

        let mut instantiator = boxed_instantiator(|Inject(name): Inject<Name>| Ok::<_, InstantiateErrorKind>(Response(name.0.is_empty())));

        assert!(matches!(
            instantiator.call(registry.session()),
            Err(InstantiatorErrorKind::Deps(ResolveErrorKind::UnknownType { .. }))
        ));
    }

    #[test]
    #[traced_test]
    fn test_boxed_constructor() {
        let mut container = Container::new();
        container.singleton(|| Ok(Name("world"))).unwrap();
        let registry = Registry::build([container]).unwrap();

        let greeting = boxed_constructor::<Greeting>().call(registry.session()).unwrap();

        assert_eq!(greeting.downcast::<Greeting>().unwrap().0 .0, "world");
    }
}
