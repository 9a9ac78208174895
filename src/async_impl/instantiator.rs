use alloc::{boxed::Box, vec::Vec};
use core::{any::Any, convert::Infallible, future::Future};
use tracing::debug;

use super::service::{BoxCloneAsyncService, BoxFuture};
use crate::{
    dependency::Dependency,
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, InstantiatorErrorKind, ResolveErrorKind},
    service::{fn_service, BoxCloneService},
    Session,
};

/// Async counterpart of [`crate::Instantiator`], implemented for closures returning a future.
pub trait Instantiator<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Provides: 'static;
    type Error: Into<InstantiateErrorKind>;

    fn instantiate(&mut self, dependencies: Deps) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send;

    #[inline]
    #[must_use]
    fn dependencies() -> Vec<Dependency> {
        Deps::dependencies()
    }
}

type InstantiateResult = Result<Box<dyn Any + Send + Sync>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

pub(crate) type BoxedCloneInstantiator =
    BoxCloneAsyncService<Session, Box<dyn Any + Send + Sync>, InstantiatorErrorKind<ResolveErrorKind, InstantiateErrorKind>>;

#[must_use]
pub(crate) fn boxed_instantiator<Inst, Deps>(instantiator: Inst) -> BoxedCloneInstantiator
where
    Inst: Instantiator<Deps> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver + Send + 'static,
{
    BoxCloneService::new(fn_service(move |session: Session| -> Result<BoxFuture<'static, InstantiateResult>, Infallible> {
        let future: BoxFuture<'static, InstantiateResult> = Box::pin(instantiate::<Inst, Deps>(instantiator.clone(), session));
        Ok(future)
    }))
}

async fn instantiate<Inst, Deps>(mut instantiator: Inst, session: Session) -> InstantiateResult
where
    Inst: Instantiator<Deps> + Send,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver + Send,
{
    let dependencies = match Deps::resolve_async(&session).await {
        Ok(dependencies) => dependencies,
        Err(err) => return Err(InstantiatorErrorKind::Deps(err.into())),
    };
    let dependency = match instantiator.instantiate(dependencies).await {
        Ok(dependency) => dependency,
        Err(err) => return Err(InstantiatorErrorKind::Factory(err.into())),
    };

    debug!("Instantiated");

    let dependency: Box<dyn Any + Send + Sync> = Box::new(dependency);
    Ok(dependency)
}

macro_rules! impl_instantiator {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Fut, Response, Err, $($ty,)*> Instantiator<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Fut + Clone + 'static,
            Fut: Future<Output = Result<Response, Err>> + Send,
            Response: 'static,
            Err: Into<InstantiateErrorKind>,
            $( $ty: DependencyResolver + Send, )*
        {
            type Provides = Response;
            type Error = Err;

            #[inline]
            fn instantiate(&mut self, ($($ty,)*): ($($ty,)*)) -> impl Future<Output = Result<Self::Provides, Self::Error>> + Send {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_instantiator);

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};
    use tracing_test::traced_test;

    use super::{boxed_instantiator, DependencyResolver, InstantiateErrorKind, Instantiator};
    use crate::{errors::InstantiatorErrorKind, inject::Inject, Container, Registry, ResolveErrorKind};

    struct Request(bool);
    struct Response(bool);

    #[test]
    #[allow(dead_code)]
    fn test_factory_helper() {
        fn resolver<Deps: DependencyResolver, F: Instantiator<Deps>>(_f: F) {}
        fn resolver_with_dep<Deps: DependencyResolver>() {
            resolver(|| async { Ok::<_, InstantiateErrorKind>(()) });
            resolver(|Inject(request): Inject<Request>| async move { Ok::<_, InstantiateErrorKind>(Response(request.0)) });
        }
    }

    #[tokio::test]
    #[traced_test]
    async fn test_boxed_instantiator() {
        let instantiator_response_call_count = Arc::new(AtomicU8::new(0));

        let mut container = Container::new();
        container.singleton(|| Ok(Request(true))).unwrap();
        let registry = Registry::build([container]).unwrap();

        let mut instantiator_response = boxed_instantiator({
            let instantiator_response_call_count = instantiator_response_call_count.clone();
            move |Inject(request): Inject<Request>| {
                let instantiator_response_call_count = instantiator_response_call_count.clone();
                async move {
                    instantiator_response_call_count.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, InstantiateErrorKind>(Response(request.0))
                }
            }
        });

        let response_1 = instantiator_response.call_async(registry.session()).await.unwrap();
        let response_2 = instantiator_response.call_async(registry.session()).await.unwrap();

        assert!(response_1.downcast::<Response>().unwrap().0);
        assert!(response_2.downcast::<Response>().unwrap().0);
        assert_eq!(instantiator_response_call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_boxed_instantiator_missing_dependency() {
        let mut container = Container::new();
        container.singleton(|| Ok(Request(false))).unwrap();
        let registry = Registry::build([container]).unwrap();

        let mut instantiator = boxed_instantiator(|Inject(response): Inject<Response>| async move {
            Ok::<_, InstantiateErrorKind>(Request(response.0))
        });

        assert!(matches!(
            instantiator.call_async(registry.session()).await,
            Err(InstantiatorErrorKind::Deps(ResolveErrorKind::UnknownType { .. }))
        ));
    }
}
