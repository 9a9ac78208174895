use alloc::{boxed::Box, sync::Arc};
use core::{convert::Infallible, future::Future};
use tracing::error;

use super::service::{BoxCloneAsyncService, BoxFuture};
use crate::{
    any::{Instance, TypeInfo},
    service::{fn_service, BoxCloneService},
};

/// Teardown hook that `.await`s.
///
/// It only runs on [`crate::Session::close_async`] and [`crate::Registry::close_async`],
/// sync closing skips it.
pub trait Finalizer<Dep>: Clone + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>) -> impl Future<Output = ()> + Send;
}

pub(crate) type BoxedCloneFinalizer = BoxCloneAsyncService<Instance, (), ()>;

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService::new(fn_service(move |dependency: Instance| -> Result<BoxFuture<'static, Result<(), ()>>, Infallible> {
        let future: BoxFuture<'static, Result<(), ()>> = Box::pin(finalize::<Dep, Fin>(finalizer.clone(), dependency));
        Ok(future)
    }))
}

async fn finalize<Dep, Fin>(mut finalizer: Fin, dependency: Instance) -> Result<(), ()>
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send,
{
    let Ok(dependency) = dependency.downcast::<Dep>() else {
        error!(dependency = TypeInfo::of::<Dep>().short_name(), "Finalizer got a value of another type");
        return Err(());
    };
    finalizer.finalize(dependency).await;
    Ok(())
}

impl<F, Fut, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) -> Fut + Clone + 'static,
    Fut: Future<Output = ()> + Send,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) -> impl Future<Output = ()> + Send {
        self(dependency)
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};

    use super::boxed_finalizer_factory;
    use crate::any::Instance;

    struct Connection(u8);

    #[tokio::test]
    async fn test_finalizer_receives_instance() {
        let closed = Arc::new(AtomicU8::new(0));
        let mut finalizer = boxed_finalizer_factory({
            let closed = closed.clone();
            move |connection: Arc<Connection>| {
                let closed = closed.clone();
                async move {
                    tokio::task::yield_now().await;
                    closed.store(connection.0, Ordering::SeqCst);
                }
            }
        });

        let instance: Instance = Arc::new(Connection(7));
        assert!(finalizer.call_async(instance).await.is_ok());
        assert_eq!(closed.load(Ordering::SeqCst), 7);

        let wrong: Instance = Arc::new(1u8);
        assert!(finalizer.call_async(wrong).await.is_err());
    }
}
