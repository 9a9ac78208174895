use alloc::sync::Arc;
use tracing::error;

use crate::{
    any::{Instance, TypeInfo},
    service::{fn_service, BoxCloneService},
};

/// Teardown hook of a provided instance.
///
/// Called once per built instance when its scope ends: on [`crate::Session::close`] for
/// request-scoped instances and on [`crate::Registry::close`] for app-scoped ones,
/// in LIFO order of construction.
pub trait Finalizer<Dep>: Clone + 'static {
    fn finalize(&mut self, dependency: Arc<Dep>);
}

pub(crate) type BoxedCloneFinalizer = BoxCloneService<Instance, (), ()>;

/// Finalizer of a declaration, sync or awaiting.
#[derive(Clone)]
pub(crate) enum BoxedFinalizer {
    Sync(BoxedCloneFinalizer),
    #[cfg(feature = "async")]
    Async(crate::async_impl::finalizer::BoxedCloneFinalizer),
}

#[must_use]
pub(crate) fn boxed_finalizer_factory<Dep, Fin>(mut finalizer: Fin) -> BoxedCloneFinalizer
where
    Dep: Send + Sync + 'static,
    Fin: Finalizer<Dep> + Send + Sync,
{
    BoxCloneService::new(fn_service(move |dependency: Instance| -> Result<(), ()> {
        match dependency.downcast::<Dep>() {
            Ok(dependency) => {
                finalizer.finalize(dependency);
                Ok(())
            }
            Err(_) => {
                error!(dependency = TypeInfo::of::<Dep>().short_name(), "Finalizer got a value of another type");
                Err(())
            }
        }
    }))
}

impl<F, Dep> Finalizer<Dep> for F
where
    F: FnMut(Arc<Dep>) + Clone + 'static,
{
    #[inline]
    fn finalize(&mut self, dependency: Arc<Dep>) {
        self(dependency);
    }
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;
    use core::sync::atomic::{AtomicU8, Ordering};

    use super::boxed_finalizer_factory;
    use crate::{any::Instance, service::Service as _};

    struct Connection(u8);

    #[test]
    fn test_finalizer_receives_instance() {
        let closed = Arc::new(AtomicU8::new(0));
        let mut finalizer = boxed_finalizer_factory({
            let closed = closed.clone();
            move |connection: Arc<Connection>| {
                closed.store(connection.0, Ordering::SeqCst);
            }
        });

        let instance: Instance = Arc::new(Connection(7));
        assert!(finalizer.call(instance).is_ok());
        assert_eq!(closed.load(Ordering::SeqCst), 7);

        let wrong: Instance = Arc::new(1u8);
        assert!(finalizer.call(wrong).is_err());
    }
}
