use alloc::{collections::BTreeSet, sync::Arc};
use core::{any::Any, fmt, mem};
use parking_lot::Mutex;
use tracing::{debug, error};

#[cfg(feature = "async")]
use crate::async_impl;
use crate::{any::TypeInfo, context::Context, errors::ResolveErrorKind, registry::Registry, resolver, store::RequestInstances};

/// Lifecycle of a [`Session`].
///
/// `Created` becomes `Active` on the first bind or resolution.
/// `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Active,
    Closed,
}

/// Unit of request-scope caching and context binding.
///
/// Clones share the same state. The session is closed by [`Session::close`] or when the last clone is dropped;
/// closing runs finalizers of request-scoped instances and discards them together with the context values.
///
/// A session is meant to be used by one logical flow at a time.
#[derive(Clone)]
pub struct Session {
    pub(crate) inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    pub(crate) registry: Registry,
    pub(crate) data: Mutex<SessionData>,
}

pub(crate) struct SessionData {
    pub(crate) state: SessionState,
    pub(crate) context: Context,
    pub(crate) requests: RequestInstances,
    pub(crate) in_progress: BTreeSet<TypeInfo>,
}

impl Session {
    #[inline]
    #[must_use]
    pub(crate) fn new(registry: Registry, context: Context) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                registry,
                data: Mutex::new(SessionData {
                    state: SessionState::Created,
                    context,
                    requests: RequestInstances::new(),
                    in_progress: BTreeSet::new(),
                }),
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.data.lock().state
    }

    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state() == SessionState::Closed
    }

    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Binds a context value for this session, returning the previously bound one.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::NotContextField`] if `T` isn't declared as a context field
    /// - [`ResolveErrorKind::SessionClosed`] if the session is closed
    #[inline]
    pub fn bind<T: Send + Sync + 'static>(&self, value: T) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        self.bind_rc(Arc::new(value))
    }

    /// Same as [`Self::bind`] for a value that is already shared.
    ///
    /// # Errors
    /// See [`Self::bind`].
    pub fn bind_rc<T: Send + Sync + 'static>(&self, value: Arc<T>) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<T>();

        if !self.inner.registry.is_context_field(&type_info) {
            let err = ResolveErrorKind::NotContextField { type_info };
            error!("{}", err);
            return Err(err);
        }

        let mut data = self.inner.data.lock();
        if data.state == SessionState::Closed {
            let err = ResolveErrorKind::SessionClosed;
            error!("{}", err);
            return Err(err);
        }
        data.state = SessionState::Active;

        debug!(dependency = type_info.short_name(), "Context value bound");
        Ok(data.context.insert_rc(value))
    }

    /// Resolves `T`, building its missing dependencies first.
    ///
    /// App-scoped instances are shared by all sessions of the registry,
    /// request-scoped ones are cached in this session.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::SessionClosed`] if the session is closed
    /// - [`ResolveErrorKind::UnknownType`] if `T` has no provider or context field
    /// - [`ResolveErrorKind::ContextValueMissing`] if `T` (or a dependency) is an unbound context field
    /// - [`ResolveErrorKind::Instantiator`] if a factory or one of its dependencies failed
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<T>();

        downcast(type_info, resolver::resolve(self, type_info)?)
    }

    /// Same as [`Self::resolve`], awaiting async factories along the way.
    ///
    /// # Errors
    /// See [`Self::resolve`].
    #[cfg(feature = "async")]
    pub async fn resolve_async<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ResolveErrorKind> {
        let type_info = TypeInfo::of::<T>();

        downcast(type_info, async_impl::resolver::resolve(self, type_info).await?)
    }

    /// Untyped version of [`Self::resolve`].
    ///
    /// # Errors
    /// See [`Self::resolve`].
    #[inline]
    pub fn resolve_type(&self, type_info: TypeInfo) -> Result<Arc<dyn Any + Send + Sync>, ResolveErrorKind> {
        resolver::resolve(self, type_info)
    }

    /// Ends the session: runs finalizers of request-scoped instances in LIFO order,
    /// then drops them and the bound context values.
    ///
    /// Calling it again is a no-op.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Same as [`Self::close`], but async finalizers are awaited instead of skipped.
    #[cfg(feature = "async")]
    pub async fn close_async(&self) {
        if let Some((mut requests, context)) = self.inner.take_for_close() {
            requests.clear().finalize_async().await;
            drop(context);

            debug!("Session closed");
        }
    }

    #[cfg(test)]
    pub(crate) fn request_instances_len(&self) -> usize {
        self.inner.data.lock().requests.len()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.inner.data.lock();
        f.debug_struct("Session")
            .field("state", &data.state)
            .field("context", &data.context)
            .field("request_instances", &data.requests.len())
            .finish()
    }
}

impl SessionInner {
    /// Marks `type_info` as being constructed until the returned guard is dropped.
    pub(crate) fn enter(&self, type_info: TypeInfo) -> Result<InProgressGuard<'_>, ResolveErrorKind> {
        if !self.data.lock().in_progress.insert(type_info) {
            let err = ResolveErrorKind::ReentrantResolution { type_info };
            error!("{}", err);
            return Err(err);
        }
        Ok(InProgressGuard { session: self, type_info })
    }

    /// Moves the session to `Closed` and takes what it owns, `None` if it was closed already.
    fn take_for_close(&self) -> Option<(RequestInstances, Context)> {
        let mut data = self.data.lock();
        if data.state == SessionState::Closed {
            return None;
        }
        data.state = SessionState::Closed;
        Some((mem::take(&mut data.requests), mem::take(&mut data.context)))
    }

    fn close(&self) {
        if let Some((mut requests, context)) = self.take_for_close() {
            requests.clear().finalize();
            drop(context);

            debug!("Session closed");
        }
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.close();
    }
}

fn downcast<T: Send + Sync + 'static>(type_info: TypeInfo, dependency: Arc<dyn Any + Send + Sync>) -> Result<Arc<T>, ResolveErrorKind> {
    dependency.downcast::<T>().map_err(|dependency| {
        let err = ResolveErrorKind::IncorrectType {
            expected: type_info,
            actual: (*dependency).type_id(),
        };
        error!("{}", err);
        err
    })
}

pub(crate) struct InProgressGuard<'a> {
    session: &'a SessionInner,
    type_info: TypeInfo,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.session.data.lock().in_progress.remove(&self.type_info);
    }
}

#[allow(dead_code)]
fn assert_thread_safe() {
    fn impl_bounds<T: Send + Sync + 'static>() {}

    impl_bounds::<(Session, Registry)>();
}
