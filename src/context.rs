//! Values supplied from outside the registry for the duration of one session.
//!
//! A type becomes a context field when a container declares it with
//! [`crate::Container::context_field`] or [`crate::Container::add_context_field`].
//! Resolving it reads the value bound in the active [`Session`] instead of calling a factory,
//! and resolving it before anything was bound fails with
//! [`ResolveErrorKind::ContextValueMissing`].

use alloc::sync::Arc;
use core::{fmt, marker::PhantomData};
use tracing::error;

use crate::{
    any::{self, Instance, TypeInfo},
    errors::ResolveErrorKind,
    Session,
};

/// Typed value map, keyed by the value type.
///
/// Used as the session context and as the set of explicit arguments of
/// [`crate::Injected::call_with`].
#[derive(Clone, Default)]
pub struct Context {
    pub(crate) map: any::Map,
}

impl Context {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self { map: any::Map::new() }
    }

    #[inline]
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<Arc<T>> {
        self.insert_rc(Arc::new(value))
    }

    #[inline]
    pub fn insert_rc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) -> Option<Arc<T>> {
        self.map
            .insert(TypeInfo::of::<T>(), value)
            .and_then(|boxed| boxed.downcast().ok())
    }

    #[inline]
    #[must_use]
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.map
            .get(&TypeInfo::of::<T>())
            .and_then(|boxed| boxed.clone().downcast().ok())
    }

    #[inline]
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.map.contains_key(&TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub(crate) fn get_erased(&self, type_info: &TypeInfo) -> Option<Instance> {
        self.map.get(type_info).cloned()
    }

    #[inline]
    pub(crate) fn types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.map.keys()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.map.keys().map(TypeInfo::short_name)).finish()
    }
}

/// Handle to a context value of type `T`.
///
/// It is not the value itself: the value is looked up in a session on every [`Self::resolve`].
pub struct ContextField<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ContextField<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ContextField<T> {}

impl<T> fmt::Debug for ContextField<T>
where
    T: 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ContextField").field(&TypeInfo::of::<T>().short_name()).finish()
    }
}

impl<T> Default for ContextField<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ContextField<T> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { _marker: PhantomData }
    }
}

impl<T: Send + Sync + 'static> ContextField<T> {
    #[inline]
    #[must_use]
    pub fn type_info(&self) -> TypeInfo {
        TypeInfo::of::<T>()
    }

    /// Binds `value` in `session`, returning the previously bound one.
    ///
    /// # Errors
    /// See [`Session::bind`].
    #[inline]
    pub fn bind(&self, session: &Session, value: T) -> Result<Option<Arc<T>>, ResolveErrorKind> {
        session.bind(value)
    }

    /// Reads the value bound in `session`.
    ///
    /// # Errors
    /// - [`ResolveErrorKind::ContextValueMissing`] if nothing is bound yet
    /// - [`ResolveErrorKind::NotContextField`] if `T` isn't declared as a context field
    /// - [`ResolveErrorKind::SessionClosed`] if the session is closed
    #[inline]
    pub fn resolve(&self, session: &Session) -> Result<Arc<T>, ResolveErrorKind> {
        if !session.registry().is_context_field(&self.type_info()) {
            let err = ResolveErrorKind::NotContextField {
                type_info: self.type_info(),
            };
            error!("{}", err);
            return Err(err);
        }
        session.resolve()
    }
}

/// Returns the handle of the context field `T`.
#[inline]
#[must_use]
pub const fn get<T>() -> ContextField<T> {
    ContextField::new()
}

#[cfg(test)]
mod tests {
    use alloc::sync::Arc;

    use super::{get, Context};
    use crate::{Container, Registry, ResolveErrorKind};

    #[derive(Debug, PartialEq)]
    struct RequestId(&'static str);

    struct Logger;

    #[test]
    fn test_context_insert_replaces() {
        let mut context = Context::new();
        assert!(context.insert(RequestId("a")).is_none());

        let previous = context.insert(RequestId("b")).unwrap();
        assert_eq!(*previous, RequestId("a"));
        assert_eq!(*context.get::<RequestId>().unwrap(), RequestId("b"));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_context_insert_rc_keeps_identity() {
        let mut context = Context::new();
        let value = Arc::new(RequestId("a"));
        context.insert_rc(value.clone());

        assert!(Arc::ptr_eq(&value, &context.get::<RequestId>().unwrap()));
        assert!(context.contains::<RequestId>());
        assert!(!context.contains::<Logger>());
    }

    #[test]
    fn test_field_resolve() {
        let mut container = Container::new();
        container.context_field::<RequestId>().unwrap();
        container.singleton(|| Ok(Logger)).unwrap();
        let registry = Registry::build([container]).unwrap();
        let session = registry.session();

        let request_id = get::<RequestId>();
        assert!(matches!(
            request_id.resolve(&session),
            Err(ResolveErrorKind::ContextValueMissing { .. })
        ));

        request_id.bind(&session, RequestId("req-1")).unwrap();
        assert_eq!(*request_id.resolve(&session).unwrap(), RequestId("req-1"));

        assert!(matches!(
            get::<Logger>().resolve(&session),
            Err(ResolveErrorKind::NotContextField { .. })
        ));
    }
}
