use alloc::{sync::Arc, vec, vec::Vec};
#[cfg(feature = "async")]
use core::future::Future;
use core::{fmt, marker::PhantomData};
use tracing::debug;

use crate::{
    any::TypeInfo, context::Context, dependency::Dependency, dependency_resolver::DependencyResolver, errors::ResolveErrorKind,
    registry::Registry, session::Session,
};

/// Dependency marker: resolves `Dep` from the session and hands out the shared instance.
pub struct Inject<Dep>(pub Arc<Dep>);

impl<Dep: Send + Sync + 'static> DependencyResolver for Inject<Dep> {
    type Error = ResolveErrorKind;

    #[inline]
    fn resolve(session: &Session) -> Result<Self, Self::Error> {
        session.resolve().map(Self)
    }

    #[cfg(feature = "async")]
    #[inline]
    async fn resolve_async(session: &Session) -> Result<Self, Self::Error> {
        session.resolve_async().await.map(Self)
    }

    fn resolve_with(session: &Session, explicit: &Context) -> Result<Self, Self::Error> {
        match explicit.get::<Dep>() {
            Some(dependency) => {
                debug!(dependency = TypeInfo::of::<Dep>().short_name(), "Found in explicit arguments");
                Ok(Self(dependency))
            }
            None => Self::resolve(session),
        }
    }

    #[inline]
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::of::<Dep>()]
    }

    #[inline]
    fn type_info() -> TypeInfo {
        TypeInfo::of::<Dep>()
    }
}

impl<Dep> Clone for Inject<Dep> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<Dep: fmt::Debug> fmt::Debug for Inject<Dep> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Inject").field(&self.0).finish()
    }
}

/// User function whose arguments are all dependency resolvers.
pub trait Handler<Deps>: Clone + 'static
where
    Deps: DependencyResolver,
{
    type Output;

    fn handle(&mut self, dependencies: Deps) -> Self::Output;
}

macro_rules! impl_handler {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case)]
        impl<F, Output, $($ty,)*> Handler<($($ty,)*)> for F
        where
            F: FnMut($($ty,)*) -> Output + Clone + 'static,
            $( $ty: DependencyResolver + Send, )*
        {
            type Output = Output;

            #[inline]
            fn handle(&mut self, ($($ty,)*): ($($ty,)*)) -> Self::Output {
                self($($ty,)*)
            }
        }
    };
}

all_the_tuples!(impl_handler);

/// Function wrapped by [`inject`].
///
/// Its parameter list is computed once, when the function is wrapped.
pub struct Injected<F, Deps> {
    handler: F,
    parameters: Vec<Dependency>,
    _marker: PhantomData<fn() -> Deps>,
}

impl<F, Deps> Injected<F, Deps>
where
    F: Handler<Deps>,
    Deps: DependencyResolver<Error = ResolveErrorKind>,
{
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &[Dependency] {
        &self.parameters
    }

    /// Resolves every parameter in `session` and calls the function.
    ///
    /// # Errors
    /// Returns the first resolution error. The function isn't called then.
    pub fn call(&self, session: &Session) -> Result<F::Output, ResolveErrorKind> {
        let dependencies = Deps::resolve(session)?;
        Ok(self.handler.clone().handle(dependencies))
    }

    /// Same as [`Self::call`], but parameters whose type is present in `explicit`
    /// are taken from there instead of the session.
    ///
    /// # Errors
    /// Returns the first resolution error. The function isn't called then.
    pub fn call_with(&self, session: &Session, explicit: &Context) -> Result<F::Output, ResolveErrorKind> {
        let dependencies = Deps::resolve_with(session, explicit)?;
        Ok(self.handler.clone().handle(dependencies))
    }

    /// Resolves every parameter in `session`, awaiting async providers, then awaits the function's future.
    ///
    /// # Errors
    /// See [`Self::call`].
    #[cfg(feature = "async")]
    pub async fn call_async(&self, session: &Session) -> Result<<F::Output as Future>::Output, ResolveErrorKind>
    where
        F::Output: Future,
    {
        let dependencies = Deps::resolve_async(session).await?;
        Ok(self.handler.clone().handle(dependencies).await)
    }

    /// Opens a session in `registry`, calls the function in it and closes the session.
    ///
    /// # Errors
    /// See [`Self::call`].
    pub fn call_in(&self, registry: &Registry) -> Result<F::Output, ResolveErrorKind> {
        let session = registry.session();
        let output = self.call(&session);
        session.close();
        output
    }

    #[inline]
    pub fn inner(&self) -> &F {
        &self.handler
    }

    #[inline]
    pub fn into_inner(self) -> F {
        self.handler
    }
}

impl<F: Clone, Deps> Clone for Injected<F, Deps> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            parameters: self.parameters.clone(),
            _marker: PhantomData,
        }
    }
}

impl<F, Deps> fmt::Debug for Injected<F, Deps> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Injected").field("parameters", &self.parameters).finish_non_exhaustive()
    }
}

/// Wraps `handler` so its arguments are resolved from a session on every call.
#[inline]
#[must_use]
pub fn inject<F, Deps>(handler: F) -> Injected<F, Deps>
where
    F: Handler<Deps>,
    Deps: DependencyResolver<Error = ResolveErrorKind>,
{
    Injected {
        handler,
        parameters: Deps::dependencies(),
        _marker: PhantomData,
    }
}
