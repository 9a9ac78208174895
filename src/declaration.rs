use alloc::vec::Vec;
use core::{fmt, marker::PhantomData};

#[cfg(feature = "async")]
use crate::async_impl;
use crate::{
    any::TypeInfo,
    dependency::Dependency,
    dependency_resolver::DependencyResolver,
    errors::{InstantiateErrorKind, ResolveErrorKind},
    finalizer::{boxed_finalizer_factory, BoxedFinalizer, Finalizer},
    instantiator::{boxed_constructor, boxed_instantiator, BoxedCloneInstantiator, Constructible, Instantiator},
    scope::Scope,
};

#[derive(Clone)]
pub(crate) enum Factory {
    Sync(BoxedCloneInstantiator),
    #[cfg(feature = "async")]
    Async(async_impl::instantiator::BoxedCloneInstantiator),
}

/// Type-erased description of one buildable type.
#[derive(Clone)]
pub struct ProviderDeclaration {
    pub(crate) output_type: TypeInfo,
    pub(crate) scope: Scope,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) factory: Factory,
    pub(crate) finalizer: Option<BoxedFinalizer>,
}

impl ProviderDeclaration {
    #[inline]
    #[must_use]
    pub fn output_type(&self) -> TypeInfo {
        self.output_type
    }

    #[inline]
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[inline]
    #[must_use]
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    #[inline]
    #[must_use]
    pub fn has_finalizer(&self) -> bool {
        self.finalizer.is_some()
    }

    /// `true` if the factory `.await`s, so the type has to be resolved with [`crate::Session::resolve_async`].
    #[inline]
    #[must_use]
    pub fn is_async(&self) -> bool {
        match self.factory {
            Factory::Sync(_) => false,
            #[cfg(feature = "async")]
            Factory::Async(_) => true,
        }
    }

    #[cfg(feature = "async")]
    #[inline]
    pub(crate) fn async_factory(&self) -> Option<&async_impl::instantiator::BoxedCloneInstantiator> {
        match &self.factory {
            Factory::Async(factory) => Some(factory),
            Factory::Sync(_) => None,
        }
    }
}

impl fmt::Debug for ProviderDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDeclaration")
            .field("output_type", &self.output_type.short_name())
            .field("scope", &self.scope)
            .field("dependencies", &self.dependencies.iter().map(|dep| dep.type_info.short_name()).collect::<Vec<_>>())
            .field("finalizer", &self.finalizer.is_some())
            .field("is_async", &self.is_async())
            .finish()
    }
}

/// Typed builder of a [`ProviderDeclaration`] for `T`.
pub struct Provider<T> {
    declaration: ProviderDeclaration,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Provider<T>
where
    T: Send + Sync + 'static,
{
    fn new(factory: Factory, dependencies: Vec<Dependency>, scope: Scope) -> Self {
        Self {
            declaration: ProviderDeclaration {
                output_type: TypeInfo::of::<T>(),
                scope,
                dependencies,
                factory,
                finalizer: None,
            },
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.declaration.scope = scope;
        self
    }

    /// Adds a teardown hook, see [`Finalizer`].
    #[inline]
    #[must_use]
    pub fn finalizer(mut self, finalizer: impl Finalizer<T> + Send + Sync) -> Self {
        self.declaration.finalizer = Some(BoxedFinalizer::Sync(boxed_finalizer_factory(finalizer)));
        self
    }

    /// Adds a teardown hook that `.await`s, see [`async_impl::Finalizer`].
    #[cfg(feature = "async")]
    #[inline]
    #[must_use]
    pub fn async_finalizer(mut self, finalizer: impl async_impl::Finalizer<T> + Send + Sync) -> Self {
        self.declaration.finalizer = Some(BoxedFinalizer::Async(async_impl::finalizer::boxed_finalizer_factory(finalizer)));
        self
    }

    #[inline]
    #[must_use]
    pub fn into_declaration(self) -> ProviderDeclaration {
        self.declaration
    }
}

impl<T> From<Provider<T>> for ProviderDeclaration {
    #[inline]
    fn from(provider: Provider<T>) -> Self {
        provider.declaration
    }
}

/// Declares a provider built by `instantiator`, app-scoped unless [`Provider::scope`] says otherwise.
#[inline]
#[must_use]
pub fn provider<Inst, Deps>(instantiator: Inst) -> Provider<Inst::Provides>
where
    Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver<Error = ResolveErrorKind>,
{
    Provider::new(Factory::Sync(boxed_instantiator(instantiator)), Inst::dependencies(), Scope::App)
}

/// Shorthand for `provider(instantiator).scope(Scope::App)`.
#[inline]
#[must_use]
pub fn singleton<Inst, Deps>(instantiator: Inst) -> Provider<Inst::Provides>
where
    Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver<Error = ResolveErrorKind>,
{
    provider(instantiator).scope(Scope::App)
}

/// Declares `T` built by its own [`Constructible::construct`], request-scoped by default.
#[inline]
#[must_use]
pub fn transient<T: Constructible>() -> Provider<T> {
    Provider::new(Factory::Sync(boxed_constructor::<T>()), T::Dependencies::dependencies(), Scope::Request)
}

/// Declares a provider built by the async `instantiator`, app-scoped unless [`Provider::scope`] says otherwise.
#[cfg(feature = "async")]
#[inline]
#[must_use]
pub fn provider_async<Inst, Deps>(instantiator: Inst) -> Provider<Inst::Provides>
where
    Inst: async_impl::Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver<Error = ResolveErrorKind> + Send + 'static,
{
    Provider::new(
        Factory::Async(async_impl::instantiator::boxed_instantiator(instantiator)),
        Inst::dependencies(),
        Scope::App,
    )
}

/// Shorthand for `provider_async(instantiator).scope(Scope::App)`.
#[cfg(feature = "async")]
#[inline]
#[must_use]
pub fn singleton_async<Inst, Deps>(instantiator: Inst) -> Provider<Inst::Provides>
where
    Inst: async_impl::Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
    Inst::Provides: Send + Sync,
    Deps: DependencyResolver<Error = ResolveErrorKind> + Send + 'static,
{
    provider_async(instantiator).scope(Scope::App)
}
