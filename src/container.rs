use alloc::collections::{BTreeMap, BTreeSet};
use core::iter;
use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    context::ContextField,
    declaration::{provider, transient, ProviderDeclaration},
    dependency_resolver::DependencyResolver,
    errors::{ContainerErrorKind, InstantiateErrorKind, RegistryErrorKind, ResolveErrorKind},
    instantiator::{Constructible, Instantiator},
    registry::Registry,
    scope::Scope,
};

/// Collection of provider and context field declarations, assembled before [`crate::init`].
///
/// Nothing is built here: registration only records declarations.
/// A type can be declared once per container, either as a provider or as a context field.
/// Declarations from several containers are joined by [`Registry::build`] or [`Container::merge`].
#[derive(Clone, Default)]
pub struct Container {
    pub(crate) providers: BTreeMap<TypeInfo, ProviderDeclaration>,
    pub(crate) context_fields: BTreeSet<TypeInfo>,
}

impl Container {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider declaration.
    ///
    /// # Errors
    /// Returns [`ContainerErrorKind::DuplicateProvider`] if the output type is already declared in this container.
    pub fn register(&mut self, declaration: impl Into<ProviderDeclaration>) -> Result<&mut Self, ContainerErrorKind> {
        let declaration = declaration.into();
        let type_info = declaration.output_type;

        self.check_vacant(type_info)?;
        debug!(dependency = type_info.short_name(), scope = declaration.scope.name(), "Provider registered");

        self.providers.insert(type_info, declaration);
        Ok(self)
    }

    /// Registers `instantiator` with the given scope.
    ///
    /// # Errors
    /// See [`Self::register`].
    #[inline]
    pub fn provide<Inst, Deps>(&mut self, instantiator: Inst, scope: Scope) -> Result<&mut Self, ContainerErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.register(provider(instantiator).scope(scope))
    }

    /// Registers an app-scoped `instantiator`.
    ///
    /// # Errors
    /// See [`Self::register`].
    #[inline]
    pub fn singleton<Inst, Deps>(&mut self, instantiator: Inst) -> Result<&mut Self, ContainerErrorKind>
    where
        Inst: Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind>,
    {
        self.provide(instantiator, Scope::App)
    }

    /// Registers the async `instantiator` with the given scope.
    ///
    /// # Errors
    /// See [`Self::register`].
    #[cfg(feature = "async")]
    #[inline]
    pub fn provide_async<Inst, Deps>(&mut self, instantiator: Inst, scope: Scope) -> Result<&mut Self, ContainerErrorKind>
    where
        Inst: crate::async_impl::Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind> + Send + 'static,
    {
        self.register(crate::declaration::provider_async(instantiator).scope(scope))
    }

    /// Registers an app-scoped async `instantiator`.
    ///
    /// # Errors
    /// See [`Self::register`].
    #[cfg(feature = "async")]
    #[inline]
    pub fn singleton_async<Inst, Deps>(&mut self, instantiator: Inst) -> Result<&mut Self, ContainerErrorKind>
    where
        Inst: crate::async_impl::Instantiator<Deps, Error = InstantiateErrorKind> + Send + Sync,
        Inst::Provides: Send + Sync,
        Deps: DependencyResolver<Error = ResolveErrorKind> + Send + 'static,
    {
        self.provide_async(instantiator, Scope::App)
    }

    /// Registers `T` with its own constructor, request-scoped.
    ///
    /// # Errors
    /// See [`Self::register`].
    #[inline]
    pub fn transient<T: Constructible>(&mut self) -> Result<&mut Self, ContainerErrorKind> {
        self.register(transient::<T>())
    }

    /// Declares `T` as a value bound per session instead of being built.
    ///
    /// # Errors
    /// See [`Self::register`].
    pub fn context_field<T: Send + Sync + 'static>(&mut self) -> Result<&mut Self, ContainerErrorKind> {
        let type_info = TypeInfo::of::<T>();

        self.check_vacant(type_info)?;
        debug!(dependency = type_info.short_name(), "Context field registered");

        self.context_fields.insert(type_info);
        Ok(self)
    }

    /// Same as [`Self::context_field`], taking the handle from [`crate::context::get`].
    ///
    /// # Errors
    /// See [`Self::register`].
    #[inline]
    pub fn add_context_field<T: Send + Sync + 'static>(&mut self, _field: ContextField<T>) -> Result<&mut Self, ContainerErrorKind> {
        self.context_field::<T>()
    }

    #[inline]
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        let type_info = TypeInfo::of::<T>();
        self.providers.contains_key(&type_info) || self.context_fields.contains(&type_info)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len() + self.context_fields.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Builds a registry from this container and `others`.
    ///
    /// # Errors
    /// See [`Registry::build`].
    #[inline]
    pub fn merge(self, others: impl IntoIterator<Item = Container>) -> Result<Registry, RegistryErrorKind> {
        Registry::build(iter::once(self).chain(others))
    }

    fn check_vacant(&self, type_info: TypeInfo) -> Result<(), ContainerErrorKind> {
        if self.providers.contains_key(&type_info) || self.context_fields.contains(&type_info) {
            let err = ContainerErrorKind::DuplicateProvider { type_info };
            error!("{}", err);
            return Err(err);
        }
        Ok(())
    }
}
