use alloc::{
    collections::{btree_map::Entry as MapEntry, BTreeMap, BTreeSet},
    sync::Arc,
    vec::Vec,
};
use core::fmt;
use tracing::{debug, error};

use crate::{
    any::TypeInfo,
    context::Context,
    declaration::ProviderDeclaration,
    dependency::Dependency,
    errors::{CyclePath, RegistryErrorKind, ResolveErrorKind},
    scope::Scope,
    session::Session,
    store::AppInstances,
    Container,
};

#[derive(Clone)]
pub(crate) enum Entry {
    Provider(ProviderDeclaration),
    ContextField,
}

/// Validated view of all declarations of one or more containers.
///
/// Built once, immutable afterwards. It also owns the app-scoped instances,
/// so they live as long as the registry does.
#[derive(Clone)]
pub struct Registry {
    pub(crate) inner: Arc<RegistryInner>,
}

pub(crate) struct RegistryInner {
    pub(crate) entries: BTreeMap<TypeInfo, Entry>,
    pub(crate) app: AppInstances,
}

impl Registry {
    /// Flattens `containers` and validates the dependency graph.
    ///
    /// # Errors
    /// - [`RegistryErrorKind::NoContainers`] if `containers` is empty
    /// - [`RegistryErrorKind::DuplicateProvider`] if two containers declare the same type
    /// - [`RegistryErrorKind::EmptyContainer`] if nothing is declared at all
    /// - [`RegistryErrorKind::UnresolvedDependency`] if a dependency has no provider or context field
    /// - [`RegistryErrorKind::CyclicDependency`] if the dependency graph has a cycle
    /// - [`RegistryErrorKind::ScopeMismatch`] if an app-scoped provider depends on a request-scoped provider or a context field
    /// - `RegistryErrorKind::SyncDependsOnAsync` if a sync provider depends on an async one (`async` feature)
    pub fn build(containers: impl IntoIterator<Item = Container>) -> Result<Self, RegistryErrorKind> {
        let entries = Self::flatten(containers).map_err(|err| {
            error!("{}", err);
            err
        })?;

        let registry = Self::new(entries);
        let validated = registry
            .check_dependencies()
            .and_then(|()| registry.dfs_detect())
            .and_then(|()| registry.check_scopes());
        #[cfg(feature = "async")]
        let validated = validated.and_then(|()| registry.check_async_dependencies());

        if let Err(err) = validated {
            error!("{}", err);
            return Err(err);
        }

        debug!(entries = registry.len(), "Registry built");
        Ok(registry)
    }

    fn new(entries: BTreeMap<TypeInfo, Entry>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                entries,
                app: AppInstances::new(),
            }),
        }
    }

    fn flatten(containers: impl IntoIterator<Item = Container>) -> Result<BTreeMap<TypeInfo, Entry>, RegistryErrorKind> {
        let mut entries = BTreeMap::new();
        let mut containers_count = 0usize;

        for Container { providers, context_fields } in containers {
            containers_count += 1;

            let declared = providers
                .into_iter()
                .map(|(type_info, declaration)| (type_info, Entry::Provider(declaration)))
                .chain(context_fields.into_iter().map(|type_info| (type_info, Entry::ContextField)));
            for (type_info, entry) in declared {
                match entries.entry(type_info) {
                    MapEntry::Vacant(vacant) => {
                        vacant.insert(entry);
                    }
                    MapEntry::Occupied(_) => return Err(RegistryErrorKind::DuplicateProvider { type_info }),
                }
            }
        }

        if containers_count == 0 {
            return Err(RegistryErrorKind::NoContainers);
        }
        if entries.is_empty() {
            return Err(RegistryErrorKind::EmptyContainer);
        }
        Ok(entries)
    }

    fn check_dependencies(&self) -> Result<(), RegistryErrorKind> {
        for (requested_by, declaration) in self.providers() {
            if let Some(Dependency { type_info }) = declaration
                .dependencies
                .iter()
                .find(|Dependency { type_info }| !self.inner.entries.contains_key(type_info))
            {
                return Err(RegistryErrorKind::UnresolvedDependency {
                    dependency: *type_info,
                    requested_by: *requested_by,
                });
            }
        }
        Ok(())
    }

    /// App instances outlive every session, so they can't capture session-bound values.
    fn check_scopes(&self) -> Result<(), RegistryErrorKind> {
        for (requested_by, declaration) in self.providers().filter(|(_, declaration)| declaration.scope == Scope::App) {
            let narrower = declaration.dependencies.iter().find(|Dependency { type_info }| {
                matches!(
                    self.inner.entries.get(type_info),
                    Some(Entry::ContextField) | Some(Entry::Provider(ProviderDeclaration { scope: Scope::Request, .. }))
                )
            });
            if let Some(Dependency { type_info }) = narrower {
                return Err(RegistryErrorKind::ScopeMismatch {
                    dependency: *type_info,
                    requested_by: *requested_by,
                });
            }
        }
        Ok(())
    }

    /// A sync factory resolves its dependencies without awaiting, so they have to be sync too.
    #[cfg(feature = "async")]
    fn check_async_dependencies(&self) -> Result<(), RegistryErrorKind> {
        for (requested_by, declaration) in self.providers().filter(|(_, declaration)| !declaration.is_async()) {
            let async_dependency = declaration
                .dependencies
                .iter()
                .find(|Dependency { type_info }| self.get(type_info).is_some_and(ProviderDeclaration::is_async));
            if let Some(Dependency { type_info }) = async_dependency {
                return Err(RegistryErrorKind::SyncDependsOnAsync {
                    dependency: *type_info,
                    requested_by: *requested_by,
                });
            }
        }
        Ok(())
    }

    fn dfs_detect(&self) -> Result<(), RegistryErrorKind> {
        let mut visited = BTreeSet::new();
        let mut stack = Vec::new();

        for type_info in self.inner.entries.keys() {
            if let Some(start) = self.dfs_visit(type_info, &mut visited, &mut stack) {
                let mut cycle = stack.split_off(start);
                cycle.push(cycle[0]);
                return Err(RegistryErrorKind::CyclicDependency {
                    cycle: CyclePath(cycle.into_boxed_slice()),
                });
            }
        }
        Ok(())
    }

    /// Returns the stack position where the detected cycle starts.
    fn dfs_visit(&self, type_info: &TypeInfo, visited: &mut BTreeSet<TypeInfo>, stack: &mut Vec<TypeInfo>) -> Option<usize> {
        if visited.contains(type_info) {
            return None;
        }
        if let Some(position) = stack.iter().position(|on_stack| on_stack == type_info) {
            return Some(position);
        }
        stack.push(*type_info);

        if let Some(Entry::Provider(declaration)) = self.inner.entries.get(type_info) {
            for Dependency { type_info } in &declaration.dependencies {
                if let Some(start) = self.dfs_visit(type_info, visited, stack) {
                    return Some(start);
                }
            }
        }

        stack.pop();
        visited.insert(*type_info);
        None
    }

    fn providers(&self) -> impl Iterator<Item = (&TypeInfo, &ProviderDeclaration)> {
        self.inner.entries.iter().filter_map(|(type_info, entry)| match entry {
            Entry::Provider(declaration) => Some((type_info, declaration)),
            Entry::ContextField => None,
        })
    }
}

impl Registry {
    /// Opens a new session with an empty context.
    #[inline]
    #[must_use]
    pub fn session(&self) -> Session {
        Session::new(self.clone(), Context::new())
    }

    /// Opens a new session with `context` already bound.
    ///
    /// # Errors
    /// Returns [`ResolveErrorKind::NotContextField`] if `context` holds a type that isn't declared as a context field.
    pub fn session_with_context(&self, context: Context) -> Result<Session, ResolveErrorKind> {
        if let Some(type_info) = context.types().find(|type_info| !self.is_context_field(type_info)) {
            let err = ResolveErrorKind::NotContextField { type_info: *type_info };
            error!("{}", err);
            return Err(err);
        }
        Ok(Session::new(self.clone(), context))
    }

    #[inline]
    #[must_use]
    pub fn contains<T: 'static>(&self) -> bool {
        self.inner.entries.contains_key(&TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn get(&self, type_info: &TypeInfo) -> Option<&ProviderDeclaration> {
        match self.inner.entries.get(type_info) {
            Some(Entry::Provider(declaration)) => Some(declaration),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn scope_of(&self, type_info: &TypeInfo) -> Option<Scope> {
        self.get(type_info).map(ProviderDeclaration::scope)
    }

    #[inline]
    #[must_use]
    pub fn is_context_field(&self, type_info: &TypeInfo) -> bool {
        matches!(self.inner.entries.get(type_info), Some(Entry::ContextField))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    #[inline]
    pub(crate) fn entry(&self, type_info: &TypeInfo) -> Option<&Entry> {
        self.inner.entries.get(type_info)
    }

    /// Calls finalizers of the built app-scoped instances in LIFO order.
    ///
    /// # Warning
    /// Each call only finalizes instances built since the previous call, so every instance is finalized once.
    /// Instances stay cached and are still resolvable afterwards. Dropping the last handle closes the registry.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Same as [`Self::close`], but async finalizers are awaited instead of skipped.
    #[cfg(feature = "async")]
    pub async fn close_async(&self) {
        self.inner.app.take_resolved_set().finalize_async().await;
        debug!("Registry closed");
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("entries", &self.len()).finish_non_exhaustive()
    }
}

impl RegistryInner {
    fn close(&self) {
        self.app.take_resolved_set().finalize();
        debug!("Registry closed");
    }
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
impl Registry {
    /// Skips graph validation, to exercise resolver-side guards.
    pub(crate) fn build_unchecked(containers: impl IntoIterator<Item = Container>) -> Self {
        let mut entries = BTreeMap::new();
        for Container { providers, .. } in containers {
            for (type_info, declaration) in providers {
                entries.insert(type_info, Entry::Provider(declaration));
            }
        }
        Self::new(entries)
    }
}
