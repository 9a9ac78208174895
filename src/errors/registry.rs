use alloc::boxed::Box;
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Types along a dependency cycle, in traversal order.
/// The first type is repeated at the end, so `A -> B -> A` holds three entries.
#[derive(Debug, Clone)]
pub struct CyclePath(pub Box<[TypeInfo]>);

impl CyclePath {
    #[inline]
    #[must_use]
    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.0.contains(type_info)
    }
}

impl Display for CyclePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut iter = self.0.iter();
        if let Some(first) = iter.next() {
            write!(f, "{}", first.short_name())?;
        }
        for type_info in iter {
            write!(f, " -> {}", type_info.short_name())?;
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryErrorKind {
    #[error("At least one container is required")]
    NoContainers,
    #[error("Containers don't declare any provider or context field")]
    EmptyContainer,
    #[error("Provider for {type_info} is declared more than once")]
    DuplicateProvider { type_info: TypeInfo },
    #[error("Dependency {dependency} of {requested_by} has no provider or context field")]
    UnresolvedDependency { dependency: TypeInfo, requested_by: TypeInfo },
    #[error("Cyclic dependency detected: {cycle}")]
    CyclicDependency { cycle: CyclePath },
    #[error("App-scoped {requested_by} depends on {dependency}, which only lives as long as a session")]
    ScopeMismatch { dependency: TypeInfo, requested_by: TypeInfo },
    #[cfg(feature = "async")]
    #[error("Sync provider {requested_by} depends on async provider {dependency}")]
    SyncDependsOnAsync { dependency: TypeInfo, requested_by: TypeInfo },
    #[error("Registry is already initialized")]
    DoubleInitialization,
}
