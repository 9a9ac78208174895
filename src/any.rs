use alloc::{collections::BTreeMap, sync::Arc};
use core::{
    any::{type_name, Any, TypeId},
    cmp::Ordering,
    fmt::{self, Display, Formatter},
};
use once_cell::sync::OnceCell;

/// Identity of a Rust type used as a registry key.
///
/// Equality and ordering use only the [`TypeId`], so every generic
/// instantiation (`Wrapper<u8>`, `Wrapper<u16>`) is its own key.
/// The name is kept for diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct TypeInfo {
    pub name: &'static str,
    pub id: TypeId,
}

impl PartialEq for TypeInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeInfo {}

impl PartialOrd for TypeInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TypeInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Display for TypeInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl TypeInfo {
    #[inline]
    #[must_use]
    pub fn of<T>() -> Self
    where
        T: ?Sized + 'static,
    {
        Self {
            name: type_name::<T>(),
            id: TypeId::of::<T>(),
        }
    }

    #[inline]
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        // Tuples and multi-parameter generics hold several paths, keep them whole
        if self.name.contains(['(', ',']) {
            return self.name;
        }

        let path = self.name.split('<').next().unwrap_or(self.name);
        match path.rsplit_once("::") {
            Some((prefix, _)) => &self.name[prefix.len() + 2..],
            None => self.name,
        }
    }
}

pub(crate) type Instance = Arc<dyn Any + Send + Sync>;

pub(crate) type Map = BTreeMap<TypeInfo, Instance>;

pub(crate) type CellMap = BTreeMap<TypeInfo, Arc<OnceCell<Instance>>>;

#[cfg(feature = "async")]
pub(crate) type AsyncCellMap = BTreeMap<TypeInfo, Arc<tokio::sync::OnceCell<Instance>>>;
