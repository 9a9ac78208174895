use alloc::{collections::vec_deque::VecDeque, sync::Arc};
#[cfg(feature = "async")]
use core::future::Future;
use core::mem;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::debug;
#[cfg(feature = "async")]
use tracing::warn;

use crate::{
    any::{self, Instance, TypeInfo},
    finalizer::BoxedFinalizer,
    service::Service as _,
};

/// Instance built with a finalizer, waiting for its scope to end.
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) type_info: TypeInfo,
    pub(crate) dependency: Instance,
    pub(crate) finalizer: BoxedFinalizer,
}

#[derive(Default, Clone)]
pub(crate) struct ResolvedSet(pub(crate) VecDeque<Resolved>);

impl ResolvedSet {
    #[inline]
    pub(crate) fn new() -> Self {
        Self(VecDeque::new())
    }

    #[inline]
    pub(crate) fn push(&mut self, resolved: Resolved) {
        self.0.push_back(resolved);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Calls finalizers from the most recently built instance to the first one.
    /// Async finalizers can't run here and are skipped.
    pub(crate) fn finalize(mut self) {
        while let Some(Resolved {
            type_info,
            dependency,
            finalizer,
        }) = self.0.pop_back()
        {
            match finalizer {
                BoxedFinalizer::Sync(mut finalizer) => {
                    let _ = finalizer.call(dependency);
                    debug!(dependency = type_info.short_name(), "Finalizer called");
                }
                #[cfg(feature = "async")]
                BoxedFinalizer::Async(_) => {
                    warn!(dependency = type_info.short_name(), "Async finalizer skipped, close with `close_async` to run it");
                }
            }
        }
    }

    /// Same as [`Self::finalize`], awaiting async finalizers in turn.
    #[cfg(feature = "async")]
    pub(crate) async fn finalize_async(mut self) {
        while let Some(Resolved {
            type_info,
            dependency,
            finalizer,
        }) = self.0.pop_back()
        {
            match finalizer {
                BoxedFinalizer::Sync(mut finalizer) => {
                    let _ = finalizer.call(dependency);
                }
                BoxedFinalizer::Async(mut finalizer) => {
                    let _ = finalizer.call_async(dependency).await;
                }
            }
            debug!(dependency = type_info.short_name(), "Finalizer called");
        }
    }
}

/// Process-lifetime instances of app-scoped providers.
///
/// Every type gets its own [`OnceCell`], so a factory runs at most once per type and
/// concurrent first callers wait for that single run.
#[derive(Default)]
pub(crate) struct AppInstances {
    cells: Mutex<any::CellMap>,
    #[cfg(feature = "async")]
    async_cells: Mutex<any::AsyncCellMap>,
    resolved: Mutex<ResolvedSet>,
}

impl AppInstances {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn cell(&self, type_info: TypeInfo) -> Arc<OnceCell<Instance>> {
        self.cells.lock().entry(type_info).or_default().clone()
    }

    #[must_use]
    pub(crate) fn get(&self, type_info: &TypeInfo) -> Option<Instance> {
        let dependency = self.cells.lock().get(type_info).and_then(|cell| cell.get().cloned());
        #[cfg(feature = "async")]
        let dependency = dependency.or_else(|| self.async_cells.lock().get(type_info).and_then(|cell| cell.get().cloned()));
        dependency
    }

    /// Returns the cached instance or runs `build` and caches its result.
    /// The flag is `true` when the instance was built by this call.
    /// A failed build leaves the cell empty.
    pub(crate) fn get_or_build<E>(&self, type_info: TypeInfo, build: impl FnOnce() -> Result<Instance, E>) -> Result<(Instance, bool), E> {
        let cell = self.cell(type_info);
        let mut built = false;
        let instance = cell.get_or_try_init(|| {
            built = true;
            build()
        })?;
        Ok((instance.clone(), built))
    }

    /// Async counterpart of [`Self::get_or_build`]. Concurrent first callers await the single build.
    #[cfg(feature = "async")]
    pub(crate) async fn get_or_build_async<E, Fut>(&self, type_info: TypeInfo, build: impl FnOnce() -> Fut) -> Result<(Instance, bool), E>
    where
        Fut: Future<Output = Result<Instance, E>>,
    {
        let cell = self.async_cells.lock().entry(type_info).or_default().clone();
        let mut built = false;
        let instance = cell
            .get_or_try_init(|| {
                built = true;
                build()
            })
            .await?;
        Ok((instance.clone(), built))
    }

    #[inline]
    pub(crate) fn push_resolved(&self, resolved: Resolved) {
        self.resolved.lock().push(resolved);
    }

    #[inline]
    #[must_use]
    pub(crate) fn take_resolved_set(&self) -> ResolvedSet {
        mem::take(&mut *self.resolved.lock())
    }
}

/// Instances of request-scoped providers owned by one session.
#[derive(Default)]
pub(crate) struct RequestInstances {
    map: any::Map,
    resolved: ResolvedSet,
}

impl RequestInstances {
    #[inline]
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub(crate) fn get(&self, type_info: &TypeInfo) -> Option<Instance> {
        self.map.get(type_info).cloned()
    }

    #[inline]
    pub(crate) fn insert(&mut self, type_info: TypeInfo, dependency: Instance) -> Option<Instance> {
        self.map.insert(type_info, dependency)
    }

    #[inline]
    #[must_use]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub(crate) fn push_resolved(&mut self, resolved: Resolved) {
        self.resolved.push(resolved);
    }

    /// Drops cached instances and hands back the ones that wait for finalization.
    #[must_use]
    pub(crate) fn clear(&mut self) -> ResolvedSet {
        self.map.clear();
        mem::take(&mut self.resolved)
    }
}
