use once_cell::sync::OnceCell;
use tracing::{debug, error};

use crate::{
    container::Container,
    errors::{RegistryErrorKind, ResolveErrorKind},
    registry::Registry,
    session::Session,
};

static REGISTRY: OnceCell<Registry> = OnceCell::new();

/// Builds the process-wide registry from `containers`.
///
/// # Errors
/// - [`RegistryErrorKind::DoubleInitialization`] if the registry is already initialized
/// - any [`Registry::build`] error
pub fn init(containers: impl IntoIterator<Item = Container>) -> Result<&'static Registry, RegistryErrorKind> {
    if REGISTRY.get().is_some() {
        let err = RegistryErrorKind::DoubleInitialization;
        error!("{}", err);
        return Err(err);
    }

    let registry = Registry::build(containers)?;
    match REGISTRY.try_insert(registry) {
        Ok(registry) => {
            debug!(entries = registry.len(), "Global registry initialized");
            Ok(registry)
        }
        Err(_) => {
            let err = RegistryErrorKind::DoubleInitialization;
            error!("{}", err);
            Err(err)
        }
    }
}

/// Process-wide registry built by [`init`].
///
/// # Errors
/// Returns [`ResolveErrorKind::NotInitialized`] before [`init`] succeeded.
pub fn registry() -> Result<&'static Registry, ResolveErrorKind> {
    REGISTRY.get().ok_or_else(|| {
        let err = ResolveErrorKind::NotInitialized;
        error!("{}", err);
        err
    })
}

/// Opens a session in the process-wide registry.
///
/// # Errors
/// Returns [`ResolveErrorKind::NotInitialized`] before [`init`] succeeded.
#[inline]
pub fn session() -> Result<Session, ResolveErrorKind> {
    registry().map(Registry::session)
}
