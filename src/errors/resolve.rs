use alloc::boxed::Box;
use core::any::TypeId;

use super::instantiate::{InstantiateErrorKind, InstantiatorErrorKind};
use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug)]
pub enum ResolveErrorKind {
    #[error("Registry isn't initialized, call `spritze::init` first")]
    NotInitialized,
    #[error("No provider or context field registered for {type_info}")]
    UnknownType { type_info: TypeInfo },
    #[error("Context value for {type_info} isn't bound in the session")]
    ContextValueMissing { type_info: TypeInfo },
    #[error("{type_info} isn't declared as a context field")]
    NotContextField { type_info: TypeInfo },
    #[error("{type_info} was requested again while it is being constructed")]
    ReentrantResolution { type_info: TypeInfo },
    #[error("Session is closed")]
    SessionClosed,
    #[cfg(feature = "async")]
    #[error("{type_info} has an async provider, resolve it with `Session::resolve_async`")]
    AsyncProvider { type_info: TypeInfo },
    #[error("Incorrect provided type. Actual: {actual:?}, expected: {expected}")]
    IncorrectType { expected: TypeInfo, actual: TypeId },
    #[error(transparent)]
    Instantiator(InstantiatorErrorKind<Box<ResolveErrorKind>, InstantiateErrorKind>),
}

impl ResolveErrorKind {
    /// Innermost error, skipping the dependency chain that led to it.
    #[must_use]
    pub fn root_cause(&self) -> &ResolveErrorKind {
        match self {
            Self::Instantiator(InstantiatorErrorKind::Deps(err)) => err.root_cause(),
            other => other,
        }
    }
}
