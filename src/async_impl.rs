//! Providers and finalizers that `.await`, enabled by the `async` feature.
//!
//! Async providers are declared with [`crate::provider_async`] and resolved with
//! [`crate::Session::resolve_async`]. Sync providers resolve on the async path too,
//! but a sync provider can't depend on an async one.

pub(crate) mod finalizer;
pub(crate) mod instantiator;
pub(crate) mod resolver;
pub(crate) mod service;

pub use finalizer::Finalizer;
pub use instantiator::Instantiator;
