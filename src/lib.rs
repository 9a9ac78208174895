extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod container;
pub(crate) mod declaration;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod errors;
pub(crate) mod finalizer;
pub(crate) mod global;
pub(crate) mod inject;
pub(crate) mod instantiator;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod scope;
pub(crate) mod service;
pub(crate) mod session;
pub(crate) mod store;

#[cfg(feature = "async")]
pub mod async_impl;
pub mod container_macros;
pub mod context;

pub use any::TypeInfo;
pub use container::Container;
pub use context::{Context, ContextField};
#[cfg(feature = "async")]
pub use declaration::{provider_async, singleton_async};
pub use declaration::{provider, singleton, transient, Provider, ProviderDeclaration};
pub use dependency::Dependency;
pub use dependency_resolver::DependencyResolver;
pub use errors::{ContainerErrorKind, CyclePath, InstantiateErrorKind, InstantiatorErrorKind, RegistryErrorKind, ResolveErrorKind};
pub use finalizer::Finalizer;
pub use global::{init, registry, session};
pub use inject::{inject, Handler, Inject, Injected};
pub use instantiator::{instance, Constructible, Instantiator};
pub use registry::Registry;
pub use scope::Scope;
pub use session::{Session, SessionState};
