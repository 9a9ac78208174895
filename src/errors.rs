mod container;
mod instantiate;
mod registry;
mod resolve;

pub use container::ContainerErrorKind;
pub use instantiate::{InstantiateErrorKind, InstantiatorErrorKind};
pub use registry::{CyclePath, RegistryErrorKind};
pub use resolve::ResolveErrorKind;
