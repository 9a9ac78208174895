/// Error returned by user factories.
///
/// Any [`anyhow::Error`] converts into it, so factories can use `?` on most error types
/// after `.map_err(anyhow::Error::from)` or `anyhow::Context`.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}

/// Failure of an erased factory: either one of its dependencies or the factory itself.
#[derive(thiserror::Error, Debug)]
pub enum InstantiatorErrorKind<DepsErr, FactoryErr> {
    #[error(transparent)]
    Deps(DepsErr),
    #[error(transparent)]
    Factory(FactoryErr),
}

impl<DepsErr, FactoryErr> InstantiatorErrorKind<DepsErr, FactoryErr> {
    #[inline]
    #[must_use]
    pub fn is_factory(&self) -> bool {
        matches!(self, Self::Factory(_))
    }
}
