/// Lifecycle policy of a provided instance.
///
/// - [`Scope::App`]: built at most once and shared for the registry lifetime.
/// - [`Scope::Request`]: built at most once per [`crate::Session`] and dropped with it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Scope {
    #[default]
    App,
    Request,
}

impl Scope {
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Scope::App => "app",
            Scope::Request => "request",
        }
    }

    #[inline]
    #[must_use]
    pub const fn priority(&self) -> u8 {
        *self as u8
    }
}
