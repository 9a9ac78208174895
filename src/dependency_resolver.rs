use alloc::vec::Vec;
#[cfg(feature = "async")]
use core::future::Future;

use super::errors::ResolveErrorKind;
use crate::{any::TypeInfo, context::Context, dependency::Dependency, Session};

/// A value that can be pulled out of a [`Session`] as a factory or handler argument.
pub trait DependencyResolver: Sized {
    type Error: Into<ResolveErrorKind>;

    fn resolve(session: &Session) -> Result<Self, Self::Error>;

    #[cfg(feature = "async")]
    fn resolve_async(session: &Session) -> impl Future<Output = Result<Self, Self::Error>> + Send;

    /// Same as [`Self::resolve`], but values present in `explicit` take precedence
    /// over the registry. Used by [`crate::Injected::call_with`].
    #[inline]
    fn resolve_with(session: &Session, explicit: &Context) -> Result<Self, Self::Error> {
        let _ = explicit;
        Self::resolve(session)
    }

    /// Ordered list of the types this resolver asks the session for.
    fn dependencies() -> Vec<Dependency>;

    #[inline]
    #[must_use]
    fn type_info() -> TypeInfo
    where
        Self: 'static,
    {
        TypeInfo::of::<Self>()
    }
}

macro_rules! impl_dependency_resolver {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut)]
        impl<$($ty,)*> DependencyResolver for ($($ty,)*)
        where
            $( $ty: DependencyResolver + Send, )*
        {
            type Error = ResolveErrorKind;

            #[inline]
            #[allow(unused_variables)]
            fn resolve(session: &Session) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve(session).map_err(Into::into)?,)*))
            }

            #[cfg(feature = "async")]
            #[allow(unused_variables)]
            async fn resolve_async(session: &Session) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve_async(session).await.map_err(Into::into)?,)*))
            }

            #[inline]
            #[allow(unused_variables)]
            fn resolve_with(session: &Session, explicit: &Context) -> Result<Self, Self::Error> {
                Ok(($($ty::resolve_with(session, explicit).map_err(Into::into)?,)*))
            }

            #[inline]
            fn dependencies() -> Vec<Dependency> {
                let mut dependencies = Vec::new();
                $( dependencies.extend($ty::dependencies()); )*
                dependencies
            }
        }
    };
}

all_the_tuples!(impl_dependency_resolver);
