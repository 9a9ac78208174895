//! Declarative assembly of a [`crate::Container`].
//!
//! ```
//! use spritze::{container, Inject, Scope};
//!
//! struct RequestId(u64);
//! struct Config;
//! struct Greeter(std::sync::Arc<Config>, std::sync::Arc<RequestId>);
//!
//! let container = container! {
//!     scope(Scope::App) [
//!         provide(|| Ok(Config)),
//!     ],
//!     scope(Scope::Request) [
//!         provide(|Inject(config): Inject<Config>, Inject(id): Inject<RequestId>| Ok(Greeter(config, id))),
//!     ],
//!     context [ RequestId ],
//! }
//! .unwrap();
//!
//! assert_eq!(container.len(), 3);
//! ```

/// Builds a [`crate::Container`] from `scope(..) [ .. ]` and `context [ .. ]` sections.
///
/// Scope entries are `provide(factory)`, `provide(factory, finalizer = f)` or `transient(Type)`.
/// With the `async` feature, `provide_async(factory)` and `provide_async(factory, finalizer = f)` take async closures.
/// Every entry takes the scope of its section, `transient(Type)` included: inside `scope(Scope::App)`
/// it declares an app-scoped `Type` built by [`crate::Constructible::construct`].
/// The result is `Result<Container, ContainerErrorKind>`, failing on the first duplicate declaration.
#[macro_export]
macro_rules! container {
    () => {
        ::core::result::Result::<$crate::Container, $crate::ContainerErrorKind>::Ok($crate::Container::new())
    };

    ( $( $sections:tt )+ ) => {
        (|| -> ::core::result::Result<$crate::Container, $crate::ContainerErrorKind> {
            let mut container = $crate::Container::new();
            $crate::container_internal! { @sections container [ $( $sections )+ ] }
            ::core::result::Result::Ok(container)
        })()
    };
}

#[macro_export]
#[doc(hidden)]
macro_rules! container_internal {
    // Example: container_internal! { @sections container [] }
    (@sections $container:ident []) => {};

    // Example: container_internal! { @sections container [ scope(Scope::App) [ provide(f) ], .. ] }
    (@sections $container:ident [ scope($scope:expr) [ $( $entries:tt )* ] $(, $( $rest:tt )* )? ]) => {
        $crate::container_internal! { @entries $container, scope($scope) [ $( $entries )* ] }
        $crate::container_internal! { @sections $container [ $( $( $rest )* )? ] }
    };

    // Example: container_internal! { @sections container [ context [ RequestId, UserId ] ] }
    (@sections $container:ident [ context [ $( $field:ty ),* $(,)? ] $(, $( $rest:tt )* )? ]) => {
        $( $container.context_field::<$field>()?; )*
        $crate::container_internal! { @sections $container [ $( $( $rest )* )? ] }
    };

    (@entries $container:ident, scope($scope:expr) []) => {};

    // Example: container_internal! { @entries container, scope(Scope::App) [ provide(f, finalizer = g), .. ] }
    (@entries $container:ident, scope($scope:expr) [ provide( $( $entry:tt )+ ) $(, $( $rest:tt )* )? ]) => {
        $crate::container_internal! { @provide $container, scope($scope), $( $entry )+ }
        $crate::container_internal! { @entries $container, scope($scope) [ $( $( $rest )* )? ] }
    };

    // Example: container_internal! { @entries container, scope(Scope::App) [ provide_async(f, finalizer = g), .. ] }
    (@entries $container:ident, scope($scope:expr) [ provide_async( $( $entry:tt )+ ) $(, $( $rest:tt )* )? ]) => {
        $crate::container_internal! { @provide_async $container, scope($scope), $( $entry )+ }
        $crate::container_internal! { @entries $container, scope($scope) [ $( $( $rest )* )? ] }
    };

    // Example: container_internal! { @entries container, scope(Scope::Request) [ transient(Service), .. ] }
    (@entries $container:ident, scope($scope:expr) [ transient( $ty:ty ) $(, $( $rest:tt )* )? ]) => {
        $container.register($crate::transient::<$ty>().scope($scope))?;
        $crate::container_internal! { @entries $container, scope($scope) [ $( $( $rest )* )? ] }
    };

    (@provide $container:ident, scope($scope:expr), $inst:expr $(,)?) => {
        $container.register($crate::provider($inst).scope($scope))?;
    };
    (@provide $container:ident, scope($scope:expr), $inst:expr, finalizer = $fin:expr $(,)?) => {
        $container.register($crate::provider($inst).scope($scope).finalizer($fin))?;
    };

    (@provide_async $container:ident, scope($scope:expr), $inst:expr $(,)?) => {
        $container.register($crate::provider_async($inst).scope($scope))?;
    };
    (@provide_async $container:ident, scope($scope:expr), $inst:expr, finalizer = $fin:expr $(,)?) => {
        $container.register($crate::provider_async($inst).scope($scope).async_finalizer($fin))?;
    };
}
