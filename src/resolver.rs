use alloc::sync::Arc;
use tracing::{debug, error, field, info_span};

use crate::{
    any::{Instance, TypeInfo},
    declaration::{Factory, ProviderDeclaration},
    errors::{InstantiatorErrorKind, ResolveErrorKind},
    registry::Entry,
    scope::Scope,
    service::Service as _,
    session::{Session, SessionState},
    store::{Resolved, ResolvedSet},
};

/// Resolves `type_info` in `session`, looking it up in this order:
/// bound context values, the scope cache, and at last the provider's factory.
pub(crate) fn resolve(session: &Session, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
    let span = info_span!("resolve", dependency = type_info.short_name(), scope = field::Empty);
    let _guard = span.enter();

    let declaration = {
        let mut data = session.inner.data.lock();
        if data.state == SessionState::Closed {
            let err = ResolveErrorKind::SessionClosed;
            error!("{}", err);
            return Err(err);
        }
        data.state = SessionState::Active;

        match session.registry().entry(&type_info) {
            None => {
                let err = ResolveErrorKind::UnknownType { type_info };
                error!("{}", err);
                return Err(err);
            }
            Some(Entry::ContextField) => {
                return match data.context.get_erased(&type_info) {
                    Some(dependency) => {
                        span.record("scope", "context");
                        debug!("Found in context");
                        Ok(dependency)
                    }
                    None => {
                        let err = ResolveErrorKind::ContextValueMissing { type_info };
                        error!("{}", err);
                        Err(err)
                    }
                };
            }
            Some(Entry::Provider(declaration)) => {
                span.record("scope", declaration.scope.name());
                if declaration.scope == Scope::Request {
                    if let Some(dependency) = data.requests.get(&type_info) {
                        debug!("Found in request cache");
                        return Ok(dependency);
                    }
                }
                declaration
            }
        }
    };

    match declaration.scope {
        Scope::App => resolve_app(session, declaration),
        Scope::Request => resolve_request(session, declaration),
    }
}

fn resolve_app(session: &Session, declaration: &ProviderDeclaration) -> Result<Instance, ResolveErrorKind> {
    let type_info = declaration.output_type;
    let app = &session.registry().inner.app;

    if let Some(dependency) = app.get(&type_info) {
        debug!("Found in app cache");
        return Ok(dependency);
    }

    let _in_progress = session.inner.enter(type_info)?;
    let (dependency, built) = app.get_or_build(type_info, || instantiate(session, declaration))?;

    if built {
        if let Some(finalizer) = &declaration.finalizer {
            app.push_resolved(Resolved {
                type_info,
                dependency: dependency.clone(),
                finalizer: finalizer.clone(),
            });
        }
        debug!("Cached in app scope");
    } else {
        debug!("Found in app cache");
    }

    Ok(dependency)
}

fn resolve_request(session: &Session, declaration: &ProviderDeclaration) -> Result<Instance, ResolveErrorKind> {
    let type_info = declaration.output_type;

    let _in_progress = session.inner.enter(type_info)?;
    let dependency = instantiate(session, declaration)?;

    let resolved = declaration.finalizer.as_ref().map(|finalizer| Resolved {
        type_info,
        dependency: dependency.clone(),
        finalizer: finalizer.clone(),
    });

    let mut data = session.inner.data.lock();
    if data.state == SessionState::Closed {
        drop(data);

        // Closed while the factory ran, the instance is never cached
        if let Some(resolved) = resolved {
            let mut resolved_set = ResolvedSet::new();
            resolved_set.push(resolved);
            resolved_set.finalize();
        }

        let err = ResolveErrorKind::SessionClosed;
        error!("{}", err);
        return Err(err);
    }

    data.requests.insert(type_info, dependency.clone());
    if let Some(resolved) = resolved {
        data.requests.push_resolved(resolved);
    }

    debug!("Cached in request scope");
    Ok(dependency)
}

fn instantiate(session: &Session, declaration: &ProviderDeclaration) -> Result<Instance, ResolveErrorKind> {
    let factory = match &declaration.factory {
        Factory::Sync(factory) => factory,
        #[cfg(feature = "async")]
        Factory::Async(_) => {
            let err = ResolveErrorKind::AsyncProvider {
                type_info: declaration.output_type,
            };
            error!("{}", err);
            return Err(err);
        }
    };

    match factory.clone().call(session.clone()) {
        Ok(dependency) => Ok(Arc::from(dependency)),
        Err(InstantiatorErrorKind::Deps(err)) => {
            error!("{}", err);
            Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Deps(err.into())))
        }
        Err(InstantiatorErrorKind::Factory(err)) => {
            error!("{}", err);
            Err(ResolveErrorKind::Instantiator(InstantiatorErrorKind::Factory(err)))
        }
    }
}
