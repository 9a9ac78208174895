use alloc::sync::Arc;
use tracing::{debug, error, info_span, Instrument as _};

use super::instantiator::BoxedCloneInstantiator;
use crate::{
    any::{Instance, TypeInfo},
    declaration::ProviderDeclaration,
    errors::{InstantiatorErrorKind, ResolveErrorKind},
    resolver,
    scope::Scope,
    session::{Session, SessionState},
    store::{Resolved, ResolvedSet},
};

/// Resolves `type_info` in `session`, awaiting async factories.
///
/// Context fields, unknown types and sync providers go through the sync resolver.
pub(crate) async fn resolve(session: &Session, type_info: TypeInfo) -> Result<Instance, ResolveErrorKind> {
    let Some((declaration, factory)) = session
        .registry()
        .get(&type_info)
        .and_then(|declaration| declaration.async_factory().map(|factory| (declaration, factory)))
    else {
        return resolver::resolve(session, type_info);
    };

    let span = info_span!("resolve_async", dependency = type_info.short_name(), scope = declaration.scope.name());
    resolve_provider(session, declaration, factory).instrument(span).await
}

async fn resolve_provider(
    session: &Session,
    declaration: &ProviderDeclaration,
    factory: &BoxedCloneInstantiator,
) -> Result<Instance, ResolveErrorKind> {
    let type_info = declaration.output_type;

    {
        let mut data = session.inner.data.lock();
        if data.state == SessionState::Closed {
            let err = ResolveErrorKind::SessionClosed;
            error!("{}", err);
            return Err(err);
        }
        data.state = SessionState::Active;

        if declaration.scope == Scope::Request {
            if let Some(dependency) = data.requests.get(&type_info) {
                debug!("Found in request cache");
                return Ok(dependency);
            }
        }
    }

    match declaration.scope {
        Scope::App => resolve_app(session, declaration, factory).await,
        Scope::Request => resolve_request(session, declaration, factory).await,
    }
}

async fn resolve_app(
    session: &Session,
    declaration: &ProviderDeclaration,
    factory: &BoxedCloneInstantiator,
) -> Result<Instance, ResolveErrorKind> {
    let type_info = declaration.output_type;
    let app = &session.registry().inner.app;

    if let Some(dependency) = app.get(&type_info) {
        debug!("Found in app cache");
        return Ok(dependency);
    }

    let _in_progress = session.inner.enter(type_info)?;
    let (dependency, built) = app.get_or_build_async(type_info, || instantiate(session, factory)).await?;

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

async fn resolve_request(
    session: &Session,
    declaration: &ProviderDeclaration,
    factory: &BoxedCloneInstantiator,
) -> Result<Instance, ResolveErrorKind> {
    let type_info = declaration.output_type;

    let _in_progress = session.inner.enter(type_info)?;
    let dependency = instantiate(session, factory).await?;

    let resolved = declaration.finalizer.as_ref().map(|finalizer| Resolved {
        type_info,
        dependency: dependency.clone(),
        finalizer: finalizer.clone(),
    });

    let closed_during_build = {
        let mut data = session.inner.data.lock();
        if data.state == SessionState::Closed {
            Some(resolved)
        } else {
            data.requests.insert(type_info, dependency.clone());
            if let Some(resolved) = resolved {
                data.requests.push_resolved(resolved);
            }
            None
        }
    };

    if let Some(resolved) = closed_during_build {
        // Closed while the factory ran, the instance is never cached
        if let Some(resolved) = resolved {
            let mut resolved_set = ResolvedSet::new();
            resolved_set.push(resolved);
            resolved_set.finalize_async().await;
        }

        let err = ResolveErrorKind::SessionClosed;
        error!("{}", err);
        return Err(err);
    }

    debug!("Cached in request scope");
    Ok(dependency)
}

async fn instantiate(session: &Session, factory: &BoxedCloneInstantiator) -> Result<Instance, ResolveErrorKind> {
    match factory.clone().call_async(session.clone()).await {
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
