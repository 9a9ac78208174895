//! Erased, clonable callables behind factories and finalizers.

use alloc::boxed::Box;

/// One step that turns an `Input` into an output, possibly mutating its own state.
pub(crate) trait Service<Input> {
    type Output;
    type Error;

    fn call(&mut self, input: Input) -> Result<Self::Output, Self::Error>;
}

/// [`Service`] made from a closure.
#[derive(Clone)]
pub(crate) struct FnService<F>(F);

#[inline]
#[must_use]
pub(crate) const fn fn_service<F>(f: F) -> FnService<F> {
    FnService(f)
}

impl<F, Input, Output, Error> Service<Input> for FnService<F>
where
    F: FnMut(Input) -> Result<Output, Error>,
{
    type Output = Output;
    type Error = Error;

    #[inline]
    fn call(&mut self, input: Input) -> Result<Output, Error> {
        (self.0)(input)
    }
}

type DynCloneService<Input, Output, Error> = dyn CloneService<Input, Output = Output, Error = Error> + Send + Sync;

/// Boxed service whose clones get their own copy of the captured state.
pub(crate) struct BoxCloneService<Input, Output, Error>(pub(crate) Box<DynCloneService<Input, Output, Error>>);

impl<Input, Output, Error> BoxCloneService<Input, Output, Error> {
    #[inline]
    #[must_use]
    pub(crate) fn new<S>(service: S) -> Self
    where
        S: Service<Input, Output = Output, Error = Error> + Clone + Send + Sync + 'static,
    {
        Self(Box::new(service))
    }
}

pub(crate) trait CloneService<Input>: Service<Input> {
    fn boxed_clone(&self) -> Box<DynCloneService<Input, Self::Output, Self::Error>>;
}

impl<Input, S> CloneService<Input> for S
where
    S: Service<Input> + Clone + Send + Sync + 'static,
{
    #[inline]
    fn boxed_clone(&self) -> Box<DynCloneService<Input, S::Output, S::Error>> {
        Box::new(self.clone())
    }
}

impl<Input, Output, Error> Clone for BoxCloneService<Input, Output, Error> {
    #[inline]
    fn clone(&self) -> Self {
        Self(self.0.boxed_clone())
    }
}

impl<Input, Output, Error> Service<Input> for BoxCloneService<Input, Output, Error> {
    type Output = Output;
    type Error = Error;

    #[inline]
    fn call(&mut self, input: Input) -> Result<Output, Error> {
        self.0.call(input)
    }
}

#[cfg(test)]
mod tests {
    use core::convert::Infallible;

    use super::{fn_service, BoxCloneService, Service as _};

    #[test]
    fn test_fn_service() {
        let mut service = fn_service(|val: u8| Ok::<_, Infallible>(val * 2));

        assert_eq!(service.call(21).unwrap(), 42);
    }

    #[test]
    fn test_cloned_service_keeps_state_apart() {
        let mut counter = 0u8;
        let mut service: BoxCloneService<u8, u8, Infallible> = BoxCloneService::new(fn_service(move |step: u8| {
            counter += step;
            Ok(counter)
        }));
        let mut cloned = service.clone();

        assert_eq!(service.call(1).unwrap(), 1);
        assert_eq!(service.call(1).unwrap(), 2);
        assert_eq!(cloned.call(5).unwrap(), 5);
    }
}
