use alloc::boxed::Box;
use core::{convert::Infallible, future::Future, pin::Pin};

use crate::service::{BoxCloneService, Service as _};

pub(crate) type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Erased service whose call hands out the future of the actual work.
pub(crate) type BoxCloneAsyncService<Input, Output, Error> = BoxCloneService<Input, BoxFuture<'static, Result<Output, Error>>, Infallible>;

impl<Input, Output, Error> BoxCloneService<Input, BoxFuture<'static, Result<Output, Error>>, Infallible> {
    #[inline]
    pub(crate) fn call_async(&mut self, input: Input) -> BoxFuture<'static, Result<Output, Error>> {
        match self.call(input) {
            Ok(future) => future,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use core::convert::Infallible;

    use super::{BoxCloneAsyncService, BoxFuture};
    use crate::service::{fn_service, BoxCloneService};

    #[tokio::test]
    async fn test_call_async() {
        let mut service: BoxCloneAsyncService<u8, u8, ()> = BoxCloneService::new(fn_service(|val: u8| {
            let future: BoxFuture<'static, Result<u8, ()>> = Box::pin(async move { Ok(val * 2) });
            Ok::<_, Infallible>(future)
        }));
        let mut cloned = service.clone();

        assert_eq!(service.call_async(21).await, Ok(42));
        assert_eq!(cloned.call_async(1).await, Ok(2));
    }
}
