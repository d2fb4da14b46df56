//! Keep a waiter pending for as long as a future runs.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;

use super::token::Token;
use super::Waiter;
use crate::error::Result;

/// Begin a token on `waiter` now and end it when `future` completes.
///
/// Dropping the returned future before it completes leaves the token pending
/// until the waiter is reset.
///
/// # Example
///
/// ```rust
/// use test_waiters::{wait_for_future, TestWaiter, Waiter, WaiterRegistry};
///
/// let registry = WaiterRegistry::new();
/// let waiter = TestWaiter::new("fetch", &registry);
///
/// let fut = wait_for_future(waiter.clone(), async { 7 }, Some("answer")).unwrap();
/// assert!(registry.has_pending_waiters());
///
/// assert_eq!(futures::executor::block_on(fut).unwrap(), 7);
/// assert!(!registry.has_pending_waiters());
/// ```
pub fn wait_for_future<W, F>(waiter: W, future: F, label: Option<&str>) -> Result<WaitForFuture<W, F>>
where
    W: Waiter,
    F: Future,
{
    let token = waiter.begin_async(None, label)?;
    Ok(WaitForFuture {
        waiter,
        token: Some(token),
        future,
    })
}

pin_project! {
    /// Future returned by [`wait_for_future`].
    ///
    /// Resolves to the inner output, or to the error raised while ending the
    /// token (for example when the waiter was reset in the meantime).
    pub struct WaitForFuture<W, F> {
        waiter: W,
        token: Option<Token>,
        #[pin]
        future: F,
    }
}

impl<W, F> WaitForFuture<W, F> {
    /// The token held pending by this future, until it completes.
    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }
}

impl<W, F> Future for WaitForFuture<W, F>
where
    W: Waiter,
    F: Future,
{
    type Output = Result<F::Output>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        match this.future.poll(cx) {
            Poll::Ready(output) => {
                let token = this.token.take().expect("polled after completion");
                this.waiter.end_async(&token)?;
                Poll::Ready(Ok(output))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WaiterRegistry;
    use crate::waiter::{NoopWaiter, TestWaiter};

    #[test]
    fn test_pending_until_complete() {
        let registry = WaiterRegistry::new();
        let waiter = TestWaiter::new("future", &registry);
        let (tx, rx) = futures::channel::oneshot::channel::<u8>();

        let mut fut = Box::pin(wait_for_future(waiter.clone(), rx, Some("recv")).unwrap());
        let waker = futures::task::noop_waker();
        let mut cx = Context::from_waker(&waker);

        assert!(fut.as_mut().poll(&mut cx).is_pending());
        assert_eq!(waiter.debug_info()[0].label.as_deref(), Some("recv"));

        tx.send(3).unwrap();
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(Ok(Ok(3))) => {}
            other => panic!("unexpected poll result: {other:?}"),
        }
        assert!(waiter.wait_until());
    }

    #[test]
    fn test_dropped_future_stays_pending() {
        let registry = WaiterRegistry::new();
        let waiter = TestWaiter::new("future", &registry);

        let fut = wait_for_future(waiter.clone(), async {}, None).unwrap();
        drop(fut);

        assert!(!waiter.wait_until());
        waiter.reset();
        assert!(waiter.wait_until());
    }

    #[test]
    fn test_reset_while_running_reports_error() {
        let registry = WaiterRegistry::new();
        let waiter = TestWaiter::new("future", &registry);

        let fut = wait_for_future(waiter.clone(), async { 1 }, None).unwrap();
        waiter.reset();

        let err = futures::executor::block_on(fut).unwrap_err();
        assert!(err.is_missing_begin());
    }

    #[test]
    fn test_noop_waiter() {
        let fut = wait_for_future(NoopWaiter::new("noop"), async { "done" }, None).unwrap();
        assert_eq!(futures::executor::block_on(fut).unwrap(), "done");
    }
}
