//! Bridge from completion callbacks to futures.
//!
//! Every operator reports through a completion callback. [`completion`]
//! produces a matching pair: a callback to hand to the operator and a
//! [`Completion`] future that resolves with whatever the callback receives,
//! so results can be awaited from async code running on any executor.
//!
//! # Example
//! ```
//! # use asyncflow::{Flow, completion};
//! # futures_lite::future::block_on(async {
//! let (on_done, result) = completion::<Result<Vec<i32>, ()>>();
//! Flow::default().map_series(
//!     vec![1, 2, 3],
//!     |n: i32, done| done.ok(n + 1),
//!     on_done,
//! );
//! assert_eq!(result.await, Ok(Ok(vec![2, 3, 4])));
//! # });
//! ```

use std::{pin::Pin, task::Context, task::Poll};

use futures::channel::oneshot::{self, Canceled, Receiver};
use pin_project_lite::pin_project;

pin_project! {
    /// A future resolving with the value passed to its paired callback.
    ///
    /// Resolves to `Err(Canceled)` if the callback is dropped without being
    /// called, for example when an operator is abandoned mid-run.
    #[must_use = "futures do nothing unless polled or .awaited"]
    pub struct Completion<T> {
        #[pin]
        receiver: Receiver<T>,
    }
}

/// Creates a completion callback and the future that observes it.
pub fn completion<T: 'static>() -> (impl FnOnce(T) + 'static, Completion<T>) {
    let (sender, receiver) = oneshot::channel();
    let on_done = move |value: T| {
        if sender.send(value).is_err() {
            tracing::trace!("completion dropped before the result arrived");
        }
    };
    (on_done, Completion { receiver })
}

impl<T> Future for Completion<T> {
    type Output = Result<T, Canceled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.project().receiver.poll(cx)
    }
}
