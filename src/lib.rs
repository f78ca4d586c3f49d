//! Asynchronous iteration and control flow with bounded concurrency.
//!
//! `asyncflow` applies an asynchronous step to every item of a collection,
//! numeric range or task list while keeping at most a chosen number of steps
//! in flight. Results come back in input order, the first error wins, and
//! work already in flight is always allowed to drain before completion is
//! reported.
//!
//! The crate does not depend on any particular runtime. Steps report through
//! a [`Done`] handle whenever they are ready, on the same turn or any later
//! one, and the engine never blocks. Where something must run later (cached
//! replies, throttled calls) it goes through the small [`Defer`] and
//! [`Timer`] interfaces, for which [`EventLoop`], a `futures` local spawner
//! and, with the `tokio` feature, a tokio `LocalSet` are provided.
//!
//! Features include:
//! - A slot scheduler behind every operator, with unbounded, serial and
//!   limited variants of `for_each`, `map`, `filter`, `some`, `every`,
//!   `sort_by` and `execute`
//! - A concurrent binary [`reduce`](Flow::reduce) that keeps combination
//!   order intact whatever order combines finish in
//! - [`whilst`](Flow::whilst) and [`until`](Flow::until) loops over
//!   asynchronous iterations
//! - [`Memoized`], [`Throttled`] and [`Debounced`] wrappers
//! - [`completion`] to await any operator's result from async code
//!
//! # Example
//! ```
//! use asyncflow::{Defer, EventLoop, Flow};
//! use std::{cell::RefCell, rc::Rc};
//!
//! let el = EventLoop::new();
//! let kept = Rc::new(RefCell::new(None));
//!
//! let (queue, k) = (el.clone(), Rc::clone(&kept));
//! Flow::default().filter_limit(
//!     2,
//!     vec![1, 2, 3, 4, 5, 6],
//!     move |n: u32, done| queue.defer(Box::new(move || done.ok(n % 2 == 0))),
//!     move |res: Result<Vec<u32>, ()>| *k.borrow_mut() = Some(res),
//! );
//!
//! el.run();
//! assert_eq!(*kept.borrow(), Some(Ok(vec![2, 4, 6])));
//! ```

pub mod completion;
pub mod config;
pub mod defer;
pub mod error;
pub mod flow;
pub mod guard;
pub mod limit;
pub mod memoize;
pub mod outcome;
mod reduce;
mod scheduler;
pub mod source;
pub mod timing;
mod whilst;

pub use completion::{Completion, completion};
pub use config::{Config, GuardMode};
pub use defer::{Callback, Defer, EventLoop, Timer, TimerId};
#[cfg(feature = "tokio")]
pub use defer::TokioLocal;
pub use error::FlowError;
pub use flow::{Flow, Task, Tasks};
pub use guard::Done;
pub use limit::Limit;
pub use memoize::{Memoized, Reply, memoize};
pub use outcome::Outcome;
pub use source::{Source, Sparse};
pub use timing::{Debounced, Throttled, debounce, throttle};
