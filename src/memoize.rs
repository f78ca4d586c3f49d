//! Caching of asynchronous results.

use std::{cell::RefCell, collections::HashMap, fmt, hash::Hash, rc::Rc};

use crate::Defer;

/// Completion callback of a memoized function.
pub type Reply<T, E> = Box<dyn FnOnce(Result<T, E>)>;

struct Memo<A, K, T, E> {
    defer: Box<dyn Defer>,
    key: Box<dyn Fn(&A) -> K>,
    func: Box<dyn Fn(A, Reply<T, E>)>,
    cache: Rc<RefCell<HashMap<K, Result<T, E>>>>,
}

/// An asynchronous function whose results are cached by key.
///
/// Calls with a cached key reply with the stored result on a later turn of
/// the [`Defer`] the wrapper was built with, without calling through. Other
/// calls go through to the wrapped function, and the first result reported
/// for a key is stored. Concurrent misses on the same key all call through;
/// whichever reports first is kept. Errors are cached like values.
///
/// Clones share the same cache.
pub struct Memoized<A, K, T, E> {
    memo: Rc<Memo<A, K, T, E>>,
}

impl<A, K, T, E> Clone for Memoized<A, K, T, E> {
    fn clone(&self) -> Self {
        Self {
            memo: Rc::clone(&self.memo),
        }
    }
}

impl<A, K, T, E> fmt::Debug for Memoized<A, K, T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memoized")
            .field("cached", &self.memo.cache.borrow().len())
            .finish()
    }
}

/// Memoizes `func`, keyed by the string form of its argument.
///
/// Arguments that print the same share a cache entry.
pub fn memoize<A, T, E>(
    defer: impl Defer + 'static,
    func: impl Fn(A, Reply<T, E>) + 'static,
) -> Memoized<A, String, T, E>
where
    A: ToString + 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    Memoized::with_key(defer, |args: &A| args.to_string(), func)
}

impl<A, K, T, E> Memoized<A, K, T, E>
where
    A: 'static,
    K: Eq + Hash + 'static,
    T: Clone + 'static,
    E: Clone + 'static,
{
    /// Memoizes `func`, computing cache keys with `key`.
    pub fn with_key(
        defer: impl Defer + 'static,
        key: impl Fn(&A) -> K + 'static,
        func: impl Fn(A, Reply<T, E>) + 'static,
    ) -> Self {
        Self {
            memo: Rc::new(Memo {
                defer: Box::new(defer),
                key: Box::new(key),
                func: Box::new(func),
                cache: Rc::default(),
            }),
        }
    }

    /// Calls the function, or replies from the cache.
    pub fn call(&self, args: A, reply: impl FnOnce(Result<T, E>) + 'static) {
        let key = (self.memo.key)(&args);
        let hit = self.memo.cache.borrow().get(&key).cloned();
        if let Some(result) = hit {
            tracing::trace!("memoized result reused");
            self.memo.defer.defer(Box::new(move || reply(result)));
            return;
        }
        let cache = Rc::clone(&self.memo.cache);
        (self.memo.func)(
            args,
            Box::new(move |result: Result<T, E>| {
                cache
                    .borrow_mut()
                    .entry(key)
                    .or_insert_with(|| result.clone());
                reply(result);
            }),
        );
    }

    /// Drops every cached result.
    pub fn clear(&self) {
        self.memo.cache.borrow_mut().clear();
    }

    /// Number of cached results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.memo.cache.borrow().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memo.cache.borrow().is_empty()
    }
}
