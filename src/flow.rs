//! Defines the `Flow` engine and its iteration operators.
//!
//! Every operator comes in three flavors that differ only in concurrency
//! policy: unbounded (`map`), serial (`map_series`) and bounded
//! (`map_limit`). All of them delegate to the slot scheduler and differ only
//! in how per-job outcomes are accumulated into the final result.
//!
//! Steps receive the item and a [`Done`] handle, and report through the
//! handle whenever they like, before returning or on a later turn. Results
//! always follow input order, regardless of completion order. On error the
//! completion callback receives only the first error, never a partial result.
//!
//! Holes in the input (see [`Sparse`](crate::Sparse)) start no job and
//! contribute no entry to any result.

use std::{
    cell::{Cell, RefCell},
    cmp::Ordering,
    rc::Rc,
};

use crate::{
    Config, Done, Limit, Outcome, Source, Sparse,
    scheduler::{self, Direction, JobDone},
};

/// A job of [`Flow::execute`]: a callable that reports through its handle.
pub type Task<R, E> = Box<dyn FnOnce(Done<R, E>)>;

/// Ordered list of [`Task`]s, some positions possibly empty.
///
/// Empty positions are skipped by [`Flow::execute`] and leave no entry in its
/// result.
pub struct Tasks<R, E> {
    tasks: Vec<Option<Task<R, E>>>,
}

impl<R, E> Tasks<R, E> {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Appends a task.
    #[must_use]
    pub fn task(mut self, task: impl FnOnce(Done<R, E>) + 'static) -> Self {
        self.tasks.push(Some(Box::new(task)));
        self
    }

    /// Appends an empty position.
    #[must_use]
    pub fn skip(mut self) -> Self {
        self.tasks.push(None);
        self
    }

    /// Number of positions, empty ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` if there are no positions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl<R, E> Default for Tasks<R, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, E> From<Vec<Option<Task<R, E>>>> for Tasks<R, E> {
    fn from(tasks: Vec<Option<Task<R, E>>>) -> Self {
        Self { tasks }
    }
}

impl<R, E> From<Vec<Task<R, E>>> for Tasks<R, E> {
    fn from(tasks: Vec<Task<R, E>>) -> Self {
        Self {
            tasks: tasks.into_iter().map(Some).collect(),
        }
    }
}

impl<R, E> FromIterator<Task<R, E>> for Tasks<R, E> {
    fn from_iter<I: IntoIterator<Item = Task<R, E>>>(iter: I) -> Self {
        Self {
            tasks: iter.into_iter().map(Some).collect(),
        }
    }
}

/// The iteration engine.
///
/// A `Flow` carries the [`Config`] every run it starts uses. It holds no
/// per-run state, so one engine can drive any number of runs, including
/// nested ones.
///
/// # Example
/// ```
/// # use asyncflow::{Flow, EventLoop, Defer};
/// # use std::{cell::RefCell, rc::Rc};
/// let flow = Flow::default();
/// let el = EventLoop::new();
/// let result = Rc::new(RefCell::new(None));
///
/// let (queue, r) = (el.clone(), Rc::clone(&result));
/// flow.map_limit(
///     2,
///     vec![1, 2, 3],
///     move |n: i32, done| queue.defer(Box::new(move || done.ok(n * 10))),
///     move |res: Result<Vec<i32>, ()>| *r.borrow_mut() = Some(res),
/// );
///
/// el.run();
/// assert_eq!(*result.borrow(), Some(Ok(vec![10, 20, 30])));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Flow {
    config: Config,
}

impl Flow {
    /// Creates an engine with the given configuration.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns the engine's configuration.
    pub fn config(&self) -> Config {
        self.config
    }

    // Hands the item at `index` to `step` behind a guarded handle whose
    // values are fed to `accept`. Holes complete immediately.
    fn start_item<S, R, E>(
        &self,
        source: &S,
        index: usize,
        job: JobDone<E>,
        step: &mut impl FnMut(S::Item, Done<R, E>),
        accept: impl Fn(usize, R) -> Outcome<(), E> + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        let Some(item) = source.get(index) else {
            job.report(Outcome::Value(()));
            return;
        };
        let done = Done::new(index, self.config.guard_mode(), move |outcome| {
            let outcome = match outcome {
                Outcome::Value(v) => accept(index, v),
                Outcome::Error(e) => Outcome::Error(e),
                Outcome::Break => Outcome::Break,
            };
            job.report(outcome);
        });
        step(item, done);
    }

    fn each<S, E>(
        &self,
        limit: Limit,
        direction: Direction,
        source: S,
        mut step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        let flow = *self;
        scheduler::run(
            limit,
            source.len(),
            direction,
            move |index, job| {
                flow.start_item(&source, index, job, &mut step, |_, ()| Outcome::Value(()));
            },
            move |error| on_done(error.map_or(Ok(()), Err)),
        );
    }

    /// Runs `step` for every item with no concurrency bound.
    pub fn for_each<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.for_each_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Runs `step` for every item, one at a time.
    pub fn for_each_series<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.for_each_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Runs `step` for every item with at most `limit` jobs in flight.
    ///
    /// `on_done` receives the first error, or `Ok(())` once every started job
    /// has reported. A break ends the run successfully.
    pub fn for_each_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.each(limit.into(), Direction::Forward, source, step, on_done);
    }

    /// Like [`for_each`](Flow::for_each), starting jobs from the last item.
    pub fn for_each_right<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.for_each_right_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Like [`for_each_series`](Flow::for_each_series), starting from the last item.
    pub fn for_each_right_series<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.for_each_right_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Like [`for_each_limit`](Flow::for_each_limit), starting from the last item.
    pub fn for_each_right_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<(), E>) + 'static,
        on_done: impl FnOnce(Result<(), E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.each(limit.into(), Direction::Backward, source, step, on_done);
    }

    /// Maps every item with no concurrency bound.
    pub fn map<S, R, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Maps every item, one at a time.
    pub fn map_series<S, R, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Maps every item with at most `limit` jobs in flight.
    ///
    /// The result holds one value per present item, in input order. After a
    /// break it holds the values of the jobs that reported one. Use
    /// [`map_sparse_limit`](Flow::map_sparse_limit) to keep values at the
    /// positions of their items when the input has holes.
    pub fn map_limit<S, R, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_slots(limit.into(), source, step, move |slots| {
            on_done(slots.map(|slots| slots.into_iter().flatten().collect()));
        });
    }

    /// Maps every item with no concurrency bound, keeping positions.
    pub fn map_sparse<S, R, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_sparse_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Maps every item one at a time, keeping positions.
    pub fn map_sparse_series<S, R, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_sparse_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Maps every item with at most `limit` jobs in flight, keeping positions.
    ///
    /// The result has the input's length and holds each value at the index
    /// of its item. Holes stay holes, as do items whose job had not reported
    /// a value when a break stopped the run.
    pub fn map_sparse_limit<S, R, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        self.map_slots(limit.into(), source, step, move |slots| {
            on_done(slots.map(Sparse::from));
        });
    }

    fn map_slots<S, R, E>(
        &self,
        limit: Limit,
        source: S,
        mut step: impl FnMut(S::Item, Done<R, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<Option<R>>, E>) + 'static,
    ) where
        S: Source,
        R: 'static,
        E: 'static,
    {
        let results = Rc::new(RefCell::new(empty_slots::<R>(source.len())));
        let collected = Rc::clone(&results);
        let flow = *self;
        scheduler::run(
            limit,
            source.len(),
            Direction::Forward,
            move |index, job| {
                let results = Rc::clone(&results);
                flow.start_item(&source, index, job, &mut step, move |i, v| {
                    if let Some(slot) = results.borrow_mut().get_mut(i) {
                        *slot = Some(v);
                    }
                    Outcome::Value(())
                });
            },
            move |error| match error {
                Some(e) => on_done(Err(e)),
                None => on_done(Ok(collected.take())),
            },
        );
    }

    /// Keeps the items `step` accepts, with no concurrency bound.
    pub fn filter<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.filter_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Keeps the items `step` accepts, testing one at a time.
    pub fn filter_series<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.filter_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Keeps the items `step` accepts, with at most `limit` tests in flight.
    ///
    /// The result is the subsequence of accepted items in input order.
    pub fn filter_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        mut step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        let len = source.len();
        let source = Rc::new(source);
        let keep = Rc::new(RefCell::new(vec![false; len]));
        let (items, kept) = (Rc::clone(&source), Rc::clone(&keep));
        let flow = *self;
        scheduler::run(
            limit.into(),
            len,
            Direction::Forward,
            move |index, job| {
                let keep = Rc::clone(&keep);
                flow.start_item(&*source, index, job, &mut step, move |i, accepted| {
                    if let Some(slot) = keep.borrow_mut().get_mut(i) {
                        *slot = accepted;
                    }
                    Outcome::Value(())
                });
            },
            move |error| match error {
                Some(e) => on_done(Err(e)),
                None => {
                    let kept = kept.take();
                    let result = (0..len)
                        .filter(|&i| kept[i])
                        .filter_map(|i| items.get(i))
                        .collect();
                    on_done(Ok(result));
                }
            },
        );
    }

    /// Resolves `true` as soon as `step` accepts any item, no concurrency bound.
    pub fn some<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.some_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Resolves `true` as soon as `step` accepts any item, testing one at a time.
    pub fn some_series<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.some_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Resolves `true` as soon as `step` accepts any item, with at most
    /// `limit` tests in flight.
    ///
    /// The first acceptance stops the run: no further tests are started, the
    /// ones in flight are waited for. When nothing is accepted every present
    /// item is tested exactly once before resolving `false`.
    pub fn some_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.short_circuit(limit.into(), source, true, step, on_done);
    }

    /// Resolves `false` as soon as `step` rejects any item, no concurrency bound.
    pub fn every<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.every_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Resolves `false` as soon as `step` rejects any item, testing one at a time.
    pub fn every_series<S, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.every_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Resolves `false` as soon as `step` rejects any item, with at most
    /// `limit` tests in flight. Mirror image of [`some_limit`](Flow::some_limit).
    pub fn every_limit<S, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        self.short_circuit(limit.into(), source, false, step, on_done);
    }

    // Shared by `some` and `every`: the first test answering `decisive`
    // settles the result and breaks the run.
    fn short_circuit<S, E>(
        &self,
        limit: Limit,
        source: S,
        decisive: bool,
        mut step: impl FnMut(S::Item, Done<bool, E>) + 'static,
        on_done: impl FnOnce(Result<bool, E>) + 'static,
    ) where
        S: Source,
        E: 'static,
    {
        let settled = Rc::new(Cell::new(false));
        let answer = Rc::clone(&settled);
        let flow = *self;
        scheduler::run(
            limit,
            source.len(),
            Direction::Forward,
            move |index, job| {
                let settled = Rc::clone(&settled);
                flow.start_item(&source, index, job, &mut step, move |_, verdict| {
                    if verdict == decisive {
                        settled.set(true);
                        Outcome::Break
                    } else {
                        Outcome::Value(())
                    }
                });
            },
            move |error| match error {
                Some(e) => on_done(Err(e)),
                None if answer.get() => on_done(Ok(decisive)),
                None => on_done(Ok(!decisive)),
            },
        );
    }

    /// Sorts items by an asynchronously computed key, no concurrency bound.
    pub fn sort_by<S, K, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<K, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        K: PartialOrd + 'static,
        E: 'static,
    {
        self.sort_by_limit(Limit::UNBOUNDED, source, step, on_done);
    }

    /// Sorts items by an asynchronously computed key, one key at a time.
    pub fn sort_by_series<S, K, E>(
        &self,
        source: S,
        step: impl FnMut(S::Item, Done<K, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        K: PartialOrd + 'static,
        E: 'static,
    {
        self.sort_by_limit(Limit::SERIAL, source, step, on_done);
    }

    /// Sorts items by an asynchronously computed key, with at most `limit`
    /// keys computed at once.
    ///
    /// The sort is stable: items with equal or incomparable keys keep their
    /// input order. Items without a key (holes, or jobs cut off by a break)
    /// are left out. The source itself is never modified.
    pub fn sort_by_limit<S, K, E>(
        &self,
        limit: impl Into<Limit>,
        source: S,
        mut step: impl FnMut(S::Item, Done<K, E>) + 'static,
        on_done: impl FnOnce(Result<Vec<S::Item>, E>) + 'static,
    ) where
        S: Source,
        K: PartialOrd + 'static,
        E: 'static,
    {
        let len = source.len();
        let source = Rc::new(source);
        let keys = Rc::new(RefCell::new(empty_slots::<K>(len)));
        let (items, computed) = (Rc::clone(&source), Rc::clone(&keys));
        let flow = *self;
        scheduler::run(
            limit.into(),
            len,
            Direction::Forward,
            move |index, job| {
                let keys = Rc::clone(&keys);
                flow.start_item(&*source, index, job, &mut step, move |i, key| {
                    if let Some(slot) = keys.borrow_mut().get_mut(i) {
                        *slot = Some(key);
                    }
                    Outcome::Value(())
                });
            },
            move |error| {
                if let Some(e) = error {
                    on_done(Err(e));
                    return;
                }
                let mut keyed: Vec<(K, usize)> = computed
                    .take()
                    .into_iter()
                    .enumerate()
                    .filter_map(|(i, key)| Some((key?, i)))
                    .collect();
                keyed.sort_by(|(a, _), (b, _)| a.partial_cmp(b).unwrap_or(Ordering::Equal));
                let sorted = keyed.into_iter().filter_map(|(_, i)| items.get(i)).collect();
                on_done(Ok(sorted));
            },
        );
    }

    /// Runs every task with no concurrency bound, collecting their values.
    pub fn execute<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_limit(Limit::UNBOUNDED, tasks, on_done);
    }

    /// Runs the tasks one at a time, collecting their values.
    pub fn execute_series<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_limit(Limit::SERIAL, tasks, on_done);
    }

    /// Runs the tasks with at most `limit` in flight, collecting their values.
    ///
    /// The result holds one value per task in list order; empty positions
    /// contribute nothing. Use [`execute_sparse_limit`](Flow::execute_sparse_limit)
    /// to keep values at the positions of their tasks.
    pub fn execute_limit<R, E>(
        &self,
        limit: impl Into<Limit>,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_slots(limit.into(), tasks.into(), move |slots| {
            on_done(slots.map(|slots| slots.into_iter().flatten().collect()));
        });
    }

    /// Runs every task with no concurrency bound, keeping positions.
    pub fn execute_sparse<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_sparse_limit(Limit::UNBOUNDED, tasks, on_done);
    }

    /// Runs the tasks one at a time, keeping positions.
    pub fn execute_sparse_series<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_sparse_limit(Limit::SERIAL, tasks, on_done);
    }

    /// Runs the tasks with at most `limit` in flight, keeping positions.
    ///
    /// The result has one position per task list entry. Empty entries stay
    /// holes.
    pub fn execute_sparse_limit<R, E>(
        &self,
        limit: impl Into<Limit>,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Sparse<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_slots(limit.into(), tasks.into(), move |slots| {
            on_done(slots.map(Sparse::from));
        });
    }

    fn execute_slots<R, E>(
        &self,
        limit: Limit,
        tasks: Tasks<R, E>,
        on_done: impl FnOnce(Result<Vec<Option<R>>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        let mut tasks = tasks.tasks;
        let len = tasks.len();
        let results = Rc::new(RefCell::new(empty_slots::<R>(len)));
        let collected = Rc::clone(&results);
        let mode = self.config.guard_mode();
        scheduler::run(
            limit,
            len,
            Direction::Forward,
            move |index, job| {
                let Some(task) = tasks[index].take() else {
                    job.report(Outcome::Value(()));
                    return;
                };
                let results = Rc::clone(&results);
                let done = Done::new(index, mode, move |outcome| {
                    let outcome = match outcome {
                        Outcome::Value(v) => {
                            if let Some(slot) = results.borrow_mut().get_mut(index) {
                                *slot = Some(v);
                            }
                            Outcome::Value(())
                        }
                        Outcome::Error(e) => Outcome::Error(e),
                        Outcome::Break => Outcome::Break,
                    };
                    job.report(outcome);
                });
                task(done);
            },
            move |error| match error {
                Some(e) => on_done(Err(e)),
                None => on_done(Ok(collected.take())),
            },
        );
    }

    /// Alias of [`execute`](Flow::execute).
    pub fn parallel<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute(tasks, on_done);
    }

    /// Alias of [`execute_series`](Flow::execute_series).
    pub fn series<R, E>(
        &self,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_series(tasks, on_done);
    }

    /// Alias of [`execute_limit`](Flow::execute_limit).
    pub fn parallel_limit<R, E>(
        &self,
        limit: impl Into<Limit>,
        tasks: impl Into<Tasks<R, E>>,
        on_done: impl FnOnce(Result<Vec<R>, E>) + 'static,
    ) where
        R: 'static,
        E: 'static,
    {
        self.execute_limit(limit, tasks, on_done);
    }
}

fn empty_slots<T>(len: usize) -> Vec<Option<T>> {
    let mut slots = Vec::with_capacity(len);
    slots.resize_with(len, || None);
    slots
}
