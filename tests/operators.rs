use std::{cell::RefCell, rc::Rc, time::Duration};

use asyncflow::{Defer, EventLoop, Flow, Limit, Sparse, Tasks, Timer};

fn slot<T: 'static>() -> (Rc<RefCell<Option<T>>>, impl FnOnce(T) + 'static) {
    let cell = Rc::new(RefCell::new(None));
    let c = Rc::clone(&cell);
    (cell, move |v| *c.borrow_mut() = Some(v))
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn map_keeps_input_order_for_every_limit() {
    let input: Vec<u64> = (1..=8).collect();
    for limit in [Limit::SERIAL, Limit::new(2), Limit::new(3), Limit::UNBOUNDED] {
        let el = EventLoop::new();
        let (result, on_done) = slot::<Result<Vec<u64>, ()>>();
        let timer = el.clone();
        // Later items finish first.
        Flow::default().map_limit(
            limit,
            input.clone(),
            move |n: u64, done| {
                timer.schedule(ms(100 - n * 10), Box::new(move || done.ok(n * n)));
            },
            on_done,
        );
        el.run();
        assert_eq!(
            *result.borrow(),
            Some(Ok(input.iter().map(|n| n * n).collect())),
            "map with {limit:?} should keep input order"
        );
    }
}

#[test]
fn map_never_exceeds_limit() {
    let el = EventLoop::new();
    let in_flight = Rc::new(RefCell::new((0usize, 0usize)));
    let (result, on_done) = slot::<Result<Vec<usize>, ()>>();
    let (timer, counter) = (el.clone(), Rc::clone(&in_flight));
    Flow::default().map_limit(
        3,
        0..10,
        move |n: usize, done| {
            {
                let mut c = counter.borrow_mut();
                c.0 += 1;
                c.1 = c.1.max(c.0);
            }
            let counter = Rc::clone(&counter);
            timer.schedule(
                ms(1 + (n as u64 % 4)),
                Box::new(move || {
                    counter.borrow_mut().0 -= 1;
                    done.ok(n);
                }),
            );
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Ok((0..10).collect())));
    assert_eq!(in_flight.borrow().1, 3, "peak concurrency should equal the limit");
}

#[test]
fn map_error_reports_no_partial_result() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Vec<u32>, String>>();
    let queue = el.clone();
    Flow::default().map(
        vec![1u32, 2, 3],
        move |n, done| {
            queue.defer(Box::new(move || {
                if n == 2 {
                    done.fail(format!("bad {n}"));
                } else {
                    done.ok(n);
                }
            }));
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Err("bad 2".to_string())));
}

#[test]
fn map_after_break_keeps_reported_values() {
    let (result, on_done) = slot::<Result<Vec<u32>, ()>>();
    Flow::default().map_series(
        vec![1u32, 2, 3, 4],
        |n, done| {
            if n == 3 {
                done.stop();
            } else {
                done.ok(n * 10);
            }
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(vec![10, 20])));
}

#[test]
fn mixed_synchronous_and_deferred_steps() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Vec<u32>, ()>>();
    let queue = el.clone();
    Flow::default().map_limit(
        2,
        (0..9).collect::<Vec<u32>>(),
        move |n, done| {
            if n % 2 == 0 {
                done.ok(n + 100);
            } else {
                queue.defer(Box::new(move || done.ok(n + 100)));
            }
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Ok((100..109).collect())));
}

#[test]
fn filter_keeps_accepted_items_in_order() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Vec<&'static str>, ()>>();
    let timer = el.clone();
    Flow::default().filter_limit(
        2,
        vec!["apple", "kiwi", "banana", "fig", "cherry"],
        move |word: &'static str, done| {
            let len = word.len() as u64;
            timer.schedule(ms(10 - len), Box::new(move || done.ok(len > 4)));
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(vec!["apple", "banana", "cherry"])));
}

#[test]
fn some_stops_after_first_match() {
    let el = EventLoop::new();
    let calls = Rc::new(RefCell::new(0usize));
    let (result, on_done) = slot::<Result<bool, ()>>();
    let (queue, c) = (el.clone(), Rc::clone(&calls));
    Flow::default().some_limit(
        2,
        vec![1, 2, 3, 4],
        move |v: i32, done| {
            *c.borrow_mut() += 1;
            queue.defer(Box::new(move || done.ok(v > 2)));
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(true)));
    // Match at position 3 (1-based), windows of 2: at most ceil(3 / 2) * 2 steps.
    assert!(*calls.borrow() <= 4);
}

#[test]
fn some_tests_every_item_once_when_nothing_matches() {
    let el = EventLoop::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<bool, ()>>();
    let (queue, s) = (el.clone(), Rc::clone(&seen));
    Flow::default().some_limit(
        2,
        vec![1, 2, 3, 4, 5],
        move |v: i32, done| {
            s.borrow_mut().push(v);
            queue.defer(Box::new(move || done.ok(false)));
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(false)));
    assert_eq!(*seen.borrow(), [1, 2, 3, 4, 5]);
}

#[test]
fn every_resolves_false_without_starting_past_the_window() {
    let el = EventLoop::new();
    let started = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<bool, ()>>();
    let (timer, s) = (el.clone(), Rc::clone(&started));
    Flow::default().every_limit(
        2,
        vec![1, 2, 3, 4, 5, 6],
        move |v: i32, done| {
            s.borrow_mut().push(v);
            // The failing item reports first.
            let delay = if v == 2 { 1 } else { 10 };
            timer.schedule(ms(delay), Box::new(move || done.ok(v < 2)));
        },
        on_done,
    );
    el.advance(ms(1));
    assert_eq!(*result.borrow(), None, "item 1 is still in flight");
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(false)));
    assert_eq!(*started.borrow(), [1, 2]);
}

#[test]
fn every_is_true_when_all_pass() {
    let (result, on_done) = slot::<Result<bool, ()>>();
    Flow::default().every(vec![2, 4, 6], |v: i32, done| done.ok(v % 2 == 0), on_done);
    assert_eq!(*result.borrow(), Some(Ok(true)));
}

#[test]
fn sort_by_is_stable_and_repeatable() {
    let input = vec![("b", 2), ("a", 1), ("c", 2), ("d", 0), ("e", 1)];
    let run = |input: Vec<(&'static str, i32)>| {
        let el = EventLoop::new();
        let (result, on_done) = slot::<Result<Vec<(&'static str, i32)>, ()>>();
        let queue = el.clone();
        Flow::default().sort_by_limit(
            3,
            input,
            move |item: (&'static str, i32), done| {
                queue.defer(Box::new(move || done.ok(item.1)));
            },
            on_done,
        );
        el.run();
        result.take()
    };
    let expected = vec![("d", 0), ("a", 1), ("e", 1), ("b", 2), ("c", 2)];
    assert_eq!(run(input.clone()), Some(Ok(expected.clone())));
    assert_eq!(run(input.clone()), Some(Ok(expected)));
    assert_eq!(input[0], ("b", 2));
}

#[test]
fn sort_by_skips_holes() {
    let (result, on_done) = slot::<Result<Vec<u32>, ()>>();
    let input: Sparse<u32> = vec![Some(3), None, Some(1), Some(2)].into();
    Flow::default().sort_by(input, |n: u32, done| done.ok(n), on_done);
    assert_eq!(*result.borrow(), Some(Ok(vec![1, 2, 3])));
}

#[test]
fn for_each_skips_holes() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<(), ()>>();
    let mut input = Sparse::from(vec!['a', 'b', 'c', 'd']);
    input.remove(1);
    let s = Rc::clone(&seen);
    Flow::default().for_each_limit(
        2,
        input,
        move |c: char, done| {
            s.borrow_mut().push((done.index(), c));
            done.ok(());
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(())));
    assert_eq!(*seen.borrow(), [(0, 'a'), (2, 'c'), (3, 'd')]);
}

#[test]
fn for_each_over_a_numeric_range() {
    let el = EventLoop::new();
    let sum = Rc::new(RefCell::new(0));
    let (result, on_done) = slot::<Result<(), ()>>();
    let (queue, s) = (el.clone(), Rc::clone(&sum));
    Flow::default().for_each(
        0..5,
        move |n: usize, done| {
            let s = Rc::clone(&s);
            queue.defer(Box::new(move || {
                *s.borrow_mut() += n;
                done.ok(());
            }));
        },
        on_done,
    );
    assert_eq!(*result.borrow(), None);
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(())));
    assert_eq!(*sum.borrow(), 10);
}

#[test]
fn for_each_right_starts_from_the_end() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<(), ()>>();
    let o = Rc::clone(&order);
    Flow::default().for_each_right_series(
        vec![1, 2, 3],
        move |n: i32, done| {
            o.borrow_mut().push(n);
            done.ok(());
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(())));
    assert_eq!(*order.borrow(), [3, 2, 1]);
}

#[test]
fn for_each_break_stops_serial_run() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<(), &'static str>>();
    let s = Rc::clone(&seen);
    Flow::default().for_each_series(
        vec![1, 2, 3, 4],
        move |n: i32, done| {
            s.borrow_mut().push(n);
            if n == 2 {
                done.stop();
            } else {
                done.ok(());
            }
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(())));
    assert_eq!(*seen.borrow(), [1, 2]);
}

#[test]
fn empty_input_completes_before_returning() {
    let (result, on_done) = slot::<Result<Vec<u8>, ()>>();
    Flow::default().map(Vec::<u8>::new(), |n, done| done.ok(n), on_done);
    assert_eq!(*result.borrow(), Some(Ok(vec![])));
}

#[test]
fn execute_collects_in_task_order() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Vec<&'static str>, ()>>();
    let tasks = [("a", 30), ("b", 10), ("c", 40), ("d", 20)]
        .into_iter()
        .fold(Tasks::new(), |tasks, (letter, delay)| {
            let timer = el.clone();
            tasks.task(move |done| {
                timer.schedule(ms(delay), Box::new(move || done.ok(letter)));
            })
        });
    Flow::default().execute_limit(2, tasks, on_done);
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(vec!["a", "b", "c", "d"])));
}

#[test]
fn execute_leaves_no_entry_for_empty_positions() {
    let (result, on_done) = slot::<Result<Vec<u8>, ()>>();
    let tasks = Tasks::new()
        .task(|done| done.ok(1))
        .skip()
        .task(|done| done.ok(3));
    assert_eq!(tasks.len(), 3);
    Flow::default().series(tasks, on_done);
    assert_eq!(*result.borrow(), Some(Ok(vec![1, 3])));
}

#[test]
fn parallel_reports_first_error() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Vec<u8>, &'static str>>();
    let (t1, t2, t3) = (el.clone(), el.clone(), el.clone());
    let tasks = Tasks::new()
        .task(move |done| {
            t1.schedule(ms(30), Box::new(move || done.fail("slow")));
        })
        .task(move |done| {
            t2.schedule(ms(10), Box::new(move || done.fail("fast")));
        })
        .task(move |done| {
            t3.schedule(ms(20), Box::new(move || done.ok(3)));
        });
    Flow::default().parallel(tasks, on_done);
    el.run();
    assert_eq!(*result.borrow(), Some(Err("fast")));
}

#[test]
fn map_sparse_keeps_values_at_their_positions() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Sparse<u32>, ()>>();
    let timer = el.clone();
    let input: Sparse<u32> = vec![Some(1), None, Some(3)].into();
    Flow::default().map_sparse_limit(
        2,
        input,
        move |n: u32, done| {
            timer.schedule(ms(u64::from(10 - n)), Box::new(move || done.ok(n * 10)));
        },
        on_done,
    );
    el.run();
    let mapped = result.take().map(|r| r.map(Sparse::into_vec));
    assert_eq!(
        mapped,
        Some(Ok(vec![Some(10), None, Some(30)])),
        "Value of item 2 should stay at index 2"
    );
}

#[test]
fn map_compacts_values_around_holes() {
    let (result, on_done) = slot::<Result<Vec<u32>, ()>>();
    let input: Sparse<u32> = vec![Some(1), None, Some(3)].into();
    Flow::default().map(input, |n: u32, done| done.ok(n * 10), on_done);
    assert_eq!(*result.borrow(), Some(Ok(vec![10, 30])));
}

#[test]
fn map_sparse_after_break_leaves_unreported_positions_empty() {
    let (result, on_done) = slot::<Result<Sparse<u32>, ()>>();
    Flow::default().map_sparse_series(
        vec![1u32, 2, 3],
        |n, done| if n == 2 { done.stop() } else { done.ok(n) },
        on_done,
    );
    let mapped = result.take().map(|r| r.map(Sparse::into_vec));
    assert_eq!(mapped, Some(Ok(vec![Some(1), None, None])));
}

#[test]
fn execute_sparse_keeps_empty_positions() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Sparse<char>, ()>>();
    let (t1, t2) = (el.clone(), el.clone());
    let tasks = Tasks::new()
        .skip()
        .task(move |done| {
            t1.schedule(ms(20), Box::new(move || done.ok('b')));
        })
        .task(move |done| {
            t2.schedule(ms(10), Box::new(move || done.ok('c')));
        });
    Flow::default().execute_sparse(tasks, on_done);
    el.run();
    let result = result.take().and_then(Result::ok);
    assert_eq!(
        result.as_ref().map(Sparse::as_slice),
        Some(&[None, Some('b'), Some('c')][..])
    );
}
