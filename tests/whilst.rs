use std::{cell::RefCell, rc::Rc, time::Duration};

use asyncflow::{Defer, Done, EventLoop, Flow, Timer};

fn slot<T: 'static>() -> (Rc<RefCell<Option<T>>>, impl FnOnce(T) + 'static) {
    let cell = Rc::new(RefCell::new(None));
    let c = Rc::clone(&cell);
    (cell, move |v| *c.borrow_mut() = Some(v))
}

#[test]
fn counts_up_to_five() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Option<u32>, ()>>();
    let queue = el.clone();
    Flow::default().whilst(
        |last: Option<&u32>, _| last.is_none_or(|v| *v < 5),
        move |last, done| {
            let next = last.unwrap_or(0) + 1;
            queue.defer(Box::new(move || done.ok(next)));
        },
        on_done,
    );
    assert_eq!(*result.borrow(), None);
    el.run();
    assert_eq!(*result.borrow(), Some(Ok(Some(5))));
}

#[test]
fn test_sees_evaluation_count() {
    let indices = Rc::new(RefCell::new(Vec::new()));
    let iterations = Rc::new(RefCell::new(Vec::new()));
    let (result, on_done) = slot::<Result<Option<usize>, ()>>();
    let (i, it) = (Rc::clone(&indices), Rc::clone(&iterations));
    Flow::default().whilst(
        move |_: Option<&usize>, index| {
            i.borrow_mut().push(index);
            index < 3
        },
        move |_, done: Done<usize, ()>| {
            it.borrow_mut().push(done.index());
            done.ok(done.index() * 10);
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(Some(20))));
    assert_eq!(*indices.borrow(), [0, 1, 2, 3]);
    assert_eq!(*iterations.borrow(), [0, 1, 2]);
}

#[test]
fn false_test_never_iterates() {
    let (result, on_done) = slot::<Result<Option<u8>, ()>>();
    Flow::default().whilst(|_: Option<&u8>, _| false, |_, _| unreachable!(), on_done);
    assert_eq!(*result.borrow(), Some(Ok(None)));
}

#[test]
fn until_inverts_the_test() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Option<String>, ()>>();
    let timer = el.clone();
    Flow::default().until(
        |last: Option<&String>, _| last.is_some_and(|s| s.len() >= 4),
        move |last, done| {
            let next = last.unwrap_or_default() + "ab";
            timer.schedule(Duration::from_millis(10), Box::new(move || done.ok(next)));
        },
        on_done,
    );
    el.advance(Duration::from_millis(10));
    assert_eq!(*result.borrow(), None);
    el.advance(Duration::from_millis(10));
    assert_eq!(*result.borrow(), Some(Ok(Some("abab".to_string()))));
}

#[test]
fn error_ends_the_loop() {
    let el = EventLoop::new();
    let (result, on_done) = slot::<Result<Option<u32>, String>>();
    let queue = el.clone();
    Flow::default().whilst(
        |_: Option<&u32>, _| true,
        move |last, done: Done<u32, String>| {
            let next = last.unwrap_or(0) + 1;
            queue.defer(Box::new(move || {
                if next == 3 {
                    done.fail(format!("stopped at {next}"));
                } else {
                    done.ok(next);
                }
            }));
        },
        on_done,
    );
    el.run();
    assert_eq!(*result.borrow(), Some(Err("stopped at 3".to_string())));
}

#[test]
fn break_keeps_last_value() {
    let (result, on_done) = slot::<Result<Option<u32>, ()>>();
    Flow::default().whilst(
        |_: Option<&u32>, _| true,
        |last, done| {
            let next = last.unwrap_or(0) + 1;
            if next > 4 { done.stop() } else { done.ok(next) }
        },
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(Some(4))));
}

#[test]
fn long_synchronous_loops_do_not_grow_the_stack() {
    let (result, on_done) = slot::<Result<Option<u64>, ()>>();
    Flow::default().whilst(
        |last: Option<&u64>, _| last.is_none_or(|v| *v < 500_000),
        |last, done| done.ok(last.unwrap_or(0) + 1),
        on_done,
    );
    assert_eq!(*result.borrow(), Some(Ok(Some(500_000))));
}
