use std::{cell::RefCell, rc::Rc, time::Duration};

use asyncflow::{EventLoop, Timer, debounce, throttle};

fn main() {
    // Virtual time, so the demo runs instantly.
    let el = EventLoop::new();
    let saved = Rc::new(RefCell::new(Vec::new()));
    let searched = Rc::new(RefCell::new(Vec::new()));

    let (s, clock) = (Rc::clone(&saved), el.clone());
    let save = throttle(el.clone(), Duration::from_millis(300), false, move |doc: String| {
        println!("{:>4}ms save {doc:?}", clock.now().as_millis());
        s.borrow_mut().push(doc);
    });

    let (s, clock) = (Rc::clone(&searched), el.clone());
    let search = debounce(el.clone(), Duration::from_millis(150), false, move |query: String| {
        println!("{:>4}ms search {query:?}", clock.now().as_millis());
        s.borrow_mut().push(query);
    });

    let mut text = String::new();
    for c in "hello world".chars() {
        text.push(c);
        save.call(text.clone());
        search.call(text.clone());
        el.advance(Duration::from_millis(60));
    }
    el.run();

    assert_eq!(saved.borrow().first().map(String::as_str), Some("h"));
    assert_eq!(saved.borrow().last().map(String::as_str), Some("hello world"));
    assert_eq!(*searched.borrow(), ["hello world"]);
}
