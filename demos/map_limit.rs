use std::time::Duration;

use asyncflow::{Flow, Timer, TokioLocal, completion};
use tokio::task::LocalSet;

// Pretend lookups with different latencies.
const PAGES: [(&str, u64); 6] = [
    ("index", 40),
    ("about", 10),
    ("blog", 30),
    ("contact", 5),
    ("faq", 20),
    ("shop", 15),
];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    LocalSet::new()
        .run_until(async {
            let rt = TokioLocal::new();
            let (on_done, sizes) = completion();

            // No more than two lookups in flight at once.
            Flow::default().map_limit(
                2,
                PAGES.to_vec(),
                move |(page, latency): (&'static str, u64), done| {
                    println!("Fetching {page}");
                    rt.schedule(
                        Duration::from_millis(latency),
                        Box::new(move || {
                            println!("Fetched {page}");
                            done.ok(page.len() * 100);
                        }),
                    );
                },
                on_done,
            );

            let sizes: Result<Vec<usize>, ()> = sizes.await.expect("run abandoned");
            println!("Sizes {sizes:?}");
            assert_eq!(sizes, Ok(vec![500, 500, 400, 700, 300, 400]));

            // Find out if any page is large, stopping at the first one.
            let rt = TokioLocal::new();
            let (on_done, large) = completion();
            Flow::default().some_series(
                PAGES.to_vec(),
                move |(page, latency): (&'static str, u64), done| {
                    rt.schedule(
                        Duration::from_millis(latency),
                        Box::new(move || done.ok(page.len() > 6)),
                    );
                },
                on_done,
            );

            let large: Result<bool, ()> = large.await.expect("run abandoned");
            assert_eq!(large, Ok(true));
        })
        .await;
}
