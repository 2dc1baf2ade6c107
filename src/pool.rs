//! Bounded-concurrency fan-out over a list of items, each processed by
//! an independent async task.
//!
//! A `JoinSet`-based producer/consumer loop generalized from a URL
//! frontier to any item type, so both the top-level orchestrator and
//! the mirror's nested asset fan-out can reuse it.

use std::collections::VecDeque;
use std::future::Future;

use tokio::task::JoinSet;

/// Run `work` over every item in `items`, never allowing more than
/// `max_concurrency` futures in flight at once. Results are returned in
/// completion order, not input order — callers that need input order
/// should carry an index through `Item` and sort afterward.
///
/// `work` must be `Clone` (typically a cheap handle: an `Arc`-wrapped
/// client, a `CancellationToken`, etc. captured by the closure) since a
/// fresh invocation is spawned per item.
pub async fn run_pool<Item, Fut, F, Out>(items: Vec<Item>, max_concurrency: usize, work: F) -> Vec<Out>
where
    Item: Send + 'static,
    Fut: Future<Output = Out> + Send + 'static,
    Out: Send + 'static,
    F: Fn(Item) -> Fut,
{
    let mut queue: VecDeque<Item> = items.into();
    let mut joinset: JoinSet<Out> = JoinSet::new();
    let mut results = Vec::with_capacity(queue.len());

    while !queue.is_empty() || !joinset.is_empty() {
        while joinset.len() < max_concurrency.max(1) {
            let Some(item) = queue.pop_front() else { break };
            let fut = work(item);
            joinset.spawn(fut);
        }

        if let Some(joined) = joinset.join_next().await {
            match joined {
                Ok(out) => results.push(out),
                Err(join_err) => {
                    // A panicking worker is a bug in the closure, not a
                    // per-item failure; surfacing it here would require
                    // `Out: Default`, which callers don't provide, so it
                    // is resumed to fail the run loudly instead.
                    std::panic::resume_unwind(join_err.into_panic());
                }
            }
        }
    }

    results
}
