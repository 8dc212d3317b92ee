//! Page task scheduling.
//!
//! Every page is one task. Tasks run on a bounded rayon pool (or inline
//! when the pool is absent), report back over a channel keyed by page index
//! and are reassembled in index order whatever order they finish in. A
//! panic inside one task becomes that page's error and never reaches its
//! siblings.

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};

use crossbeam_channel::unbounded;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::{panic_message, Error, Result};

/// Build the worker pool for `workers` threads. One worker means no pool:
/// tasks run synchronously on the caller's thread.
pub fn build_pool(workers: usize) -> Result<Option<ThreadPool>> {
    if workers == 1 {
        return Ok(None);
    }
    ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("pageflow-worker-{}", i))
        .build()
        .map(Some)
        .map_err(|e| Error::Other(format!("Failed to start worker pool: {}", e)))
}

/// Run `task` once per item and return the outcomes keyed by page index.
pub fn run_tasks<I, T, F>(pool: Option<&ThreadPool>, items: Vec<(usize, I)>, task: F) -> BTreeMap<usize, Result<T>>
where
    I: Send,
    T: Send,
    F: Fn(usize, I) -> Result<T> + Sync,
{
    let Some(pool) = pool else {
        return items
            .into_iter()
            .map(|(index, item)| (index, guarded(&task, index, item)))
            .collect();
    };

    let (tx, rx) = unbounded();
    let task = &task;
    pool.scope(|scope| {
        for (index, item) in items {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let _ = tx.send((index, guarded(task, index, item)));
            });
        }
    });
    drop(tx);
    rx.into_iter().collect()
}

fn guarded<I, T, F>(task: &F, index: usize, item: I) -> Result<T>
where
    F: Fn(usize, I) -> Result<T>,
{
    panic::catch_unwind(AssertUnwindSafe(|| task(index, item))).unwrap_or_else(|payload| {
        Err(Error::PageTaskPanic {
            page: index,
            message: panic_message(payload.as_ref()),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_results_in_index_order() {
        let pool = build_pool(4).unwrap();
        let items: Vec<(usize, u64)> = (0..16).map(|i| (i, (16 - i) as u64)).collect();
        let results = run_tasks(pool.as_ref(), items, |index, delay| {
            thread::sleep(Duration::from_millis(delay));
            Ok(index * 10)
        });
        let keys: Vec<usize> = results.keys().copied().collect();
        assert_eq!(keys, (0..16).collect::<Vec<_>>());
        assert_eq!(results[&3].as_ref().unwrap(), &30);
    }

    #[test]
    fn test_panic_is_isolated() {
        let pool = build_pool(2).unwrap();
        let items: Vec<(usize, ())> = (0..4).map(|i| (i, ())).collect();
        let results = run_tasks(pool.as_ref(), items, |index, _| {
            if index == 2 {
                panic!("bad page");
            }
            Ok(index)
        });
        assert_eq!(results.len(), 4);
        assert!(results[&0].is_ok());
        assert!(results[&3].is_ok());
        match &results[&2] {
            Err(Error::PageTaskPanic { page, message }) => {
                assert_eq!(*page, 2);
                assert_eq!(message, "bad page");
            }
            other => panic!("unexpected {:?}", other.as_ref().map(|_| ())),
        }
    }

    #[test]
    fn test_single_worker_runs_inline() {
        assert!(build_pool(1).unwrap().is_none());
        let caller = thread::current().id();
        let results = run_tasks(None, vec![(0, ()), (1, ())], |_, _| Ok(thread::current().id()));
        assert!(results.values().all(|r| r.as_ref().unwrap() == &caller));
    }
}
